//! Keys of secret mappings
//!
//! Each distinct key expression of a mapping (`msg.sender`, a parameter, a literal, ...)
//! is tracked as its own state with its own occurrence lists.

use serde::Serialize;

use crate::ast::{Node, NodeId, NodeKind};
use crate::binding::OccurrenceLists;
use crate::error::{CompilerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingKey {
    pub name: String,
    pub is_msg_sender: bool,
    pub is_param: bool,
    /// Declaration the key identifier resolves to
    pub key_binding: Option<NodeId>,
    pub is_accessed: bool,
    pub occurrences: OccurrenceLists,
}

impl MappingKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_msg_sender: false,
            is_param: false,
            key_binding: None,
            is_accessed: false,
            occurrences: OccurrenceLists::default(),
        }
    }

    pub fn msg_sender() -> Self {
        Self { is_msg_sender: true, ..Self::new("msg.sender") }
    }

    /// Keys that take a different value on every call
    pub fn is_dynamic(&self) -> bool {
        self.is_msg_sender || self.is_param
    }
}

/// Name of a key expression: `msg.sender`, an identifier name or a literal value
pub fn key_name(index: &Node) -> Result<String> {
    if index.is_msg_sender() {
        return Ok("msg.sender".to_string());
    }
    match &index.kind {
        NodeKind::Identifier { name, .. } => Ok(name.clone()),
        NodeKind::Literal { value, .. } => Ok(value.clone()),
        _ => Err(CompilerError::unsupported(
            format!("mapping key expression {}", index.kind_name()),
            Some(index.src),
        )),
    }
}
