//! Loader for the front-end's JSON AST
//!
//! The raw JSON is first scanned for `nodeType`s outside the supported set, so that an
//! unsupported construct is reported by name and site rather than as a generic
//! deserialization failure. The checked value is then deserialized into [`Node`].

use serde_json::Value;

use crate::ast::{Node, NodeKind, SUPPORTED_NODE_TYPES};
use crate::error::{CompilerError, Result};

pub fn parse_ast(input: &str) -> Result<Node> {
    let value: Value = serde_json::from_str(input)?;
    parse_value(value)
}

pub fn parse_value(value: Value) -> Result<Node> {
    check_node_types(&value)?;
    let root: Node = serde_json::from_value(value)
        .map_err(|e| CompilerError::ParseError(format!("AST does not match the schema: {}", e)))?;
    match root.kind {
        NodeKind::SourceUnit { .. } | NodeKind::ContractDefinition { .. } => Ok(root),
        _ => Err(CompilerError::ParseError(format!(
            "AST root must be a SourceUnit or ContractDefinition, found {}",
            root.kind_name()
        ))),
    }
}

/// Rejects any object whose `nodeType` is not part of the supported schema
pub fn check_node_types(value: &Value) -> Result<()> {
    match value {
        Value::Object(map) => {
            if let Some(node_type) = map.get("nodeType") {
                let node_type = node_type.as_str().ok_or_else(|| {
                    CompilerError::ParseError(format!("nodeType must be a string, found {}", node_type))
                })?;
                if !SUPPORTED_NODE_TYPES.contains(&node_type) {
                    let src = map.get("src").and_then(Value::as_str).and_then(|s| s.parse().ok());
                    return Err(CompilerError::unsupported(node_type, src));
                }
            }
            map.values().try_for_each(check_node_types)
        }
        Value::Array(items) => items.iter().try_for_each(check_node_types),
        _ => Ok(()),
    }
}
