//! Per-node analysis results, kept beside the immutable tree

use serde::Serialize;
use std::collections::BTreeMap;

use crate::ast::NodeId;
use crate::binding::WriteShape;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    /// Shape of every assignment or update, keyed by the writing node
    pub write_shapes: BTreeMap<NodeId, WriteShape>,
    /// Keyed by the `require(...)` call node
    pub require_statement_private: BTreeMap<NodeId, bool>,
    /// Statements that reference secret data
    pub interacts_with_secret: BTreeMap<NodeId, bool>,
    /// Statements that reference public state variables
    pub interacts_with_public: BTreeMap<NodeId, bool>,
}

impl Annotations {
    pub fn require_statement_private(&self, call: NodeId) -> Option<bool> {
        self.require_statement_private.get(&call).copied()
    }

    pub fn interacts_with_secret(&self, statement: NodeId) -> bool {
        self.interacts_with_secret.get(&statement).copied().unwrap_or(false)
    }
}
