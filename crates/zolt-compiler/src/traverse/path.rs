//! Node paths: a node plus the chain of ancestors that led to it

use crate::ast::{Edge, Node};

/// A visited node and its position in the tree
///
/// Paths live on the walker's stack; `parent` borrows the caller's path, so ancestor
/// queries are cheap and need no parent pointers in the tree itself.
#[derive(Debug, Clone, Copy)]
pub struct NodePath<'a> {
    pub node: &'a Node,
    pub edge: Edge,
    pub parent: Option<&'a NodePath<'a>>,
}

impl<'a> NodePath<'a> {
    pub fn root(node: &'a Node) -> Self {
        Self { node, edge: Edge::Root, parent: None }
    }

    pub fn child(&'a self, node: &'a Node, edge: Edge) -> NodePath<'a> {
        NodePath { node, edge, parent: Some(self) }
    }

    /// This path followed by its ancestors, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = &NodePath<'a>> + '_ {
        std::iter::successors(Some(self), |path| path.parent)
    }

    pub fn parent_node(&self) -> Option<&'a Node> {
        self.parent.map(|p| p.node)
    }

    /// Nearest statement containing this node (the node itself included)
    pub fn enclosing_statement(&self) -> Option<&'a Node> {
        self.ancestors().map(|p| p.node).find(|n| n.is_statement())
    }

    /// True when the node is the base of an `IndexAccess`
    pub fn is_index_base(&self) -> bool {
        self.edge == Edge::BaseExpression
    }

    /// Whether a declaration sits in a function's parameter or return list
    pub fn declaration_list(&self) -> Option<Edge> {
        let list = self.parent?;
        match list.edge {
            Edge::Parameters | Edge::ReturnParameters => Some(list.edge),
            _ => None,
        }
    }
}
