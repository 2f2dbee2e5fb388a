//! Generic tree walker
//!
//! [`traverse`] drives a [`Visitor`] depth-first in document order, calling `enter` before
//! a node's children and `exit` after them. Handlers dispatch with an exhaustive match on
//! [`NodeKind`](crate::ast::NodeKind). [`traverse_fast`] is a lighter walk without paths
//! for sub-tree queries that stop at the first hit.

mod path;

pub use path::NodePath;

use crate::ast::Node;
use crate::error::Result;

/// Walk control, shared by every hook of a traversal
#[derive(Debug, Clone, Copy, Default)]
pub struct Control {
    stop: bool,
    skip_children: bool,
}

impl Control {
    /// Ends the traversal after the current hook
    pub fn stop(&mut self) {
        self.stop = true;
    }

    /// Skips the children of the node being entered
    pub fn skip_children(&mut self) {
        self.skip_children = true;
    }
}

pub trait Visitor {
    fn enter(&mut self, _path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        Ok(())
    }

    fn exit(&mut self, _path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        Ok(())
    }
}

pub fn traverse<V: Visitor>(root: &Node, visitor: &mut V) -> Result<()> {
    let mut control = Control::default();
    walk(&NodePath::root(root), visitor, &mut control)
}

fn walk<V: Visitor>(path: &NodePath<'_>, visitor: &mut V, control: &mut Control) -> Result<()> {
    visitor.enter(path, control)?;
    if control.stop {
        return Ok(());
    }
    let skip = std::mem::take(&mut control.skip_children);
    if !skip {
        for (edge, child) in path.node.children() {
            let child_path = NodePath { node: child, edge, parent: Some(path) };
            walk(&child_path, visitor, control)?;
            if control.stop {
                return Ok(());
            }
        }
    }
    visitor.exit(path, control)
}

/// Pre-order walk calling `f` on every node until it stops the walk
///
/// Returns `true` if the walk was stopped early.
pub fn traverse_fast<F>(node: &Node, f: &mut F) -> bool
where
    F: FnMut(&Node, &mut Control),
{
    let mut control = Control::default();
    fast(node, f, &mut control);
    control.stop
}

fn fast<F>(node: &Node, f: &mut F, control: &mut Control)
where
    F: FnMut(&Node, &mut Control),
{
    f(node, control);
    if control.stop {
        return;
    }
    if std::mem::take(&mut control.skip_children) {
        return;
    }
    for (_, child) in node.children() {
        fast(child, f, control);
        if control.stop {
            return;
        }
    }
}

/// Whether any node below (and including) `node` satisfies `predicate`
pub fn any_node(node: &Node, mut predicate: impl FnMut(&Node) -> bool) -> bool {
    traverse_fast(node, &mut |n: &Node, control: &mut Control| {
        if predicate(n) {
            control.stop();
        }
    })
}
