//! Statement-level annotations and usage checks
//!
//! Runs after accumulation, while indicators are still open. Records which statements
//! touch secret data, whether `require` calls are private, detects functions that need
//! `msg.sender` as an explicit parameter, and rejects flows of secret data into public
//! state.

use std::collections::BTreeSet;
use tracing::warn;

use crate::annotations::Annotations;
use crate::ast::{Node, NodeKind, SourceLocation};
use crate::binding::{Binding, DeclarationKind};
use crate::diagnostics::Warning;
use crate::error::{CompilerError, Result};
use crate::indicator::{FunctionFlags, FunctionIndicator};
use crate::scope::{ScopeId, ScopeTree};
use crate::traverse::{traverse, traverse_fast, Control, NodePath, Visitor};

pub fn run(
    ast: &Node,
    tree: &mut ScopeTree,
    annotations: &mut Annotations,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let mut annotator = Annotator {
        tree,
        annotations,
        warnings,
        function: None,
        msg_sender: BTreeSet::new(),
    };
    traverse(ast, &mut annotator)?;
    let needs_msg_sender = annotator.msg_sender;

    let update = FunctionIndicator {
        flags: FunctionFlags { msg_sender_param: true, ..FunctionFlags::default() },
        ..FunctionIndicator::default()
    };
    for scope in needs_msg_sender {
        tree.get_mut(scope).merge_function(&update)?;
    }
    Ok(())
}

/// Bindings referenced anywhere below `node`
fn referenced<'t>(tree: &'t ScopeTree, node: &Node) -> Vec<(&'t Binding, SourceLocation)> {
    let mut found = Vec::new();
    traverse_fast(node, &mut |n: &Node, _: &mut Control| {
        if let Some(binding) = tree.resolve(n.id) {
            found.push((binding, n.src));
        }
    });
    found
}

/// Whether `node` touches secret data, and whether it touches public state
fn interactions(tree: &ScopeTree, node: &Node) -> (bool, bool) {
    let bindings = referenced(tree, node);
    let secret = bindings.iter().any(|(b, _)| b.is_secret);
    let public_state = bindings
        .iter()
        .any(|(b, _)| !b.is_secret && b.kind == DeclarationKind::StateVariable);
    (secret, public_state)
}

struct Annotator<'t> {
    tree: &'t ScopeTree,
    annotations: &'t mut Annotations,
    warnings: &'t mut Vec<Warning>,
    function: Option<ScopeId>,
    msg_sender: BTreeSet<ScopeId>,
}

impl Annotator<'_> {
    fn modifies_secret_state(&self) -> bool {
        self.function
            .and_then(|f| self.tree.get(f).function_indicator())
            .is_some_and(|i| i.flags.new_commitments_required)
    }

    fn statement(&mut self, statement: &Node) {
        let (secret, public_state) = interactions(self.tree, statement);
        self.annotations.interacts_with_secret.insert(statement.id, secret);
        self.annotations.interacts_with_public.insert(statement.id, public_state);

        // nested statements are visited on their own; an `if` only answers for its condition
        let own = match &statement.kind {
            NodeKind::IfStatement { condition, .. } => condition.as_ref(),
            _ => statement,
        };
        let (secret, public_state) = interactions(self.tree, own);
        if !secret || !self.modifies_secret_state() {
            return;
        }
        let mut senders = 0usize;
        let mut sender_keys = 0usize;
        traverse_fast(own, &mut |n: &Node, _: &mut Control| {
            if n.is_msg_sender() {
                senders += 1;
            }
            if let NodeKind::IndexAccess { index_expression, .. } = &n.kind {
                if index_expression.is_msg_sender() {
                    sender_keys += 1;
                }
            }
        });
        let outside_key = senders > sender_keys;
        if (senders > 0 && public_state) || outside_key {
            if let Some(function) = self.function {
                self.msg_sender.insert(function);
            }
        }
    }

    fn require(&mut self, call: &Node) -> Result<()> {
        let NodeKind::FunctionCall { arguments, .. } = &call.kind else {
            return Ok(());
        };
        let mut private = false;
        for argument in arguments {
            for (binding, at) in referenced(self.tree, argument) {
                if !binding.is_secret {
                    continue;
                }
                private = true;
                if binding.is_secret_state() && binding.strategy.is_partitioned() {
                    return Err(CompilerError::syntax_usage(
                        format!(
                            "require on partitioned secret state '{}' cannot be proven",
                            binding.name
                        ),
                        at,
                    ));
                }
            }
        }
        self.annotations.require_statement_private.insert(call.id, private);
        Ok(())
    }

    fn assignment(&mut self, lhs: &Node, rhs: &Node) -> Result<()> {
        let Some(target) = lhs.target_identifier().and_then(|t| self.tree.resolve(t.id)) else {
            return Ok(());
        };
        if target.kind != DeclarationKind::StateVariable {
            return Ok(());
        }
        for (source, at) in referenced(self.tree, rhs) {
            if !target.is_secret && source.is_secret {
                return Err(CompilerError::syntax_usage(
                    format!("secret '{}' assigned to public state '{}'", source.name, target.name),
                    at,
                ));
            }
            if target.is_secret && !source.is_secret && source.kind == DeclarationKind::Parameter {
                let message = format!(
                    "public parameter '{}' flows into secret state '{}' and will be visible on chain",
                    source.name, target.name
                );
                warn!(src = %at, "{}", message);
                self.warnings.push(Warning::new(message, Some(at)));
            }
        }
        Ok(())
    }
}

impl Visitor for Annotator<'_> {
    fn enter(&mut self, path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        let node = path.node;
        match &node.kind {
            NodeKind::FunctionDefinition { .. } => {
                self.function = self.tree.scope_of_node(node.id);
            }
            NodeKind::FunctionCall { .. } if node.is_require_call() => self.require(node)?,
            NodeKind::Assignment { left_hand_side, right_hand_side, .. } => {
                self.assignment(left_hand_side, right_hand_side)?
            }
            _ if node.is_statement() && self.function.is_some() => self.statement(node),
            _ => {}
        }
        Ok(())
    }

    fn exit(&mut self, path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        if matches!(path.node.kind, NodeKind::FunctionDefinition { .. }) {
            self.function = None;
        }
        Ok(())
    }
}
