//! Pass 3: completeness checks and freezing
//!
//! On leaving a function, its indicators are checked and folded into the bindings'
//! contract-wide summaries, exactly once. On leaving a contract, every function must
//! have been folded in; then each secret state's nullifiability is checked and the
//! contract's scopes are frozen.

use tracing::{debug, info};

use crate::ast::{Node, NodeKind};
use crate::binding::OccurrenceRole;
use crate::error::{CompilerError, Result};
use crate::scope::{ScopeId, ScopeTree};
use crate::traverse::{traverse, Control, NodePath, Visitor};

pub fn run(ast: &Node, tree: &mut ScopeTree) -> Result<()> {
    traverse(ast, &mut Checker { tree })
}

struct Checker<'t> {
    tree: &'t mut ScopeTree,
}

impl Checker<'_> {
    fn scope(&self, node: &Node) -> Result<ScopeId> {
        self.tree.scope_of_node(node.id).ok_or_else(|| {
            CompilerError::internal(format!("no scope for {} {}", node.kind_name(), node.id))
        })
    }

    fn check_function(&self, function: ScopeId) -> Result<()> {
        let Some(indicator) = self.tree.get(function).function_indicator() else {
            return Err(CompilerError::internal("function scope without function indicators"));
        };
        for state in indicator.states.values() {
            let binding = self.tree.binding(state.binding).ok_or_else(|| {
                CompilerError::internal(format!("indicator for unknown binding {}", state.binding))
            })?;
            if state.is_whole() && (state.flags.is_incremented || state.flags.is_decremented) {
                return Err(CompilerError::internal(format!(
                    "whole state '{}' carries partitioned facts",
                    state.name
                )));
            }
            if state.flags.is_accessed && !binding.is_constant && !binding.occurrences.is_modified() {
                let read = binding
                    .occurrences_in(function)
                    .find(|o| o.role == OccurrenceRole::Read)
                    .map_or(binding.src, |o| o.src);
                return Err(CompilerError::syntax_usage(
                    format!("secret state '{}' is read but never assigned, so no commitment exists", state.name),
                    read,
                ));
            }
        }
        Ok(())
    }

    /// Folds a function's state facts into the bindings' summaries
    fn merge_up(&mut self, function: ScopeId) -> Result<()> {
        self.tree.get_mut(function).mark_merged()?;
        let states: Vec<_> = self
            .tree
            .get(function)
            .function_indicator()
            .map(|i| i.states.values().cloned().collect())
            .unwrap_or_default();
        for state in states {
            if let Some(binding) = self.tree.binding_mut(state.binding) {
                binding.summary.merge(&state.flags);
            }
        }
        Ok(())
    }

    fn finish_contract(&mut self, contract: ScopeId) -> Result<()> {
        let scope = self.tree.get(contract);
        if let Some(pending) = scope.children.iter().find(|c| !self.tree.get(**c).is_merged()) {
            return Err(CompilerError::internal(format!(
                "contract '{}' checked before function '{}' was merged",
                scope.name,
                self.tree.get(*pending).name
            )));
        }
        for state in self.tree.secret_states(contract) {
            if !state.is_nullifiable() {
                return Err(CompilerError::NonNullifiableSecretState {
                    name: state.name.clone(),
                    src: state.src,
                });
            }
        }

        let children = scope.children.clone();
        let name = scope.name.clone();
        for child in children {
            self.tree.get_mut(child).freeze();
        }
        self.tree.get_mut(contract).freeze();
        info!(contract = %name, "indicators frozen");
        Ok(())
    }
}

impl Visitor for Checker<'_> {
    fn exit(&mut self, path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        match &path.node.kind {
            NodeKind::FunctionDefinition { .. } => {
                let function = self.scope(path.node)?;
                self.check_function(function)?;
                self.merge_up(function)?;
                debug!(function = %self.tree.get(function).name, "merged into bindings");
            }
            NodeKind::ContractDefinition { .. } => {
                let contract = self.scope(path.node)?;
                self.finish_contract(contract)?;
            }
            _ => {}
        }
        Ok(())
    }
}
