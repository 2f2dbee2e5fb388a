//! Emission planning
//!
//! Emitters for the three targets walk the same decorated tree. A block is planned as
//! its pre-statement directives, then the original statements, then its post-statement
//! directives. Statements a target has no use for become [`PlannedStatement::NoOp`]
//! markers rather than disappearing, so statement positions line up across targets.

use serde::Serialize;
use std::rc::Rc;

use crate::ast::{NodeId, NodeKind};
use crate::boilerplate::{Directive, Section};
use crate::decorated::DecoratedTree;
use crate::error::{CompilerError, Result};
use crate::indicator::Strategy;
use crate::scope::{ScopeId, ScopeKind};
use zolt_runtime::{
    CommitmentPreimage, FieldConfig, FieldElement, MembershipWitness, NullifierPreimage,
    WitnessService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    /// Public ledger contract, stripped of secret data
    Contract,
    Circuit,
    Orchestration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedStatement {
    Boilerplate(Rc<Directive>),
    Original(NodeId),
    NoOp(NodeId),
}

#[derive(Debug, Clone)]
pub struct BlockPlan {
    pub function: String,
    pub target: Target,
    pub statements: Vec<PlannedStatement>,
}

impl BlockPlan {
    pub fn originals(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.statements.iter().filter_map(|s| match s {
            PlannedStatement::Original(id) => Some(*id),
            _ => None,
        })
    }

    pub fn no_ops(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.statements.iter().filter_map(|s| match s {
            PlannedStatement::NoOp(id) => Some(*id),
            _ => None,
        })
    }
}

fn function_scope(tree: &DecoratedTree, function: ScopeId) -> Result<&crate::scope::Scope> {
    let scope = tree.scopes.get(function);
    if scope.kind != ScopeKind::Function {
        return Err(CompilerError::internal(format!("'{}' is not a function scope", scope.name)));
    }
    Ok(scope)
}

pub fn plan_block(tree: &DecoratedTree, function: ScopeId, target: Target) -> Result<BlockPlan> {
    let scope = function_scope(tree, function)?;
    let node = tree
        .ast
        .find(scope.node)
        .ok_or_else(|| CompilerError::internal(format!("function node {} missing", scope.node)))?;
    let NodeKind::FunctionDefinition { body, .. } = &node.kind else {
        return Err(CompilerError::internal(format!("scope '{}' is not a function", scope.name)));
    };
    let body = body
        .as_ref()
        .ok_or_else(|| CompilerError::unsupported("function without a body", Some(node.src)))?;
    let NodeKind::Block { statements } = &body.kind else {
        return Err(CompilerError::unsupported(format!("function body {}", body.kind_name()), Some(body.src)));
    };

    let mut planned: Vec<PlannedStatement> = tree
        .select(function, Section::Parameters)?
        .into_iter()
        .map(PlannedStatement::Boilerplate)
        .collect();
    for statement in statements {
        let secret = tree.annotations.interacts_with_secret(statement.id);
        let keep = match target {
            Target::Contract => !secret,
            Target::Circuit | Target::Orchestration => secret,
        };
        planned.push(if keep {
            PlannedStatement::Original(statement.id)
        } else {
            PlannedStatement::NoOp(statement.id)
        });
    }
    planned.extend(
        tree.select(function, Section::PostStatements)?.into_iter().map(PlannedStatement::Boilerplate),
    );

    Ok(BlockPlan { function: scope.name.clone(), target, statements: planned })
}

/// What an orchestration emitter must do for one secret state in one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPlan {
    pub state: String,
    pub binding: NodeId,
    /// Merkle container the state's commitments live in
    pub container_id: String,
    pub strategy: Strategy,
    pub membership_witness: bool,
    pub publishes_nullifier: bool,
    pub new_commitment: bool,
    pub mapping_keys: Vec<String>,
    pub commitment_fields: Vec<&'static str>,
    pub nullifier_fields: Vec<&'static str>,
    pub field_bits: u32,
}

impl CommitmentPlan {
    /// Fetches and checks the membership witness of an old commitment, when one is needed
    pub fn fetch_witness<W: WitnessService>(
        &self,
        service: &W,
        commitment: &FieldElement,
        tree_depth: usize,
    ) -> Result<Option<MembershipWitness>> {
        if !self.membership_witness {
            return Ok(None);
        }
        let witness = service.get_membership_witness(&self.container_id, commitment)?;
        witness.validate(tree_depth)?;
        let root = service.get_root(&self.container_id)?;
        if witness.root != root {
            return Err(zolt_runtime::ZoltError::invalid_witness(format!(
                "witness root {} is not the current root {} of '{}'",
                witness.root, root, self.container_id
            ))
            .into());
        }
        Ok(Some(witness))
    }
}

pub fn commitment_plan(
    tree: &DecoratedTree,
    function: ScopeId,
    field: &FieldConfig,
) -> Result<Vec<CommitmentPlan>> {
    let scope = function_scope(tree, function)?;
    let indicator = scope
        .function_indicator()
        .ok_or_else(|| CompilerError::internal("function scope without function indicators"))?;

    let mut plans = Vec::new();
    for state in indicator.states.values() {
        let binding = tree
            .scopes
            .binding(state.binding)
            .ok_or_else(|| CompilerError::internal(format!("no binding for {}", state.binding)))?;
        let strategy = state.strategy.ok_or_else(|| {
            CompilerError::internal(format!("secret state '{}' was never classified", state.name))
        })?;
        let mut mapping_keys: Vec<String> = binding
            .occurrences_in(function)
            .filter_map(|o| o.key.clone())
            .collect();
        mapping_keys.sort();
        mapping_keys.dedup();

        plans.push(CommitmentPlan {
            state: state.name.clone(),
            binding: state.binding,
            container_id: state.name.clone(),
            strategy,
            membership_witness: state.flags.old_commitment_access_required || state.flags.nullifiers_required,
            publishes_nullifier: state.flags.nullifiers_required,
            new_commitment: state.flags.new_commitments_required,
            mapping_keys,
            commitment_fields: CommitmentPreimage::FIELDS.to_vec(),
            nullifier_fields: if state.flags.nullifiers_required {
                NullifierPreimage::FIELDS.to_vec()
            } else {
                Vec::new()
            },
            field_bits: field.bits(),
        });
    }
    Ok(plans)
}
