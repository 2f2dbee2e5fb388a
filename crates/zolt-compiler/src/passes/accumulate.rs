//! Pass 2: indicator accumulation
//!
//! Classifies every secret state as whole or partitioned, decides which of its writes
//! nullify an old commitment, then derives the per-function indicators and the contract
//! aggregate from the bindings. All updates go through monotonic merges, so running the
//! pass again over the same bindings changes nothing.

use tracing::debug;

use crate::ast::NodeId;
use crate::binding::{Binding, Occurrence, OccurrenceRole, WriteShape};
use crate::error::{CompilerError, Result};
use crate::indicator::{
    ContractFlags, FunctionIndicator, ReasonKind, StateIndicator, Strategy, StrategyReason,
};
use crate::scope::{ScopeId, ScopeKind, ScopeTree};

pub fn run(tree: &mut ScopeTree) -> Result<()> {
    for contract in tree.contracts().to_vec() {
        accumulate_contract(tree, contract)?;
    }
    Ok(())
}

fn binding(tree: &ScopeTree, id: NodeId) -> Result<&Binding> {
    tree.binding(id).ok_or_else(|| CompilerError::internal(format!("no binding for {}", id)))
}

fn accumulate_contract(tree: &mut ScopeTree, contract: ScopeId) -> Result<()> {
    let states: Vec<NodeId> = tree.secret_states(contract).iter().map(|b| b.id).collect();
    for id in &states {
        classify(tree, *id)?;
        mark_nullifiers(tree, *id)?;
    }

    let mut aggregate = ContractFlags {
        zk_snark_verification_required: !states.is_empty(),
        ..ContractFlags::default()
    };
    for function in tree.get(contract).children.clone() {
        let indicator = function_indicator(tree, function, &states)?;
        aggregate.absorb(&indicator.flags);
        tree.get_mut(function).merge_function(&indicator)?;
    }
    tree.get_mut(contract).merge_contract(&aggregate)?;
    debug!(contract = %tree.get(contract).name, ?aggregate, "accumulated indicators");
    Ok(())
}

/// Decides whole vs. partitioned from the state's writes and reads, in source order
fn classify(tree: &mut ScopeTree, id: NodeId) -> Result<()> {
    let state = binding(tree, id)?;
    let reasons: Vec<StrategyReason> = state
        .occurrences
        .referencing()
        .iter()
        .filter_map(|o| {
            let kind = match o.role {
                OccurrenceRole::Read => ReasonKind::Accessed,
                OccurrenceRole::Write(WriteShape::Overwrite) => ReasonKind::Overwritten,
                OccurrenceRole::Write(WriteShape::Increment) => ReasonKind::Incremented,
                OccurrenceRole::Write(WriteShape::Decrement) => ReasonKind::Decremented,
                OccurrenceRole::SelfOperand => return None,
            };
            Some(StrategyReason { kind, node: o.node, src: o.src })
        })
        .collect();

    let (name, declared_at) = (state.name.clone(), state.src);
    let state = tree
        .binding_mut(id)
        .ok_or_else(|| CompilerError::internal(format!("no binding for {}", id)))?;
    for reason in reasons {
        if state.strategy.assign(&name, declared_at, reason)? {
            debug!(state = %name, strategy = %reason.kind.strategy(), reason = ?reason.kind, "classified");
        }
    }
    Ok(())
}

/// Writes that create the first commitment of a state: constructor bodies and
/// contract-level initialisers
fn initialises(tree: &ScopeTree, occurrence: &Occurrence) -> bool {
    let scope = tree.get(occurrence.scope);
    scope.kind == ScopeKind::Contract || scope.is_constructor()
}

/// Marks the writes that consume an old commitment
///
/// Whole states (plain or keyed): every write outside initialisation nullifies.
/// Partitioned states: decrements nullify.
fn mark_nullifiers(tree: &mut ScopeTree, id: NodeId) -> Result<()> {
    let view: &ScopeTree = tree;
    let state = binding(view, id)?;
    let modifying = state.occurrences.modifying().iter();
    let nodes: Vec<NodeId> = match state.strategy.get() {
        Some(Strategy::Whole) => modifying.filter(|o| !initialises(view, o)).map(|o| o.node).collect(),
        Some(Strategy::Partitioned) => modifying
            .filter(|o| o.role == OccurrenceRole::Write(WriteShape::Decrement))
            .map(|o| o.node)
            .collect(),
        None => Vec::new(),
    };

    if let Some(state) = tree.binding_mut(id) {
        for node in nodes {
            state.nullify(node);
        }
    }
    Ok(())
}

/// Whether a read may observe a value written before it
///
/// Inside one function, only writes in an earlier statement count. A write in any other
/// function can run before this one, unless the read sits in the constructor.
fn reads_earlier_write(tree: &ScopeTree, state: &Binding, read: &Occurrence) -> bool {
    state.occurrences.modifying().iter().any(|write| {
        if write.scope != read.scope {
            return !initialises(tree, read);
        }
        write.src.start < read.src.start && write.statement != read.statement
    })
}

fn function_indicator(
    tree: &ScopeTree,
    function: ScopeId,
    states: &[NodeId],
) -> Result<FunctionIndicator> {
    let mut indicator = FunctionIndicator::default();
    for id in states {
        let state = binding(tree, *id)?;
        let here: Vec<_> = state.occurrences_in(function).collect();
        if here.is_empty() {
            continue;
        }

        let mut facts = StateIndicator::new(*id, &state.name);
        facts.strategy = state.strategy.get();
        let has_shape = |shape| here.iter().any(|o| o.role == OccurrenceRole::Write(shape));
        let flags = &mut facts.flags;
        flags.is_referenced = true;
        flags.is_modified = here.iter().any(|o| o.role.is_write());
        flags.is_nullified = here.iter().any(|o| state.occurrences.is_nullifying(o.node));
        flags.is_accessed = here.iter().any(|o| o.role == OccurrenceRole::Read);
        flags.is_incremented = has_shape(WriteShape::Increment);
        flags.is_decremented = has_shape(WriteShape::Decrement);
        flags.new_commitments_required = flags.is_modified;
        flags.nullifiers_required = flags.is_nullified;

        let read_after_write = here
            .iter()
            .filter(|o| o.role == OccurrenceRole::Read)
            .any(|read| reads_earlier_write(tree, state, read));
        flags.old_commitment_access_required = read_after_write || flags.is_decremented;

        let function_flags = &mut indicator.flags;
        function_flags.nullifiers_required |= flags.nullifiers_required;
        function_flags.new_commitments_required |= flags.new_commitments_required;
        function_flags.old_commitment_access_required |= flags.old_commitment_access_required;
        function_flags.contains_accessed_only_state |= flags.is_accessed && !flags.is_modified;

        indicator.states.insert(*id, facts);
    }
    Ok(indicator)
}
