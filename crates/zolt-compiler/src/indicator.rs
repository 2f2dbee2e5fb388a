//! Indicators: derived facts about secret states, per function and per contract
//!
//! Every flag starts false and only ever moves to true. All updates go through `merge`,
//! which reports whether anything changed so callers can reject late updates once a
//! scope is frozen. The commitment strategy of a state is decided once; assigning a
//! different strategy afterwards is a [`CompilerError::CommitmentStrategyConflict`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::ast::{NodeId, SourceLocation};
use crate::error::{CompilerError, Result};

fn raise(slot: &mut bool, value: bool, changed: &mut bool) {
    if value && !*slot {
        *slot = true;
        *changed = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    Whole,
    Partitioned,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Whole => f.write_str("whole"),
            Strategy::Partitioned => f.write_str("partitioned"),
        }
    }
}

/// Why a state was classified the way it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReasonKind {
    Overwritten,
    Accessed,
    Incremented,
    Decremented,
}

impl ReasonKind {
    pub fn strategy(self) -> Strategy {
        match self {
            ReasonKind::Overwritten | ReasonKind::Accessed => Strategy::Whole,
            ReasonKind::Incremented | ReasonKind::Decremented => Strategy::Partitioned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyReason {
    pub kind: ReasonKind,
    pub node: NodeId,
    pub src: SourceLocation,
}

impl fmt::Display for StrategyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({}) at {}", self.kind, self.kind.strategy(), self.src)
    }
}

/// Write-once commitment strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrategyCell {
    decided: Option<StrategyReason>,
}

impl StrategyCell {
    pub fn get(&self) -> Option<Strategy> {
        self.decided.map(|r| r.kind.strategy())
    }

    pub fn reason(&self) -> Option<&StrategyReason> {
        self.decided.as_ref()
    }

    pub fn is_whole(&self) -> bool {
        self.get() == Some(Strategy::Whole)
    }

    pub fn is_partitioned(&self) -> bool {
        self.get() == Some(Strategy::Partitioned)
    }

    /// Returns `Ok(true)` when the strategy was decided by this call
    pub fn assign(
        &mut self,
        name: &str,
        declared_at: SourceLocation,
        reason: StrategyReason,
    ) -> Result<bool> {
        match self.decided {
            None => {
                self.decided = Some(reason);
                Ok(true)
            }
            Some(first) if first.kind.strategy() == reason.kind.strategy() => Ok(false),
            Some(first) => Err(CompilerError::CommitmentStrategyConflict {
                name: name.to_string(),
                src: declared_at,
                first,
                second: reason,
            }),
        }
    }
}

/// Facts about one secret state within one function (or summarised over the contract)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFlags {
    pub is_referenced: bool,
    pub is_modified: bool,
    pub is_nullified: bool,
    pub is_accessed: bool,
    pub old_commitment_access_required: bool,
    pub nullifiers_required: bool,
    pub new_commitments_required: bool,
    pub is_incremented: bool,
    pub is_decremented: bool,
}

impl StateFlags {
    pub fn merge(&mut self, other: &StateFlags) -> bool {
        let mut changed = false;
        raise(&mut self.is_referenced, other.is_referenced, &mut changed);
        raise(&mut self.is_modified, other.is_modified, &mut changed);
        raise(&mut self.is_nullified, other.is_nullified, &mut changed);
        raise(&mut self.is_accessed, other.is_accessed, &mut changed);
        raise(
            &mut self.old_commitment_access_required,
            other.old_commitment_access_required,
            &mut changed,
        );
        raise(&mut self.nullifiers_required, other.nullifiers_required, &mut changed);
        raise(&mut self.new_commitments_required, other.new_commitments_required, &mut changed);
        raise(&mut self.is_incremented, other.is_incremented, &mut changed);
        raise(&mut self.is_decremented, other.is_decremented, &mut changed);
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateIndicator {
    pub binding: NodeId,
    pub name: String,
    #[serde(flatten)]
    pub flags: StateFlags,
    pub strategy: Option<Strategy>,
}

impl StateIndicator {
    pub fn new(binding: NodeId, name: impl Into<String>) -> Self {
        Self { binding, name: name.into(), flags: StateFlags::default(), strategy: None }
    }

    pub fn is_whole(&self) -> bool {
        self.strategy == Some(Strategy::Whole)
    }

    pub fn is_partitioned(&self) -> bool {
        self.strategy == Some(Strategy::Partitioned)
    }

    pub fn merge(&mut self, other: &StateIndicator) -> Result<bool> {
        let mut changed = self.flags.merge(&other.flags);
        match (self.strategy, other.strategy) {
            (None, Some(strategy)) => {
                self.strategy = Some(strategy);
                changed = true;
            }
            (Some(mine), Some(theirs)) if mine != theirs => {
                return Err(CompilerError::internal(format!(
                    "state '{}' switched from {} to {} after classification",
                    self.name, mine, theirs
                )));
            }
            _ => {}
        }
        Ok(changed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionFlags {
    pub nullifiers_required: bool,
    pub old_commitment_access_required: bool,
    pub new_commitments_required: bool,
    pub msg_sender_param: bool,
    pub contains_accessed_only_state: bool,
}

impl FunctionFlags {
    pub fn merge(&mut self, other: &FunctionFlags) -> bool {
        let mut changed = false;
        raise(&mut self.nullifiers_required, other.nullifiers_required, &mut changed);
        raise(
            &mut self.old_commitment_access_required,
            other.old_commitment_access_required,
            &mut changed,
        );
        raise(&mut self.new_commitments_required, other.new_commitments_required, &mut changed);
        raise(&mut self.msg_sender_param, other.msg_sender_param, &mut changed);
        raise(
            &mut self.contains_accessed_only_state,
            other.contains_accessed_only_state,
            &mut changed,
        );
        changed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionIndicator {
    #[serde(flatten)]
    pub flags: FunctionFlags,
    pub states: BTreeMap<NodeId, StateIndicator>,
}

impl FunctionIndicator {
    pub fn merge(&mut self, other: &FunctionIndicator) -> Result<bool> {
        let mut changed = self.flags.merge(&other.flags);
        for (id, state) in &other.states {
            match self.states.get_mut(id) {
                Some(existing) => changed |= existing.merge(state)?,
                None => {
                    self.states.insert(*id, state.clone());
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    pub fn state(&self, binding: NodeId) -> Option<&StateIndicator> {
        self.states.get(&binding)
    }

    /// Looks a state up by its declared name
    pub fn state_named(&self, name: &str) -> Option<&StateIndicator> {
        self.states.values().find(|s| s.name == name)
    }

    pub fn interacts_with_secret(&self) -> bool {
        self.states.values().any(|s| s.flags.is_referenced)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractFlags {
    pub nullifiers_required: bool,
    pub old_commitment_access_required: bool,
    pub new_commitments_required: bool,
    pub contains_accessed_only_state: bool,
    pub zk_snark_verification_required: bool,
}

impl ContractFlags {
    pub fn merge(&mut self, other: &ContractFlags) -> bool {
        let mut changed = false;
        raise(&mut self.nullifiers_required, other.nullifiers_required, &mut changed);
        raise(
            &mut self.old_commitment_access_required,
            other.old_commitment_access_required,
            &mut changed,
        );
        raise(&mut self.new_commitments_required, other.new_commitments_required, &mut changed);
        raise(
            &mut self.contains_accessed_only_state,
            other.contains_accessed_only_state,
            &mut changed,
        );
        raise(
            &mut self.zk_snark_verification_required,
            other.zk_snark_verification_required,
            &mut changed,
        );
        changed
    }

    /// Folds one function's flags into the contract aggregate
    pub fn absorb(&mut self, function: &FunctionFlags) -> bool {
        self.merge(&ContractFlags {
            nullifiers_required: function.nullifiers_required,
            old_commitment_access_required: function.old_commitment_access_required,
            new_commitments_required: function.new_commitments_required,
            contains_accessed_only_state: function.contains_accessed_only_state,
            zk_snark_verification_required: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "camelCase")]
pub enum ScopeIndicators {
    Contract(ContractFlags),
    Function(FunctionIndicator),
}

impl ScopeIndicators {
    pub fn as_contract(&self) -> Option<&ContractFlags> {
        match self {
            ScopeIndicators::Contract(flags) => Some(flags),
            ScopeIndicators::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionIndicator> {
        match self {
            ScopeIndicators::Function(indicator) => Some(indicator),
            ScopeIndicators::Contract(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(kind: ReasonKind, start: usize) -> StrategyReason {
        StrategyReason { kind, node: NodeId(start as i64), src: SourceLocation::new(start, 1, 0) }
    }

    #[test]
    fn test_flags_only_rise() {
        let mut flags = StateFlags { is_modified: true, ..Default::default() };
        let changed = flags.merge(&StateFlags::default());
        assert!(!changed);
        assert!(flags.is_modified);

        let changed = flags.merge(&StateFlags { is_nullified: true, ..Default::default() });
        assert!(changed);
        assert!(flags.is_modified && flags.is_nullified);
    }

    #[test]
    fn test_strategy_assigned_once() {
        let declared = SourceLocation::new(0, 1, 0);
        let mut cell = StrategyCell::default();
        assert!(cell.assign("x", declared, reason(ReasonKind::Incremented, 5)).unwrap());
        assert!(!cell.assign("x", declared, reason(ReasonKind::Decremented, 9)).unwrap());
        assert!(cell.is_partitioned());

        let err = cell.assign("x", declared, reason(ReasonKind::Overwritten, 12)).unwrap_err();
        assert!(matches!(err, CompilerError::CommitmentStrategyConflict { .. }));
        assert!(cell.is_partitioned());
    }

    #[test]
    fn test_state_indicator_strategy_switch_is_internal() {
        let mut a = StateIndicator::new(NodeId(1), "a");
        a.strategy = Some(Strategy::Whole);
        let mut b = StateIndicator::new(NodeId(1), "a");
        b.strategy = Some(Strategy::Partitioned);
        assert!(matches!(a.merge(&b), Err(CompilerError::Internal(_))));
    }

    #[test]
    fn test_contract_absorbs_function_flags() {
        let mut contract = ContractFlags::default();
        let function = FunctionFlags { nullifiers_required: true, ..Default::default() };
        assert!(contract.absorb(&function));
        assert!(!contract.absorb(&function));
        assert!(contract.nullifiers_required);
        assert!(!contract.zk_snark_verification_required);
    }
}
