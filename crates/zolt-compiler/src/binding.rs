//! Bindings: one per declared symbol, alive for the whole contract
//!
//! A binding keeps three occurrence lists. Referencing holds every occurrence, modifying
//! the writes among them, nullifying the writes that consume an old commitment. The
//! lists stay sorted by source position and each is a subset of the previous one.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::ast::{NodeId, SourceLocation};
use crate::indicator::{StateFlags, StrategyCell};
use crate::mapping_key::MappingKey;
use crate::scope::ScopeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    StateVariable,
    Parameter,
    ReturnParameter,
    LocalVariable,
    FunctionDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteShape {
    Increment,
    Decrement,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OccurrenceRole {
    Read,
    Write(WriteShape),
    /// The `x` on the right of `x = x + k`
    SelfOperand,
}

impl OccurrenceRole {
    pub fn is_write(&self) -> bool {
        matches!(self, OccurrenceRole::Write(_))
    }

    pub fn shape(&self) -> Option<WriteShape> {
        match self {
            OccurrenceRole::Write(shape) => Some(*shape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub node: NodeId,
    pub src: SourceLocation,
    /// Function scope the occurrence sits in
    pub scope: ScopeId,
    pub statement: Option<NodeId>,
    pub role: OccurrenceRole,
    /// Mapping key name when the occurrence is `m[key]`
    pub key: Option<String>,
}

impl Occurrence {
    fn position(&self) -> (usize, usize, NodeId) {
        (self.src.start, self.src.length, self.node)
    }
}

fn insert_sorted(list: &mut Vec<Occurrence>, occurrence: Occurrence) -> bool {
    if list.iter().any(|o| o.node == occurrence.node) {
        return false;
    }
    let at = list.partition_point(|o| o.position() <= occurrence.position());
    list.insert(at, occurrence);
    true
}

/// Referencing, modifying and nullifying occurrences of one symbol (or one mapping key)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceLists {
    referencing: Vec<Occurrence>,
    modifying: Vec<Occurrence>,
    nullifying: Vec<Occurrence>,
}

impl OccurrenceLists {
    /// Adds a reference, and a modification when the role is a write
    pub fn record(&mut self, occurrence: Occurrence) {
        if occurrence.role.is_write() {
            insert_sorted(&mut self.modifying, occurrence.clone());
        }
        insert_sorted(&mut self.referencing, occurrence);
    }

    /// Marks a recorded modification as nullifying; unknown nodes are ignored
    pub fn nullify(&mut self, node: NodeId) -> bool {
        match self.modifying.iter().find(|o| o.node == node) {
            Some(occurrence) => insert_sorted(&mut self.nullifying, occurrence.clone()),
            None => false,
        }
    }

    pub fn referencing(&self) -> &[Occurrence] {
        &self.referencing
    }

    pub fn modifying(&self) -> &[Occurrence] {
        &self.modifying
    }

    pub fn nullifying(&self) -> &[Occurrence] {
        &self.nullifying
    }

    pub fn is_referenced(&self) -> bool {
        !self.referencing.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        !self.modifying.is_empty()
    }

    pub fn is_nullified(&self) -> bool {
        !self.nullifying.is_empty()
    }

    pub fn is_nullifying(&self, node: NodeId) -> bool {
        self.nullifying.iter().any(|o| o.node == node)
    }

    /// Sorted, duplicate free, and nullifying ⊆ modifying ⊆ referencing
    pub fn is_consistent(&self) -> bool {
        let sorted = |list: &[Occurrence]| list.windows(2).all(|w| w[0].position() < w[1].position());
        let subset = |small: &[Occurrence], big: &[Occurrence]| {
            small.iter().all(|o| big.iter().any(|b| b.node == o.node))
        };
        sorted(&self.referencing)
            && sorted(&self.modifying)
            && sorted(&self.nullifying)
            && subset(&self.modifying, &self.referencing)
            && subset(&self.nullifying, &self.modifying)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub id: NodeId,
    pub name: String,
    pub kind: DeclarationKind,
    pub is_secret: bool,
    pub is_mapping: bool,
    pub is_constant: bool,
    pub src: SourceLocation,
    /// Scope the symbol is declared in
    pub scope: ScopeId,
    /// Scope opened by the declaration, for function definitions
    pub function_scope: Option<ScopeId>,
    pub occurrences: OccurrenceLists,
    pub mapping_keys: BTreeMap<String, MappingKey>,
    /// Contract-wide summary, merged from every function scope
    pub summary: StateFlags,
    pub strategy: StrategyCell,
}

impl Binding {
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        kind: DeclarationKind,
        src: SourceLocation,
        scope: ScopeId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            is_secret: false,
            is_mapping: false,
            is_constant: false,
            src,
            scope,
            function_scope: None,
            occurrences: OccurrenceLists::default(),
            mapping_keys: BTreeMap::new(),
            summary: StateFlags::default(),
            strategy: StrategyCell::default(),
        }
    }

    pub fn secret(mut self, is_secret: bool) -> Self {
        self.is_secret = is_secret;
        self
    }

    pub fn mapping(mut self, is_mapping: bool) -> Self {
        self.is_mapping = is_mapping;
        self
    }

    pub fn constant(mut self, is_constant: bool) -> Self {
        self.is_constant = is_constant;
        self
    }

    pub fn is_secret_state(&self) -> bool {
        self.is_secret && self.kind == DeclarationKind::StateVariable
    }

    /// Records an occurrence on the binding and, for keyed accesses, on its mapping key
    pub fn record(&mut self, occurrence: Occurrence, key: Option<MappingKey>) {
        if let (Some(name), Some(template)) = (occurrence.key.clone(), key) {
            let mapping_key = self.mapping_keys.entry(name).or_insert(template);
            mapping_key.is_accessed |= occurrence.role == OccurrenceRole::Read;
            mapping_key.occurrences.record(occurrence.clone());
        }
        self.occurrences.record(occurrence);
    }

    /// Marks a modification as nullifying on the binding and its mapping key
    pub fn nullify(&mut self, node: NodeId) -> bool {
        let key = self.occurrences.modifying().iter().find(|o| o.node == node).and_then(|o| o.key.clone());
        if let Some(mapping_key) = key.and_then(|k| self.mapping_keys.get_mut(&k)) {
            mapping_key.occurrences.nullify(node);
        }
        self.occurrences.nullify(node)
    }

    pub fn occurrences_in(&self, scope: ScopeId) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.referencing().iter().filter(move |o| o.scope == scope)
    }

    /// Whether every modification of this secret state can be nullified
    ///
    /// Only whole, non-constant states are constrained. A mapping is nullifiable if any of
    /// its dynamic keys is nullified, otherwise every modified key that is not only accessed
    /// must be.
    pub fn is_nullifiable(&self) -> bool {
        if !self.is_secret_state()
            || self.is_constant
            || !self.strategy.is_whole()
            || !self.occurrences.is_modified()
        {
            return true;
        }
        if !self.is_mapping {
            return self.occurrences.is_nullified();
        }
        if self.mapping_keys.values().any(|k| k.is_dynamic() && k.occurrences.is_nullified()) {
            return true;
        }
        self.mapping_keys
            .values()
            .filter(|k| k.occurrences.is_modified() && !k.is_accessed)
            .all(|k| k.occurrences.is_nullified())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occurrence(node: i64, start: usize, role: OccurrenceRole) -> Occurrence {
        Occurrence {
            node: NodeId(node),
            src: SourceLocation::new(start, 1, 0),
            scope: ScopeId(1),
            statement: None,
            role,
            key: None,
        }
    }

    #[test]
    fn test_record_keeps_source_order() {
        let mut lists = OccurrenceLists::default();
        lists.record(occurrence(3, 30, OccurrenceRole::Read));
        lists.record(occurrence(1, 10, OccurrenceRole::Write(WriteShape::Overwrite)));
        lists.record(occurrence(2, 20, OccurrenceRole::Write(WriteShape::Overwrite)));
        lists.record(occurrence(2, 20, OccurrenceRole::Write(WriteShape::Overwrite)));

        let starts: Vec<usize> = lists.referencing().iter().map(|o| o.src.start).collect();
        assert_eq!(starts, vec![10, 20, 30]);
        assert_eq!(lists.modifying().len(), 2);
        assert!(lists.is_consistent());
    }

    #[test]
    fn test_nullify_requires_modification() {
        let mut lists = OccurrenceLists::default();
        lists.record(occurrence(1, 10, OccurrenceRole::Read));
        lists.record(occurrence(2, 20, OccurrenceRole::Write(WriteShape::Overwrite)));

        assert!(!lists.nullify(NodeId(1)));
        assert!(lists.nullify(NodeId(2)));
        assert!(!lists.nullify(NodeId(2)));
        assert_eq!(lists.nullifying().len(), 1);
        assert!(lists.is_consistent());
    }
}
