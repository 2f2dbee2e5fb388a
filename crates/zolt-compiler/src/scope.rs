//! Scope arena
//!
//! One [`Scope`] per contract and per function definition, stored in a [`ScopeTree`]
//! and addressed by [`ScopeId`]. Contract scopes are roots; each function scope has
//! exactly one contract parent. Scopes own the bindings declared in them and their
//! indicators, which become read-only once the scope is frozen.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::ast::{FunctionKind, NodeId, SourceLocation};
use crate::binding::{Binding, DeclarationKind};
use crate::error::{CompilerError, Result};
use crate::indicator::{ContractFlags, FunctionIndicator, ScopeIndicators};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeKind {
    Contract,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
    pub name: String,
    pub binding: NodeId,
    pub is_secret: bool,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub node: NodeId,
    pub src: SourceLocation,
    /// Contract name, or the unique function name
    pub name: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub function_kind: Option<FunctionKind>,
    pub parameters: Vec<ParameterInfo>,
    bindings: BTreeMap<NodeId, Binding>,
    names: HashMap<String, NodeId>,
    indicators: ScopeIndicators,
    merged: bool,
    frozen: bool,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, node: NodeId, src: SourceLocation, name: String) -> Self {
        let indicators = match kind {
            ScopeKind::Contract => ScopeIndicators::Contract(ContractFlags::default()),
            ScopeKind::Function => ScopeIndicators::Function(FunctionIndicator::default()),
        };
        Self {
            id,
            kind,
            node,
            src,
            name,
            parent: None,
            children: Vec::new(),
            function_kind: None,
            parameters: Vec::new(),
            bindings: BTreeMap::new(),
            names: HashMap::new(),
            indicators,
            merged: false,
            frozen: false,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.function_kind == Some(FunctionKind::Constructor)
    }

    /// Bindings in declaration order
    pub fn bindings(&self) -> Vec<&Binding> {
        let mut bindings: Vec<&Binding> = self.bindings.values().collect();
        bindings.sort_by_key(|b| (b.src.start, b.id));
        bindings
    }

    pub fn binding(&self, id: NodeId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn binding_mut(&mut self, id: NodeId) -> Option<&mut Binding> {
        self.bindings.get_mut(&id)
    }

    pub fn lookup_local(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn some_binding(&self, predicate: impl Fn(&Binding) -> bool) -> bool {
        self.bindings.values().any(predicate)
    }

    pub fn filter_bindings(&self, predicate: impl Fn(&Binding) -> bool) -> Vec<&Binding> {
        self.bindings().into_iter().filter(|b| predicate(b)).collect()
    }

    pub fn indicators(&self) -> &ScopeIndicators {
        &self.indicators
    }

    pub fn contract_flags(&self) -> Option<&ContractFlags> {
        self.indicators.as_contract()
    }

    pub fn function_indicator(&self) -> Option<&FunctionIndicator> {
        self.indicators.as_function()
    }

    /// Merges function facts; a change after freezing is a scheduler bug
    pub fn merge_function(&mut self, update: &FunctionIndicator) -> Result<bool> {
        let frozen = self.frozen;
        let name = self.name.clone();
        let ScopeIndicators::Function(current) = &mut self.indicators else {
            return Err(CompilerError::internal(format!(
                "function indicators merged into contract scope '{}'",
                name
            )));
        };
        let mut next = current.clone();
        let changed = next.merge(update)?;
        if changed && frozen {
            return Err(CompilerError::internal(format!(
                "indicators of '{}' changed after freezing",
                name
            )));
        }
        *current = next;
        Ok(changed)
    }

    pub fn merge_contract(&mut self, update: &ContractFlags) -> Result<bool> {
        let frozen = self.frozen;
        let name = self.name.clone();
        let ScopeIndicators::Contract(current) = &mut self.indicators else {
            return Err(CompilerError::internal(format!(
                "contract indicators merged into function scope '{}'",
                name
            )));
        };
        let mut next = *current;
        let changed = next.merge(update);
        if changed && frozen {
            return Err(CompilerError::internal(format!(
                "indicators of '{}' changed after freezing",
                name
            )));
        }
        *current = next;
        Ok(changed)
    }

    pub fn is_merged(&self) -> bool {
        self.merged
    }

    pub fn mark_merged(&mut self) -> Result<()> {
        if self.merged {
            return Err(CompilerError::internal(format!(
                "scope '{}' merged into its bindings twice",
                self.name
            )));
        }
        self.merged = true;
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    contracts: Vec<ScopeId>,
    by_node: HashMap<NodeId, ScopeId>,
    declared_in: HashMap<NodeId, ScopeId>,
    resolutions: HashMap<NodeId, NodeId>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contract(&mut self, node: NodeId, src: SourceLocation, name: &str) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(id, ScopeKind::Contract, node, src, name.to_string()));
        self.contracts.push(id);
        self.by_node.insert(node, id);
        id
    }

    pub fn add_function(
        &mut self,
        parent: ScopeId,
        node: NodeId,
        src: SourceLocation,
        name: &str,
        kind: FunctionKind,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let mut scope = Scope::new(id, ScopeKind::Function, node, src, name.to_string());
        scope.parent = Some(parent);
        scope.function_kind = Some(kind);
        self.scopes.push(scope);
        self.scopes[parent.0].children.push(id);
        self.by_node.insert(node, id);
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn contracts(&self) -> &[ScopeId] {
        &self.contracts
    }

    pub fn scope_of_node(&self, node: NodeId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    /// Adds a binding to `scope`; the first declaration of a name wins name lookups
    pub fn declare(&mut self, scope: ScopeId, binding: Binding) {
        let id = binding.id;
        self.declared_in.insert(id, scope);
        let target = &mut self.scopes[scope.0];
        target.names.entry(binding.name.clone()).or_insert(id);
        target.bindings.insert(id, binding);
    }

    pub fn declaring_scope(&self, binding: NodeId) -> Option<ScopeId> {
        self.declared_in.get(&binding).copied()
    }

    pub fn binding(&self, id: NodeId) -> Option<&Binding> {
        let scope = self.declaring_scope(id)?;
        self.scopes[scope.0].bindings.get(&id)
    }

    pub fn binding_mut(&mut self, id: NodeId) -> Option<&mut Binding> {
        let scope = self.declaring_scope(id)?;
        self.scopes[scope.0].bindings.get_mut(&id)
    }

    /// Name lookup from `scope` outwards
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<NodeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(found) = scope.lookup_local(name) {
                return Some(found);
            }
            current = scope.parent;
        }
        None
    }

    pub fn record_resolution(&mut self, identifier: NodeId, binding: NodeId) {
        self.resolutions.insert(identifier, binding);
    }

    /// Declaration an identifier node was resolved to
    pub fn resolution(&self, identifier: NodeId) -> Option<NodeId> {
        self.resolutions.get(&identifier).copied()
    }

    pub fn resolve(&self, identifier: NodeId) -> Option<&Binding> {
        self.resolution(identifier).and_then(|id| self.binding(id))
    }

    /// Secret state variables of a contract, in declaration order
    pub fn secret_states(&self, contract: ScopeId) -> Vec<&Binding> {
        self.get(contract).filter_bindings(|b| b.is_secret_state())
    }

    /// Whether a function touches secret data: secret states, parameters or locals
    pub fn contains_secret(&self, function: ScopeId) -> bool {
        let scope = self.get(function);
        let touches_state = scope.function_indicator().is_some_and(|i| i.interacts_with_secret());
        touches_state
            || scope.some_binding(|b| {
                b.is_secret
                    && matches!(b.kind, DeclarationKind::Parameter | DeclarationKind::LocalVariable)
            })
    }
}
