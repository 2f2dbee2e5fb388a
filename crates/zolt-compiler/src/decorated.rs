//! The decorated tree handed to emitters

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::annotations::Annotations;
use crate::ast::{Node, NodeId};
use crate::boilerplate::{selector, BoilerplateCache, Directive, Payload, Section};
use crate::diagnostics::Warning;
use crate::error::Result;
use crate::passes::{accumulate, Analysis};
use crate::scope::{ScopeId, ScopeKind, ScopeTree};

/// Original tree plus frozen scopes, node annotations and attached directives
#[derive(Debug)]
pub struct DecoratedTree {
    pub ast: Node,
    pub scopes: ScopeTree,
    pub annotations: Annotations,
    pub warnings: Vec<Warning>,
    directives: BTreeMap<NodeId, Vec<Rc<Directive>>>,
    cache: BoilerplateCache,
}

impl DecoratedTree {
    pub(crate) fn new(ast: Node, analysis: Analysis) -> Result<Self> {
        let mut tree = Self {
            ast,
            scopes: analysis.scopes,
            annotations: analysis.annotations,
            warnings: analysis.warnings,
            directives: BTreeMap::new(),
            cache: BoilerplateCache::new(),
        };
        tree.attach_directives()?;
        Ok(tree)
    }

    fn attach_directives(&mut self) -> Result<()> {
        let mut attached = BTreeMap::new();
        for scope in self.scopes.iter() {
            let mut directives = Vec::new();
            for section in selector::sections_for(&self.scopes, scope.id)? {
                directives.extend(selector::select(&self.scopes, &self.cache, scope.id, section)?);
            }
            attached.insert(scope.node, directives);
        }
        self.directives = attached;
        Ok(())
    }

    pub fn select(&self, scope: ScopeId, section: Section) -> Result<Vec<Rc<Directive>>> {
        selector::select(&self.scopes, &self.cache, scope, section)
    }

    /// Same as [`select`](Self::select) with extra payload fields; bypasses the cache
    pub fn select_with(&self, scope: ScopeId, section: Section, extra: &Payload) -> Result<Vec<Directive>> {
        selector::select_with(&self.scopes, scope, section, extra)
    }

    pub fn sections(&self, scope: ScopeId) -> Result<Vec<Section>> {
        selector::sections_for(&self.scopes, scope)
    }

    /// Directives attached to a contract or function node
    pub fn directives_for(&self, node: NodeId) -> &[Rc<Directive>] {
        self.directives.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contract_scope(&self, name: &str) -> Option<ScopeId> {
        self.scopes.contracts().iter().copied().find(|id| self.scopes.get(*id).name == name)
    }

    /// Function scope by unique name (`constructor`, `f`, `f_1`, ...)
    pub fn function_scope(&self, name: &str) -> Option<ScopeId> {
        self.scopes
            .iter()
            .find(|s| s.kind == ScopeKind::Function && s.name == name)
            .map(|s| s.id)
    }

    /// Runs indicator accumulation again; on a frozen tree this must change nothing
    pub fn reaccumulate(&mut self) -> Result<()> {
        accumulate::run(&mut self.scopes)
    }

    pub fn directives_json(&self) -> Value {
        let scopes: Vec<Value> = self
            .scopes
            .iter()
            .map(|scope| {
                json!({
                    "scope": scope.name,
                    "kind": scope.kind,
                    "node": scope.node,
                    "directives": self.directives_for(scope.node).iter().map(|d| d.to_json()).collect::<Vec<_>>(),
                })
            })
            .collect();
        Value::Array(scopes)
    }

    pub fn indicators_json(&self) -> Value {
        let scopes: Vec<Value> = self
            .scopes
            .iter()
            .map(|scope| {
                let states: Vec<Value> = scope
                    .bindings()
                    .into_iter()
                    .filter(|b| b.is_secret_state())
                    .map(|b| {
                        json!({
                            "name": b.name,
                            "strategy": b.strategy.get(),
                            "summary": b.summary,
                            "mappingKeys": b.mapping_keys.keys().collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                json!({
                    "scope": scope.name,
                    "kind": scope.kind,
                    "indicators": scope.indicators(),
                    "secretStates": states,
                })
            })
            .collect();
        Value::Array(scopes)
    }
}
