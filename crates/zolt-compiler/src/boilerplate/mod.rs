//! Boilerplate selection
//!
//! Each scope kind has a decision table: its categories, the sections each category
//! selects, and a pure payload generator per `(category, section)`. Tables read frozen
//! indicators only; selection on an unfrozen scope is refused.

pub mod contract;
pub mod directive;
pub mod function;
pub mod selector;

pub use directive::{Category, Directive, Payload, Section};
pub use selector::BoilerplateCache;

use serde::Serialize;
use serde_json::Value;

use crate::error::{CompilerError, Result};
use crate::scope::{Scope, ScopeKind, ScopeTree};

pub trait BoilerplateGenerator {
    fn categories(&self) -> Vec<Category>;

    fn sections(&self, category: Category) -> Vec<Section>;

    fn payload(&self, category: Category, section: Section) -> Result<Payload>;
}

pub fn generator_for<'t>(tree: &'t ScopeTree, scope: &'t Scope) -> Box<dyn BoilerplateGenerator + 't> {
    match scope.kind {
        ScopeKind::Contract => Box::new(contract::ContractBoilerplate::new(tree, scope)),
        ScopeKind::Function => Box::new(function::FunctionBoilerplate::new(tree, scope)),
    }
}

/// Sections a scope kind can ever produce
pub fn valid_sections(kind: ScopeKind) -> &'static [Section] {
    match kind {
        ScopeKind::Contract => &[
            Section::ImportStatements,
            Section::Constructor,
            Section::StateVariableDeclarations,
            Section::RegisterZkpPublicKey,
            Section::Verify,
        ],
        ScopeKind::Function => &[Section::Parameters, Section::PostStatements],
    }
}

fn to_payload<T: Serialize>(category: Category, section: Section, value: &T) -> Result<Payload> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(CompilerError::malformed(category.as_str(), section.as_str(), "an object payload")),
    }
}

fn validate(category: Category, section: Section, payload: &Payload) -> Result<()> {
    match section.required_fields(category).iter().find(|field| !payload.contains_key(**field)) {
        Some(missing) => Err(CompilerError::malformed(category.as_str(), section.as_str(), *missing)),
        None => Ok(()),
    }
}
