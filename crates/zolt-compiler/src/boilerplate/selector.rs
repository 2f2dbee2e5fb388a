//! Cached selection of directives per `(scope, section)`

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

use super::directive::{Category, Directive, Payload, Section};
use super::{generator_for, valid_sections, validate};
use crate::error::{CompilerError, Result};
use crate::scope::{ScopeId, ScopeKind, ScopeTree};

/// Memo of generated directives, owned by the compilation unit
#[derive(Debug, Default)]
pub struct BoilerplateCache {
    entries: RefCell<HashMap<(ScopeId, Section), Vec<Rc<Directive>>>>,
}

impl BoilerplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

fn kind_label(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Contract => Category::Contract.as_str(),
        ScopeKind::Function => "function",
    }
}

fn generate(
    tree: &ScopeTree,
    scope: ScopeId,
    section: Section,
    extra: Option<&Payload>,
) -> Result<Vec<Directive>> {
    let scope = tree.get(scope);
    if !scope.is_frozen() {
        return Err(CompilerError::malformed(kind_label(scope.kind), section.as_str(), "frozen indicators"));
    }
    if !valid_sections(scope.kind).contains(&section) {
        return Err(CompilerError::malformed(
            kind_label(scope.kind),
            section.as_str(),
            format!("a {} section", kind_label(scope.kind)),
        ));
    }

    let generator = generator_for(tree, scope);
    let mut directives = Vec::new();
    for category in generator.categories() {
        if !generator.sections(category).contains(&section) {
            continue;
        }
        let mut payload = generator.payload(category, section)?;
        if let Some(extra) = extra {
            payload.extend(extra.clone());
        }
        validate(category, section, &payload)?;
        directives.push(Directive::new(category, section, payload));
    }
    Ok(directives)
}

/// Directives for a section; repeated queries return the same instances
pub fn select(
    tree: &ScopeTree,
    cache: &BoilerplateCache,
    scope: ScopeId,
    section: Section,
) -> Result<Vec<Rc<Directive>>> {
    if let Some(hit) = cache.entries.borrow().get(&(scope, section)) {
        return Ok(hit.clone());
    }
    let directives: Vec<Rc<Directive>> =
        generate(tree, scope, section, None)?.into_iter().map(Rc::new).collect();
    trace!(scope = scope.0, %section, count = directives.len(), "generated boilerplate");
    cache.entries.borrow_mut().insert((scope, section), directives.clone());
    Ok(directives)
}

/// Directives with extra payload fields merged in; never cached
pub fn select_with(
    tree: &ScopeTree,
    scope: ScopeId,
    section: Section,
    extra: &Payload,
) -> Result<Vec<Directive>> {
    generate(tree, scope, section, Some(extra))
}

/// Every section selected for a scope, in table order
pub fn sections_for(tree: &ScopeTree, scope: ScopeId) -> Result<Vec<Section>> {
    let target = tree.get(scope);
    if !target.is_frozen() {
        return Err(CompilerError::malformed(kind_label(target.kind), "*", "frozen indicators"));
    }
    let generator = generator_for(tree, target);
    let mut sections: Vec<Section> = Vec::new();
    for category in generator.categories() {
        for section in generator.sections(category) {
            if !sections.contains(&section) {
                sections.push(section);
            }
        }
    }
    Ok(sections)
}
