//! Analysis passes
//!
//! Run strictly in order: [`scopes`] builds the scope tree and occurrence lists,
//! [`accumulate`] derives indicators, [`annotate`] adds statement facts and usage checks,
//! and [`error_checks`] validates completeness and freezes every scope.

pub mod accumulate;
pub mod annotate;
pub mod error_checks;
pub mod scopes;
pub mod shape;

use crate::annotations::Annotations;
use crate::ast::Node;
use crate::diagnostics::Warning;
use crate::error::Result;
use crate::scope::ScopeTree;

/// Output of the full pass pipeline
#[derive(Debug, Clone)]
pub struct Analysis {
    pub scopes: ScopeTree,
    pub annotations: Annotations,
    pub warnings: Vec<Warning>,
}

pub fn analyse(ast: &Node) -> Result<Analysis> {
    let mut annotations = Annotations::default();
    let mut warnings = Vec::new();

    let mut scopes = scopes::run(ast, &mut annotations)?;
    accumulate::run(&mut scopes)?;
    annotate::run(ast, &mut scopes, &mut annotations, &mut warnings)?;
    error_checks::run(ast, &mut scopes)?;

    Ok(Analysis { scopes, annotations, warnings })
}
