//! zolt Compiler
//!
//! Semantic analysis and boilerplate selection for contracts whose state variables are
//! annotated as secret. The compiler loads the front-end's JSON AST, builds scopes and
//! bindings, derives commitment and nullifier indicators, checks the contract for misuse
//! of secret data, and attaches the boilerplate directives that emitters expand into
//! contract, circuit and orchestration code.

pub mod annotations;
pub mod ast;
pub mod binding;
pub mod boilerplate;
pub mod config;
pub mod decorated;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod indicator;
pub mod mapping_key;
pub mod parser;
pub mod passes;
pub mod scope;
pub mod traverse;

pub use annotations::Annotations;
pub use ast::{Node, NodeId, NodeKind, SourceLocation};
pub use binding::{Binding, Occurrence, OccurrenceRole, WriteShape};
pub use boilerplate::{Category, Directive, Payload, Section};
pub use config::CompilerConfig;
pub use decorated::DecoratedTree;
pub use diagnostics::Warning;
pub use emit::{commitment_plan, plan_block, BlockPlan, CommitmentPlan, PlannedStatement, Target};
pub use error::{CompilerError, Result};
pub use indicator::{
    ContractFlags, FunctionFlags, FunctionIndicator, ScopeIndicators, StateFlags, StateIndicator,
    Strategy,
};
pub use mapping_key::MappingKey;
pub use parser::{parse_ast, parse_value};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};

// Re-export runtime types for convenience
pub use zolt_runtime::{FieldConfig, FieldElement, MembershipWitness, WitnessService};

use tracing::{debug, info};

/// Entry point tying the loader, the pass pipeline and directive attachment together
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile_str(&self, input: &str) -> Result<DecoratedTree> {
        let ast = parse_ast(input)?;
        self.compile(ast)
    }

    pub fn compile(&self, ast: Node) -> Result<DecoratedTree> {
        self.config.validate()?;
        let mut analysis = passes::analyse(&ast)?;

        if self.config.pedantic {
            for contract in analysis.scopes.contracts().to_vec() {
                for state in analysis.scopes.secret_states(contract) {
                    if !state.occurrences.is_referenced() {
                        analysis.warnings.push(Warning::new(
                            format!("secret state '{}' is never used", state.name),
                            Some(state.src),
                        ));
                    }
                }
            }
        }
        for warning in &analysis.warnings {
            debug!(%warning, "analysis warning");
        }

        let scopes = analysis.scopes.len();
        let tree = DecoratedTree::new(ast, analysis)?;
        info!(scopes, warnings = tree.warnings.len(), "compilation finished");
        Ok(tree)
    }
}
