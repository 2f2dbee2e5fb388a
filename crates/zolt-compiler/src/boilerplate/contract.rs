//! Contract-level decision table

use serde::Serialize;

use super::directive::{Category, Payload, Section};
use super::{to_payload, BoilerplateGenerator};
use crate::binding::DeclarationKind;
use crate::error::{CompilerError, Result};
use crate::indicator::ContractFlags;
use crate::scope::{Scope, ScopeTree};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportStatements {
    new_commitments_required: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Indicators {
    nullifiers_required: bool,
    old_commitment_access_required: bool,
    new_commitments_required: bool,
    contains_accessed_only_state: bool,
}

impl From<&ContractFlags> for Indicators {
    fn from(flags: &ContractFlags) -> Self {
        Self {
            nullifiers_required: flags.nullifiers_required,
            old_commitment_access_required: flags.old_commitment_access_required,
            new_commitments_required: flags.new_commitments_required,
            contains_accessed_only_state: flags.contains_accessed_only_state,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateVariableDeclarations {
    function_names: Vec<String>,
    #[serde(flatten)]
    indicators: Indicators,
}

pub struct ContractBoilerplate<'t> {
    tree: &'t ScopeTree,
    scope: &'t Scope,
}

impl<'t> ContractBoilerplate<'t> {
    pub fn new(tree: &'t ScopeTree, scope: &'t Scope) -> Self {
        Self { tree, scope }
    }

    fn flags(&self, section: Section) -> Result<&'t ContractFlags> {
        self.scope.contract_flags().ok_or_else(|| {
            CompilerError::malformed(Category::Contract.as_str(), section.as_str(), "contract indicators")
        })
    }

    fn has_zero_argument_constructor(&self) -> bool {
        self.scope.some_binding(|b| {
            b.kind == DeclarationKind::FunctionDefinition
                && b.function_scope
                    .map(|f| self.tree.get(f))
                    .is_some_and(|f| f.is_constructor() && f.parameters.is_empty())
        })
    }

    /// Unique names of the functions that touch secret data
    fn secret_function_names(&self) -> Vec<String> {
        self.scope
            .filter_bindings(|b| b.kind == DeclarationKind::FunctionDefinition)
            .into_iter()
            .filter(|b| b.function_scope.is_some_and(|f| self.tree.contains_secret(f)))
            .map(|b| b.name.clone())
            .collect()
    }
}

impl BoilerplateGenerator for ContractBoilerplate<'_> {
    fn categories(&self) -> Vec<Category> {
        vec![Category::Contract]
    }

    fn sections(&self, _category: Category) -> Vec<Section> {
        let has_secret_state = !self.tree.secret_states(self.scope.id).is_empty();
        let mut sections = vec![Section::ImportStatements];
        if !self.has_zero_argument_constructor() {
            sections.push(Section::Constructor);
        }
        sections.push(Section::StateVariableDeclarations);
        if has_secret_state {
            sections.push(Section::RegisterZkpPublicKey);
            sections.push(Section::Verify);
        }
        sections
    }

    fn payload(&self, category: Category, section: Section) -> Result<Payload> {
        match section {
            Section::ImportStatements => {
                let flags = self.flags(section)?;
                to_payload(
                    category,
                    section,
                    &ImportStatements { new_commitments_required: flags.new_commitments_required },
                )
            }
            Section::StateVariableDeclarations => to_payload(
                category,
                section,
                &StateVariableDeclarations {
                    function_names: self.secret_function_names(),
                    indicators: self.flags(section)?.into(),
                },
            ),
            Section::Verify => to_payload(category, section, &Indicators::from(self.flags(section)?)),
            Section::Constructor | Section::RegisterZkpPublicKey => Ok(Payload::new()),
            Section::Parameters | Section::PostStatements => Err(CompilerError::malformed(
                category.as_str(),
                section.as_str(),
                "a contract-level section",
            )),
        }
    }
}
