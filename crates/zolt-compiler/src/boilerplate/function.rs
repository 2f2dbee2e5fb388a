//! Function-level decision table

use serde::Serialize;

use super::directive::{Category, Payload, Section};
use super::{to_payload, BoilerplateGenerator};
use crate::error::{CompilerError, Result};
use crate::indicator::FunctionFlags;
use crate::scope::{Scope, ScopeTree};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostStatements<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    custom_inputs: Vec<String>,
    function_name: &'a str,
    #[serde(flatten)]
    indicators: FunctionFlags,
}

pub struct FunctionBoilerplate<'t> {
    tree: &'t ScopeTree,
    scope: &'t Scope,
}

impl<'t> FunctionBoilerplate<'t> {
    pub fn new(tree: &'t ScopeTree, scope: &'t Scope) -> Self {
        Self { tree, scope }
    }

    fn flags(&self, category: Category, section: Section) -> Result<FunctionFlags> {
        self.scope
            .function_indicator()
            .map(|i| i.flags)
            .ok_or_else(|| CompilerError::malformed(category.as_str(), section.as_str(), "function indicators"))
    }

    /// Public parameter names in declaration order, with `msgSender` first when needed
    fn custom_inputs(&self, flags: &FunctionFlags) -> Vec<String> {
        let mut inputs: Vec<String> = self
            .scope
            .parameters
            .iter()
            .filter(|p| !p.is_secret)
            .map(|p| p.name.clone())
            .collect();
        if flags.msg_sender_param {
            inputs.insert(0, "msgSender".to_string());
        }
        inputs
    }
}

impl BoilerplateGenerator for FunctionBoilerplate<'_> {
    fn categories(&self) -> Vec<Category> {
        if !self.tree.contains_secret(self.scope.id) {
            return Vec::new();
        }
        if self.scope.is_constructor() {
            vec![Category::Cnstrctr]
        } else {
            vec![Category::CustomFunction]
        }
    }

    fn sections(&self, _category: Category) -> Vec<Section> {
        vec![Section::Parameters, Section::PostStatements]
    }

    fn payload(&self, category: Category, section: Section) -> Result<Payload> {
        match (category, section) {
            (Category::Cnstrctr, Section::Parameters | Section::PostStatements) => Ok(Payload::new()),
            (Category::CustomFunction, Section::Parameters) => {
                to_payload(category, section, &self.flags(category, section)?)
            }
            (Category::CustomFunction, Section::PostStatements) => {
                let indicators = self.flags(category, section)?;
                to_payload(
                    category,
                    section,
                    &PostStatements {
                        custom_inputs: self.custom_inputs(&indicators),
                        function_name: &self.scope.name,
                        indicators,
                    },
                )
            }
            _ => Err(CompilerError::malformed(
                category.as_str(),
                section.as_str(),
                "a function-level section",
            )),
        }
    }
}
