//! Boilerplate directives: `{nodeKind: "Boilerplate", category, section, ...payload}`

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::CompilerError;

pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Contract,
    Cnstrctr,
    CustomFunction,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Contract => "contract",
            Category::Cnstrctr => "cnstrctr",
            Category::CustomFunction => "customFunction",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    ImportStatements,
    Constructor,
    StateVariableDeclarations,
    #[serde(rename = "registerZKPPublicKey")]
    RegisterZkpPublicKey,
    Verify,
    Parameters,
    PostStatements,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::ImportStatements,
        Section::Constructor,
        Section::StateVariableDeclarations,
        Section::RegisterZkpPublicKey,
        Section::Verify,
        Section::Parameters,
        Section::PostStatements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::ImportStatements => "importStatements",
            Section::Constructor => "constructor",
            Section::StateVariableDeclarations => "stateVariableDeclarations",
            Section::RegisterZkpPublicKey => "registerZKPPublicKey",
            Section::Verify => "verify",
            Section::Parameters => "parameters",
            Section::PostStatements => "postStatements",
        }
    }

    /// Payload fields a generator must always produce for this section
    pub fn required_fields(&self, category: Category) -> &'static [&'static str] {
        const INDICATORS: &[&str] = &[
            "nullifiersRequired",
            "oldCommitmentAccessRequired",
            "newCommitmentsRequired",
            "containsAccessedOnlyState",
        ];
        match (category, self) {
            (Category::Contract, Section::ImportStatements) => &["newCommitmentsRequired"],
            (Category::Contract, Section::StateVariableDeclarations) => &[
                "functionNames",
                "nullifiersRequired",
                "oldCommitmentAccessRequired",
                "newCommitmentsRequired",
                "containsAccessedOnlyState",
            ],
            (Category::Contract, Section::Verify) => INDICATORS,
            (Category::CustomFunction, Section::Parameters) => &[
                "nullifiersRequired",
                "oldCommitmentAccessRequired",
                "newCommitmentsRequired",
                "msgSenderParam",
                "containsAccessedOnlyState",
            ],
            (Category::CustomFunction, Section::PostStatements) => &[
                "functionName",
                "nullifiersRequired",
                "oldCommitmentAccessRequired",
                "newCommitmentsRequired",
                "msgSenderParam",
                "containsAccessedOnlyState",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| CompilerError::malformed("unknown", s, "a known section name"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub category: Category,
    pub section: Section,
    pub payload: Payload,
}

impl Directive {
    pub fn new(category: Category, section: Section, payload: Payload) -> Self {
        Self { category, section, payload }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.payload.get(field).and_then(Value::as_bool)
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("nodeKind".to_string(), Value::from("Boilerplate"));
        object.insert("category".to_string(), Value::from(self.category.as_str()));
        object.insert("section".to_string(), Value::from(self.section.as_str()));
        object.extend(self.payload.clone());
        Value::Object(object)
    }
}

impl Serialize for Directive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.payload.len() + 3))?;
        map.serialize_entry("nodeKind", "Boilerplate")?;
        map.serialize_entry("category", &self.category)?;
        map.serialize_entry("section", &self.section)?;
        for (key, value) in &self.payload {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
