//! Compiler configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use zolt_runtime::{FieldConfig, ZoltError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Report secret states that are declared but never used
    pub pedantic: bool,
    pub log_level: String,
    /// Bit width public inputs are truncated to
    pub field: FieldConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { pedantic: false, log_level: "info".to_string(), field: FieldConfig::default() }
    }
}

impl CompilerConfig {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: CompilerConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(ZoltError::from)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        FieldConfig::new(self.field.bits())?;
        Ok(())
    }
}
