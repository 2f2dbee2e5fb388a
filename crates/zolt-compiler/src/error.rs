//! Compiler error types

use thiserror::Error;

use crate::ast::SourceLocation;
use crate::indicator::StrategyReason;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Malformed AST JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unresolved reference '{name}' at {src}")]
    UnresolvedReference { name: String, src: SourceLocation },

    #[error("Unsupported construct: {kind}{}", .src.map(|s| format!(" at {}", s)).unwrap_or_default())]
    UnsupportedConstruct { kind: String, src: Option<SourceLocation> },

    #[error("Secret state '{name}' declared at {src} is overwritten but never nullified")]
    NonNullifiableSecretState { name: String, src: SourceLocation },

    #[error("Conflicting commitment strategy for '{name}' declared at {src}: {first}, then {second}")]
    CommitmentStrategyConflict {
        name: String,
        src: SourceLocation,
        first: StrategyReason,
        second: StrategyReason,
    },

    #[error("Malformed boilerplate payload for {category}.{section}: missing {missing}")]
    MalformedBoilerplatePayload { category: String, section: String, missing: String },

    #[error("{message} at {src}")]
    SyntaxUsage { message: String, src: SourceLocation },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    RuntimeError(#[from] zolt_runtime::ZoltError),
}

impl CompilerError {
    pub fn unresolved(name: impl Into<String>, src: SourceLocation) -> Self {
        Self::UnresolvedReference { name: name.into(), src }
    }

    pub fn unsupported(kind: impl Into<String>, src: Option<SourceLocation>) -> Self {
        Self::UnsupportedConstruct { kind: kind.into(), src }
    }

    pub fn syntax_usage(message: impl Into<String>, src: SourceLocation) -> Self {
        Self::SyntaxUsage { message: message.into(), src }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn malformed(
        category: impl Into<String>,
        section: impl Into<String>,
        missing: impl Into<String>,
    ) -> Self {
        Self::MalformedBoilerplatePayload {
            category: category.into(),
            section: section.into(),
            missing: missing.into(),
        }
    }

    /// Primary source site of the error, when it has one
    pub fn src(&self) -> Option<SourceLocation> {
        match self {
            Self::UnresolvedReference { src, .. }
            | Self::NonNullifiableSecretState { src, .. }
            | Self::SyntaxUsage { src, .. } => Some(*src),
            Self::CommitmentStrategyConflict { second, .. } => Some(second.src),
            Self::UnsupportedConstruct { src, .. } => *src,
            _ => None,
        }
    }

    /// Every source site the error refers to, primary first
    pub fn sites(&self) -> Vec<SourceLocation> {
        match self {
            Self::CommitmentStrategyConflict { src, first, second, .. } => {
                vec![second.src, first.src, *src]
            }
            other => other.src().into_iter().collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompilerError>;
