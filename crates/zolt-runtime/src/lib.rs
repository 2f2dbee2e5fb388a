//! zolt Runtime
//!
//! Shared types for the zolt toolkit: the commitment and nullifier scheme that generated
//! code and circuits must agree on, field truncation, and the read interface of the
//! Merkle witness service.

pub mod error;
pub mod types;

// Re-export core types for convenience
pub use error::{Result, ZoltError};
pub use types::{
    CommitmentPreimage, FieldConfig, FieldElement, FieldHasher, MembershipWitness,
    NullifierPreimage, WitnessService,
};
