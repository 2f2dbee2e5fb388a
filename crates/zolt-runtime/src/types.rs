//! Core types for the zolt toolkit
//!
//! This module defines the data structures that generated code must agree on with the
//! circuits: field elements, the commitment and nullifier preimage layouts, and the shape
//! of the Merkle membership witnesses returned by the witness service.

use crate::error::{Result, ZoltError};
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 256-bit value used as a circuit public input or hash input
///
/// Values are stored untruncated; callers truncate with [`FieldConfig::truncate`]
/// before handing them to a circuit.
///
/// # Examples
///
/// ```
/// use zolt_runtime::FieldElement;
///
/// let element = FieldElement::from_u64(255);
/// assert_eq!(element.truncate(4), FieldElement::from_u64(15));
/// assert_eq!(FieldElement::from_hex(&element.to_hex()).unwrap(), element);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldElement(U256);

impl FieldElement {
    pub const ZERO: Self = Self(U256::ZERO);

    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_be_bytes(bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }

    /// Parses a big-endian hex string, with or without a `0x` prefix
    pub fn from_hex(input: &str) -> Result<Self> {
        let digits = input.strip_prefix("0x").unwrap_or(input);
        let padded = if digits.len() % 2 == 1 { format!("0{}", digits) } else { digits.to_string() };
        let decoded = hex::decode(&padded)
            .map_err(|e| ZoltError::serialization_error(format!("'{}': {}", input, e)))?;
        if decoded.len() > 32 {
            return Err(ZoltError::serialization_error(format!(
                "'{}' is {} bytes, field elements are at most 32 bytes",
                input,
                decoded.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes[32 - decoded.len()..].copy_from_slice(&decoded);
        Ok(Self::from_be_bytes(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    /// Keeps the lowest `bits` bits
    pub fn truncate(&self, bits: u32) -> Self {
        if bits >= 256 {
            return *self;
        }
        let mask = (U256::from(1u64) << (bits as usize)) - U256::from(1u64);
        Self(self.0 & mask)
    }

    pub fn bit_len(&self) -> usize {
        self.0.bit_len()
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for FieldElement {
    type Error = ZoltError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<FieldElement> for String {
    fn from(value: FieldElement) -> Self {
        value.to_hex()
    }
}

/// Bit width of the proving system's scalar field
///
/// Hash outputs are truncated to this width before they are used as public inputs.
///
/// # Examples
///
/// ```
/// use zolt_runtime::FieldConfig;
///
/// let field = FieldConfig::default();
/// assert_eq!(field.bits(), 254);
/// assert!(FieldConfig::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    bits: u32,
}

impl FieldConfig {
    pub const DEFAULT_BITS: u32 = 254;

    pub fn new(bits: u32) -> Result<Self> {
        if bits == 0 || bits > 256 {
            return Err(ZoltError::invalid_field_config(format!(
                "bit width must be within 1..=256, got {}",
                bits
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn truncate(&self, element: &FieldElement) -> FieldElement {
        element.truncate(self.bits)
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self { bits: Self::DEFAULT_BITS }
    }
}

/// Hash function shared by the generated code and the circuits
pub trait FieldHasher {
    fn hash(&self, inputs: &[FieldElement]) -> FieldElement;
}

/// Preimage of a state commitment: `Hash(stateId, value, ownerPublicKey, salt)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPreimage {
    pub state_id: FieldElement,
    pub value: FieldElement,
    pub owner_public_key: FieldElement,
    pub salt: FieldElement,
}

impl CommitmentPreimage {
    /// Canonical input order of the commitment hash
    pub const FIELDS: [&'static str; 4] = ["stateId", "value", "ownerPublicKey", "salt"];

    pub fn inputs(&self) -> [FieldElement; 4] {
        [self.state_id, self.value, self.owner_public_key, self.salt]
    }

    pub fn commitment<H: FieldHasher>(&self, hasher: &H, field: &FieldConfig) -> FieldElement {
        field.truncate(&hasher.hash(&self.inputs()))
    }
}

/// Preimage of a nullifier: `Hash(stateId, secretKey, salt)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NullifierPreimage {
    pub state_id: FieldElement,
    pub secret_key: FieldElement,
    pub salt: FieldElement,
}

impl NullifierPreimage {
    /// Canonical input order of the nullifier hash
    pub const FIELDS: [&'static str; 3] = ["stateId", "secretKey", "salt"];

    pub fn inputs(&self) -> [FieldElement; 3] {
        [self.state_id, self.secret_key, self.salt]
    }

    pub fn nullifier<H: FieldHasher>(&self, hasher: &H, field: &FieldConfig) -> FieldElement {
        field.truncate(&hasher.hash(&self.inputs()))
    }
}

/// Merkle membership witness for one commitment
///
/// `path` lists sibling hashes from the leaf up to (excluding) the root, and `index`
/// is the leaf position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWitness {
    pub index: u64,
    pub path: Vec<FieldElement>,
    pub root: FieldElement,
}

impl MembershipWitness {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Checks the witness against the tree depth the circuits were compiled for
    pub fn validate(&self, expected_depth: usize) -> Result<()> {
        if self.path.len() != expected_depth {
            return Err(ZoltError::invalid_witness(format!(
                "path has {} siblings, tree depth is {}",
                self.path.len(),
                expected_depth
            )));
        }
        if expected_depth < 64 && self.index >= (1u64 << expected_depth) {
            return Err(ZoltError::invalid_witness(format!(
                "leaf index {} does not fit a tree of depth {}",
                self.index, expected_depth
            )));
        }
        Ok(())
    }
}

/// Read interface of the Merkle-tree storage service
pub trait WitnessService {
    fn get_membership_witness(
        &self,
        container_id: &str,
        commitment: &FieldElement,
    ) -> Result<MembershipWitness>;

    fn get_root(&self, container_id: &str) -> Result<FieldElement>;
}
