//! # Compiled Circuit
//!
//! The opaque artifact produced by the external circuit toolchain. Polyseal
//! never interprets the bytecode; it only pins which circuit a proof was made
//! for (through [`CompiledCircuit::digest`]) and which witness ABI it expects.
//!
//! Artifacts are stored as JSON:
//!
//! ```json
//! { "circuitId": "polyseal-policy", "abiVersion": 1, "bytecode": "<hex>" }
//! ```
//!
//! One instance is loaded at startup and shared read-only through `Arc`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use polyseal_core::{ContentDigest, DigestAlgorithm, Sha256Accumulator};

use crate::error::CircuitError;
use crate::witness::ABI_VERSION;

const DEV_CIRCUIT_ID: &str = "polyseal-policy-dev";
const DEV_BYTECODE: &[u8] = b"polyseal development circuit: no constraint system";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledCircuit {
    pub circuit_id: String,
    pub abi_version: u32,
    #[serde(with = "hex_vec")]
    pub bytecode: Vec<u8>,
}

impl CompiledCircuit {
    pub fn new(
        circuit_id: impl Into<String>,
        abi_version: u32,
        bytecode: Vec<u8>,
    ) -> Result<Self, CircuitError> {
        if abi_version != ABI_VERSION {
            return Err(CircuitError::UnsupportedAbi {
                found: abi_version,
                expected: ABI_VERSION,
            });
        }
        if bytecode.is_empty() {
            return Err(CircuitError::EmptyBytecode);
        }
        Ok(Self {
            circuit_id: circuit_id.into(),
            abi_version,
            bytecode,
        })
    }

    /// Decode a JSON artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CircuitError> {
        let raw: CompiledCircuit =
            serde_json::from_slice(bytes).map_err(|e| CircuitError::Malformed(e.to_string()))?;
        Self::new(raw.circuit_id, raw.abi_version, raw.bytecode)
    }

    pub fn load(path: &Path) -> Result<Self, CircuitError> {
        let bytes = std::fs::read(path).map_err(|source| CircuitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Built-in descriptor used when no artifact is configured. Only the mock
    /// backend can prove against it.
    pub fn development() -> Self {
        Self {
            circuit_id: DEV_CIRCUIT_ID.to_string(),
            abi_version: ABI_VERSION,
            bytecode: DEV_BYTECODE.to_vec(),
        }
    }

    /// SHA-256 over the length-prefixed id, the ABI version and the bytecode.
    pub fn digest(&self) -> ContentDigest {
        let mut acc = Sha256Accumulator::new();
        acc.update(&(self.circuit_id.len() as u64).to_be_bytes())
            .update(self.circuit_id.as_bytes())
            .update(&self.abi_version.to_be_bytes())
            .update(&(self.bytecode.len() as u64).to_be_bytes())
            .update(&self.bytecode);
        ContentDigest::new(DigestAlgorithm::Sha256, acc.finalize_bytes())
    }
}

impl std::fmt::Debug for CompiledCircuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCircuit")
            .field("circuit_id", &self.circuit_id)
            .field("abi_version", &self.abi_version)
            .field("bytecode_len", &self.bytecode.len())
            .finish()
    }
}

/// Serde adapter for variable-length byte strings as lowercase hex.
pub mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
