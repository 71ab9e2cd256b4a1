//! # Proof Policy
//!
//! Mock proofs are SHA-256 digests with no soundness. A production
//! deployment must neither issue nor accept them.
//!
//! The mode comes from, in order:
//! 1. `POLYSEAL_PROOF_POLICY` (`production`/`prod` or `development`/`dev`);
//! 2. the build profile: release builds default to `Production`, debug
//!    builds to `Development`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendKind;

pub const PROOF_POLICY_ENV: &str = "POLYSEAL_PROOF_POLICY";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{backend} proofs are rejected: production mode requires a real proving backend")]
    MockProofRejected { backend: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    Production,
    Development,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofPolicy {
    mode: PolicyMode,
}

impl ProofPolicy {
    pub fn new(mode: PolicyMode) -> Self {
        Self { mode }
    }

    pub fn production() -> Self {
        Self::new(PolicyMode::Production)
    }

    pub fn development() -> Self {
        Self::new(PolicyMode::Development)
    }

    pub fn from_environment() -> Self {
        Self::from_setting(std::env::var(PROOF_POLICY_ENV).ok().as_deref())
    }

    /// Resolve a raw setting; unrecognized values fall back to the build
    /// profile default.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("production" | "prod") => Self::production(),
            Some("development" | "dev") => Self::development(),
            Some(other) => {
                tracing::warn!(value = other, "unrecognized proof policy, using build default");
                Self::build_default()
            }
            None => Self::build_default(),
        }
    }

    fn build_default() -> Self {
        if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::production()
        }
    }

    pub fn validate(&self, backend: BackendKind) -> Result<(), PolicyError> {
        match (self.mode, backend) {
            (PolicyMode::Production, BackendKind::Mock) => Err(PolicyError::MockProofRejected {
                backend: backend.as_str(),
            }),
            _ => Ok(()),
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_rejects_mock() {
        assert!(ProofPolicy::production().validate(BackendKind::Mock).is_err());
        assert!(ProofPolicy::production().validate(BackendKind::External).is_ok());
    }

    #[test]
    fn development_accepts_everything() {
        assert!(ProofPolicy::development().validate(BackendKind::Mock).is_ok());
        assert!(ProofPolicy::development().validate(BackendKind::External).is_ok());
    }

    #[test]
    fn settings_parse_case_insensitively() {
        assert_eq!(ProofPolicy::from_setting(Some("PROD")).mode(), PolicyMode::Production);
        assert_eq!(ProofPolicy::from_setting(Some(" dev ")).mode(), PolicyMode::Development);
    }

    #[test]
    fn unknown_setting_uses_build_default() {
        let expected = if cfg!(debug_assertions) {
            PolicyMode::Development
        } else {
            PolicyMode::Production
        };
        assert_eq!(ProofPolicy::from_setting(Some("lenient")).mode(), expected);
        assert_eq!(ProofPolicy::from_setting(None).mode(), expected);
    }
}
