//! # polyseal-cli: Polyseal Command-Line Interface
//!
//! ## Subcommands
//!
//! - `validate`: check a policy document and list every issue
//! - `compile`: print the compiled rules and their digest
//! - `whitelist`: compute Merkle roots and inclusion proofs for address sets
//!
//! ## Exit Codes
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | success                                   |
//! | 1    | invalid document, address or membership   |
//! | 2    | operational error (I/O, unreadable input) |
//!
//! Handlers return `anyhow::Result<u8>`: `Ok(code)` for outcomes the user
//! caused, `Err` for everything else.

pub mod compile;
pub mod validate;
pub mod whitelist;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use polyseal_policy::{DocumentValidator, RuleRegistry, SchemaError};

pub const EXIT_OK: u8 = 0;
pub const EXIT_INVALID: u8 = 1;
pub const EXIT_ERROR: u8 = 2;

/// Read a policy document. `.yaml`/`.yml` files are parsed as YAML,
/// everything else as JSON.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML: {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON: {}", path.display()))
    }
}

/// Validator over the built-in rule registry.
pub fn document_validator() -> Result<DocumentValidator> {
    let registry = RuleRegistry::with_default_hasher().context("failed to build rule registry")?;
    DocumentValidator::new(Arc::new(registry)).context("failed to build document validator")
}

pub(crate) fn print_issues(path: &Path, err: &SchemaError) {
    println!("FAIL: {}", path.display());
    for issue in &err.issues {
        println!("  - {issue}");
    }
}
