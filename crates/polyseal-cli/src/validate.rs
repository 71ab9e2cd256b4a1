//! # Validate Subcommand
//!
//! `polyseal validate <PATH>...` checks each document against the envelope
//! and per-rule schemas and prints every issue found.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::{document_validator, load_document, print_issues, EXIT_INVALID, EXIT_OK};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Policy documents (JSON or YAML).
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let validator = document_validator()?;
    let mut failed = 0usize;

    for path in &args.paths {
        let document = load_document(path)?;
        match validator.validate_value(&document) {
            Ok(compiled) => {
                let kinds: Vec<String> = compiled.kinds().iter().map(|k| k.to_string()).collect();
                println!("OK: {} [{}]", path.display(), kinds.join(", "));
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), issues = err.issues.len(), "document rejected");
                print_issues(path, &err);
                failed += 1;
            }
        }
    }

    println!("Documents: {}/{} passed", args.paths.len() - failed, args.paths.len());
    Ok(if failed == 0 { EXIT_OK } else { EXIT_INVALID })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn doc(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_document_exits_zero() {
        let file = doc(r#"{"rules":[{"type":"velocity","params":{"minIntervalSeconds":60}}]}"#);
        let code = run_validate(&ValidateArgs {
            paths: vec![file.path().to_path_buf()],
        })
        .unwrap();
        assert_eq!(code, EXIT_OK);
    }

    #[test]
    fn any_invalid_document_exits_one() {
        let good = doc(r#"{"rules":[]}"#);
        let bad = doc(r#"{"rules":[{"type":"geo-fence","params":{}}]}"#);
        let code = run_validate(&ValidateArgs {
            paths: vec![good.path().to_path_buf(), bad.path().to_path_buf()],
        })
        .unwrap();
        assert_eq!(code, EXIT_INVALID);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let result = run_validate(&ValidateArgs {
            paths: vec![PathBuf::from("/nonexistent/policy.json")],
        });
        assert!(result.is_err());
    }
}
