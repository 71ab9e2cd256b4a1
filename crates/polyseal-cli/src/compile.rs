//! # Compile Subcommand
//!
//! `polyseal compile <PATH>...` validates the documents, compiles them
//! together in argument order (later documents override earlier ones for
//! the same rule kind), and prints the compiled rules with their digest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use polyseal_core::ContentDigest;
use polyseal_policy::{CompiledPolicy, DocumentValidator, PolicyCompiler, PolicyDocument, RuleParams};

use crate::{document_validator, load_document, print_issues, EXIT_INVALID, EXIT_OK};

/// Arguments for the compile subcommand.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Policy documents in authoring order (JSON or YAML).
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Write the output here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct CompileOutput {
    pub rules: Vec<RuleParams>,
    pub digest: ContentDigest,
}

pub fn run_compile(args: &CompileArgs) -> Result<u8> {
    let validator = document_validator()?;
    let policy = match compile_documents(&validator, &args.paths)? {
        Some(policy) => policy,
        None => return Ok(EXIT_INVALID),
    };

    let output = CompileOutput {
        digest: policy.digest().context("failed to canonicalize compiled policy")?,
        rules: policy.rules().to_vec(),
    };
    let rendered = serde_json::to_string_pretty(&output).context("failed to render output")?;

    match &args.out {
        Some(out) => {
            std::fs::write(out, format!("{rendered}\n"))
                .with_context(|| format!("failed to write output: {}", out.display()))?;
            tracing::info!(path = %out.display(), digest = %output.digest, "compiled policy written");
        }
        None => println!("{rendered}"),
    }
    Ok(EXIT_OK)
}

/// Validate every document, reporting all failures before giving up.
/// `None` when any document is invalid.
pub fn compile_documents(
    validator: &DocumentValidator,
    paths: &[PathBuf],
) -> Result<Option<CompiledPolicy>> {
    let mut validated = Vec::with_capacity(paths.len());
    let mut invalid = false;
    for path in paths {
        match check(validator, path)? {
            Some(doc) => validated.push(doc),
            None => invalid = true,
        }
    }
    if invalid {
        return Ok(None);
    }
    Ok(Some(PolicyCompiler::compile_all(&validated)))
}

fn check(
    validator: &DocumentValidator,
    path: &Path,
) -> Result<Option<polyseal_policy::ValidatedDocument>> {
    let value = load_document(path)?;
    let checked = validator
        .validate_value(&value)
        .and_then(|_| PolicyDocument::from_value(value))
        .and_then(|document| validator.check(&document));
    match checked {
        Ok(doc) => Ok(Some(doc)),
        Err(err) => {
            print_issues(path, &err);
            Ok(None)
        }
    }
}
