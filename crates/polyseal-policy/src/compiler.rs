//! # Policy Compiler
//!
//! Normalizes validated rules into the registry's fixed priority order. When
//! a kind appears more than once the last occurrence wins, so a later
//! document (or a later entry in one document) overrides an earlier one.
//! Pure and total: compilation of a validated document cannot fail.

use std::collections::BTreeMap;

use serde::Serialize;

use polyseal_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, RuleKind};

use crate::rules::RuleParams;

/// Typed rules in document order, as accepted by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDocument {
    rules: Vec<RuleParams>,
}

impl ValidatedDocument {
    pub(crate) fn new(rules: Vec<RuleParams>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RuleParams] {
        &self.rules
    }
}

/// Validated rules, at most one per kind, in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledPolicy {
    rules: Vec<RuleParams>,
}

impl CompiledPolicy {
    pub fn rules(&self) -> &[RuleParams] {
        &self.rules
    }

    pub fn kinds(&self) -> Vec<RuleKind> {
        self.rules.iter().map(RuleParams::kind).collect()
    }

    pub fn get(&self, kind: RuleKind) -> Option<&RuleParams> {
        self.rules.iter().find(|r| r.kind() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `(rule kind, signal name)` for every signal-dependent rule.
    pub fn signal_requirements(&self) -> Vec<(RuleKind, String)> {
        self.rules
            .iter()
            .filter_map(|r| r.signal().map(|s| (r.kind(), s.to_string())))
            .collect()
    }

    /// SHA-256 over the canonical JSON of the compiled rule list.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(&self.rules)?))
    }
}

/// Stateless compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyCompiler;

impl PolicyCompiler {
    pub fn compile(document: &ValidatedDocument) -> CompiledPolicy {
        Self::compile_all(std::iter::once(document))
    }

    /// Compile several documents as if their rule lists were concatenated.
    pub fn compile_all<'a, I>(documents: I) -> CompiledPolicy
    where
        I: IntoIterator<Item = &'a ValidatedDocument>,
    {
        let mut by_kind: BTreeMap<RuleKind, RuleParams> = BTreeMap::new();
        for rule in documents.into_iter().flat_map(|d| d.rules.iter()) {
            by_kind.insert(rule.kind(), rule.clone());
        }
        CompiledPolicy {
            rules: by_kind.into_values().collect(),
        }
    }
}
