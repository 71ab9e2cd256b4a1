//! # Policy Errors
//!
//! Three outcomes must stay distinguishable from document authoring to the
//! caller of the engine:
//!
//! - [`SchemaError`]: the document is malformed. Carries every issue found.
//! - [`EngineError::Denied`]: a rule's business condition failed.
//! - [`EngineError::Infrastructure`]: the engine could not decide (signal or
//!   store failure); retrying may succeed.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use polyseal_core::RuleKind;

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

/// One problem found while validating a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "camelCase")]
pub enum SchemaIssue {
    /// Document-level structure is wrong (missing `rules`, wrong types).
    #[serde(rename_all = "camelCase")]
    MalformedDocument { path: String, reason: String },

    /// A rule names a kind the registry does not know.
    #[serde(rename_all = "camelCase")]
    UnknownRuleKind { index: usize, kind: String },

    /// A rule's parameters violate its schema.
    #[serde(rename_all = "camelCase")]
    InvalidRuleParams {
        index: usize,
        kind: RuleKind,
        field: String,
        reason: String,
    },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDocument { path, reason } if path.is_empty() => {
                write!(f, "(document): {reason}")
            }
            Self::MalformedDocument { path, reason } => write!(f, "{path}: {reason}"),
            Self::UnknownRuleKind { index, kind } => {
                write!(f, "rules[{index}]: unknown rule kind {kind:?}")
            }
            Self::InvalidRuleParams {
                index,
                kind,
                field,
                reason,
            } => write!(f, "rules[{index}] ({kind}).{field}: {reason}"),
        }
    }
}

/// A policy document failed validation. Never partial: `issues` holds every
/// problem found in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaError {
    pub issues: Vec<SchemaIssue>,
}

impl SchemaError {
    pub fn single(issue: SchemaIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "policy document has {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

// ---------------------------------------------------------------------------
// Rule and engine errors
// ---------------------------------------------------------------------------

/// Outcome of a single rule that did not produce a fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The policy says no.
    #[error("denied: {reason}")]
    Denied { reason: String },

    /// The rule could not be evaluated.
    #[error("could not evaluate{}: {reason}", signal_suffix(.signal, " (signal ", ")"))]
    Infrastructure {
        signal: Option<String>,
        reason: String,
    },

    /// Validated parameters could not be used; a bug, not a business outcome.
    #[error("internal rule error: {0}")]
    Internal(String),
}

impl RuleError {
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }
}

fn signal_suffix(signal: &Option<String>, prefix: &str, suffix: &str) -> String {
    signal
        .as_ref()
        .map(|s| format!("{prefix}{s}{suffix}"))
        .unwrap_or_default()
}

fn rule_suffix(rule: &Option<RuleKind>) -> String {
    rule.map(|r| format!(" in rule {r}")).unwrap_or_default()
}

/// Errors from the policy engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A rule denied the transaction. Evaluation stopped at this rule.
    #[error("policy denied by {kind}: {reason}")]
    Denied { kind: RuleKind, reason: String },

    /// A signal or the policy store failed. Retryable.
    #[error("infrastructure failure{}{}: {reason}",
        rule_suffix(.rule),
        signal_suffix(.signal, " fetching signal ", ""))]
    Infrastructure {
        rule: Option<RuleKind>,
        signal: Option<String>,
        reason: String,
    },

    /// A stored document no longer validates.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The request itself is inconsistent (e.g. the transaction belongs to a
    /// different adapter).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure { .. })
    }
}

/// Failure of the external policy store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("policy store unavailable: {0}")]
    Unavailable(String),
}

/// Failure to fetch a signal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("signal {0} is not available")]
    NotFound(String),

    #[error("signal {name} fetch failed: {reason}")]
    FetchFailed { name: String, reason: String },
}

/// The registry could not be constructed.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("parameter schema for {kind} failed to compile: {reason}")]
    SchemaBuild { kind: RuleKind, reason: String },

    #[error("document schema failed to compile: {0}")]
    DocumentSchemaBuild(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_every_issue() {
        let err = SchemaError {
            issues: vec![
                SchemaIssue::UnknownRuleKind {
                    index: 0,
                    kind: "geo-fence".into(),
                },
                SchemaIssue::InvalidRuleParams {
                    index: 1,
                    kind: RuleKind::TimeWindow,
                    field: "startHour".into(),
                    reason: "30 is greater than the maximum of 23".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("policy document has 2 issue(s)"));
        assert!(text.contains("rules[0]: unknown rule kind \"geo-fence\""));
        assert!(text.contains("rules[1] (time-window).startHour"));
    }

    #[test]
    fn issues_serialize_with_tag() {
        let issue = SchemaIssue::InvalidRuleParams {
            index: 2,
            kind: RuleKind::SpendLimit,
            field: "maxAmount".into(),
            reason: "required".into(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["issue"], "invalidRuleParams");
        assert_eq!(json["kind"], "spend-limit");
        assert_eq!(json["index"], 2);
    }

    #[test]
    fn engine_error_classification() {
        let denied = EngineError::Denied {
            kind: RuleKind::RecipientWhitelist,
            reason: "recipient not in whitelist".into(),
        };
        assert!(denied.is_denial());
        assert!(!denied.is_retryable());

        let infra = EngineError::Infrastructure {
            rule: Some(RuleKind::SpendLimit),
            signal: Some("eth-usd".into()),
            reason: "timeout".into(),
        };
        assert!(infra.is_retryable());
        assert_eq!(
            infra.to_string(),
            "infrastructure failure in rule spend-limit fetching signal eth-usd: timeout"
        );
    }
}
