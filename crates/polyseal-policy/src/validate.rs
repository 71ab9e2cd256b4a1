//! # Policy Document Validator
//!
//! Checks a document against the envelope schema, resolves every rule kind,
//! and validates each rule's parameters against that kind's schema. All
//! issues from all rules are returned together in one [`SchemaError`] so an
//! author can fix a document in a single round-trip.
//!
//! Pure: no network or storage access.

use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;

use polyseal_core::RuleKind;

use crate::compiler::{CompiledPolicy, PolicyCompiler, ValidatedDocument};
use crate::document::{document_schema, PolicyDocument};
use crate::error::{RegistryError, SchemaError, SchemaIssue};
use crate::registry::RuleRegistry;

pub struct DocumentValidator {
    registry: Arc<RuleRegistry>,
    envelope: Validator,
}

impl DocumentValidator {
    pub fn new(registry: Arc<RuleRegistry>) -> Result<Self, RegistryError> {
        let envelope = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(&document_schema())
            .map_err(|e| RegistryError::DocumentSchemaBuild(e.to_string()))?;
        Ok(Self { registry, envelope })
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Validate an untyped document and compile it.
    pub fn validate_value(&self, value: &Value) -> Result<CompiledPolicy, SchemaError> {
        let issues: Vec<SchemaIssue> = self
            .envelope
            .iter_errors(value)
            .map(|e| SchemaIssue::MalformedDocument {
                path: e.instance_path.to_string(),
                reason: e.to_string(),
            })
            .collect();
        if !issues.is_empty() {
            return Err(SchemaError { issues });
        }
        let document = PolicyDocument::from_value(value.clone())?;
        self.validate(&document)
    }

    /// Validate a document and compile it.
    pub fn validate(&self, document: &PolicyDocument) -> Result<CompiledPolicy, SchemaError> {
        self.check(document).map(|v| PolicyCompiler::compile(&v))
    }

    /// Validate every rule, keeping document order.
    pub fn check(&self, document: &PolicyDocument) -> Result<ValidatedDocument, SchemaError> {
        let mut issues = Vec::new();
        let mut rules = Vec::with_capacity(document.rules.len());

        for (index, rule) in document.rules.iter().enumerate() {
            let kind = match rule.kind.parse::<RuleKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    issues.push(SchemaIssue::UnknownRuleKind {
                        index,
                        kind: rule.kind.clone(),
                    });
                    continue;
                }
            };
            match self.registry.parse_params(kind, &rule.params) {
                Ok(params) => rules.push(params),
                Err(field_issues) => {
                    issues.extend(field_issues.into_iter().map(|f| {
                        SchemaIssue::InvalidRuleParams {
                            index,
                            kind,
                            field: f.field,
                            reason: f.reason,
                        }
                    }));
                }
            }
        }

        if !issues.is_empty() {
            tracing::debug!(issues = issues.len(), "policy document rejected");
            return Err(SchemaError { issues });
        }
        Ok(ValidatedDocument::new(rules))
    }
}

impl std::fmt::Debug for DocumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentValidator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> DocumentValidator {
        DocumentValidator::new(Arc::new(RuleRegistry::with_default_hasher().unwrap())).unwrap()
    }

    #[test]
    fn two_malformed_rules_reported_together() {
        let doc = serde_json::json!({
            "rules": [
                { "type": "time-window", "params": { "startHour": 30 } },
                { "type": "spend-limit", "params": { "maxAmount": "ten" } }
            ]
        });
        let err = validator().validate_value(&doc).unwrap_err();
        let fields: Vec<_> = err
            .issues
            .iter()
            .filter_map(|i| match i {
                SchemaIssue::InvalidRuleParams { index, field, .. } => Some((*index, field.clone())),
                _ => None,
            })
            .collect();
        assert!(fields.contains(&(0, "startHour".into())));
        assert!(fields.contains(&(1, "maxAmount".into())));
    }

    #[test]
    fn unknown_kind_reported_with_position() {
        let doc = serde_json::json!({
            "rules": [
                { "type": "time-window" },
                { "type": "geo-fence", "params": {} }
            ]
        });
        let err = validator().validate_value(&doc).unwrap_err();
        assert_eq!(
            err.issues,
            vec![SchemaIssue::UnknownRuleKind {
                index: 1,
                kind: "geo-fence".into()
            }]
        );
    }

    #[test]
    fn envelope_issues_reported() {
        let doc = serde_json::json!({ "rules": [ { "params": {} } ], "extra": true });
        let err = validator().validate_value(&doc).unwrap_err();
        assert!(err.issues.len() >= 2);
        assert!(err
            .issues
            .iter()
            .all(|i| matches!(i, SchemaIssue::MalformedDocument { .. })));
    }

    #[test]
    fn cross_field_violation_reported() {
        let doc = serde_json::json!({
            "rules": [ { "type": "time-window", "params": { "startHour": 17, "endHour": 9 } } ]
        });
        let err = validator().validate_value(&doc).unwrap_err();
        assert!(matches!(
            &err.issues[0],
            SchemaIssue::InvalidRuleParams { field, .. } if field == "startHour"
        ));
    }

    #[test]
    fn valid_document_compiles_in_priority_order() {
        let doc = serde_json::json!({
            "name": "treasury",
            "rules": [
                { "type": "velocity", "params": { "minIntervalSeconds": 60 } },
                { "type": "recipient-whitelist", "params": { "addresses": ["0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"] } }
            ]
        });
        let compiled = validator().validate_value(&doc).unwrap();
        assert_eq!(
            compiled.kinds(),
            vec![RuleKind::RecipientWhitelist, RuleKind::Velocity]
        );
    }

    #[test]
    fn whitelist_deeper_than_circuit_rejected() {
        use crate::rules::recipient_whitelist::MAX_ADDRESSES;

        let addresses: Vec<String> = (0..=MAX_ADDRESSES).map(|i| format!("0x{i:040x}")).collect();
        let doc = serde_json::json!({
            "rules": [ { "type": "recipient-whitelist", "params": { "addresses": addresses } } ]
        });
        let err = validator().validate_value(&doc).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(matches!(
            &err.issues[0],
            SchemaIssue::InvalidRuleParams { kind: RuleKind::RecipientWhitelist, field, .. }
                if field == "addresses"
        ));
    }

    #[test]
    fn duplicate_spellings_do_not_count_against_whitelist_cap() {
        use crate::rules::recipient_whitelist::MAX_ADDRESSES;

        let mut addresses: Vec<String> = (0..MAX_ADDRESSES).map(|i| format!("0x{i:040x}")).collect();
        addresses.push(format!("0x{:040X}", 0xabcu32));
        let doc = serde_json::json!({
            "rules": [ { "type": "recipient-whitelist", "params": { "addresses": addresses } } ]
        });
        assert!(validator().validate_value(&doc).is_ok());
    }

    #[test]
    fn empty_rule_list_is_valid() {
        let compiled = validator()
            .validate_value(&serde_json::json!({"rules": []}))
            .unwrap();
        assert!(compiled.is_empty());
    }
}
