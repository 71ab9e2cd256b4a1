//! # Rule Registry
//!
//! Static dispatch from [`RuleKind`] to its rule implementation. Every match
//! here is exhaustive, so adding a kind without wiring its schema, parser and
//! `prepare` step fails to compile.
//!
//! The registry is built once at process start and shared read-only. It owns
//! the whitelist tree builder, whose hasher is injected at construction so it
//! can match the external circuit.

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonschema::Validator;
use serde::Serialize;
use serde_json::{Map, Value};

use polyseal_core::RuleKind;
use polyseal_crypto::{MerkleHasher, Sha256MerkleHasher};

use crate::config::ConfigFragment;
use crate::context::PolicyContext;
use crate::error::{RegistryError, RuleError};
use crate::rules::{
    FieldIssue, RecipientWhitelistRule, Rule, RuleParams, SpendLimitRule, TimeWindowRule,
    VelocityRule,
};

/// Public description of one rule kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    pub kind: RuleKind,
    pub namespace: &'static str,
    pub schema: Value,
    pub defaults: Map<String, Value>,
    pub required: Vec<&'static str>,
    /// The rule may read an external signal, depending on its parameters.
    pub signal_dependent: bool,
}

fn describe<R: Rule>(signal_dependent: bool) -> RuleDescriptor {
    RuleDescriptor {
        kind: R::KIND,
        namespace: R::KIND.namespace(),
        schema: R::schema(),
        defaults: R::defaults(),
        required: R::required().to_vec(),
        signal_dependent,
    }
}

/// Catalog of rule kinds with compiled parameter schemas.
pub struct RuleRegistry {
    recipient_whitelist: RecipientWhitelistRule,
    time_window: TimeWindowRule,
    spend_limit: SpendLimitRule,
    velocity: VelocityRule,
    validators: BTreeMap<RuleKind, Validator>,
}

impl RuleRegistry {
    /// Build a registry whose whitelist rule hashes with `hasher`.
    pub fn new(hasher: Arc<dyn MerkleHasher>) -> Result<Self, RegistryError> {
        let mut validators = BTreeMap::new();
        for kind in RuleKind::ALL {
            let schema = Self::descriptor(kind).schema;
            let validator = jsonschema::options()
                .with_draft(jsonschema::Draft::Draft202012)
                .build(&schema)
                .map_err(|e| RegistryError::SchemaBuild {
                    kind,
                    reason: e.to_string(),
                })?;
            validators.insert(kind, validator);
        }
        Ok(Self {
            recipient_whitelist: RecipientWhitelistRule::new(hasher),
            time_window: TimeWindowRule,
            spend_limit: SpendLimitRule,
            velocity: VelocityRule,
            validators,
        })
    }

    /// Registry with the default domain-separated SHA-256 hasher.
    pub fn with_default_hasher() -> Result<Self, RegistryError> {
        Self::new(Arc::new(Sha256MerkleHasher))
    }

    pub fn descriptor(kind: RuleKind) -> RuleDescriptor {
        match kind {
            RuleKind::RecipientWhitelist => describe::<RecipientWhitelistRule>(false),
            RuleKind::TimeWindow => describe::<TimeWindowRule>(false),
            RuleKind::SpendLimit => describe::<SpendLimitRule>(true),
            RuleKind::Velocity => describe::<VelocityRule>(false),
        }
    }

    pub fn descriptors() -> Vec<RuleDescriptor> {
        RuleKind::ALL.into_iter().map(Self::descriptor).collect()
    }

    /// The configuration a rule uses for every omitted parameter.
    pub fn default_config(kind: RuleKind) -> Map<String, Value> {
        Self::descriptor(kind).defaults
    }

    pub fn recipient_whitelist(&self) -> &RecipientWhitelistRule {
        &self.recipient_whitelist
    }

    /// Validate raw parameters for `kind` and convert them to typed form.
    ///
    /// Reports every offending field, not just the first.
    pub fn parse_params(
        &self,
        kind: RuleKind,
        params: &Map<String, Value>,
    ) -> Result<RuleParams, Vec<FieldIssue>> {
        let Some(validator) = self.validators.get(&kind) else {
            return Err(vec![FieldIssue::new("", "no schema registered for rule kind")]);
        };
        match kind {
            RuleKind::RecipientWhitelist => {
                parse::<RecipientWhitelistRule>(validator, params).map(RuleParams::RecipientWhitelist)
            }
            RuleKind::TimeWindow => {
                parse::<TimeWindowRule>(validator, params).map(RuleParams::TimeWindow)
            }
            RuleKind::SpendLimit => {
                parse::<SpendLimitRule>(validator, params).map(RuleParams::SpendLimit)
            }
            RuleKind::Velocity => parse::<VelocityRule>(validator, params).map(RuleParams::Velocity),
        }
    }

    /// Run one rule's preparation step.
    pub fn prepare(
        &self,
        params: &RuleParams,
        ctx: &PolicyContext,
    ) -> Result<ConfigFragment, RuleError> {
        match params {
            RuleParams::RecipientWhitelist(p) => self.recipient_whitelist.prepare(p, ctx),
            RuleParams::TimeWindow(p) => self.time_window.prepare(p, ctx),
            RuleParams::SpendLimit(p) => self.spend_limit.prepare(p, ctx),
            RuleParams::Velocity(p) => self.velocity.prepare(p, ctx),
        }
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("kinds", &self.validators.keys().collect::<Vec<_>>())
            .field("recipient_whitelist", &self.recipient_whitelist)
            .finish()
    }
}

/// Unknown keys, missing required keys and schema violations are collected
/// together; typed conversion and cross-field checks run only on a
/// structurally valid object.
fn parse<R: Rule>(
    validator: &Validator,
    params: &Map<String, Value>,
) -> Result<R::Params, Vec<FieldIssue>> {
    let schema = R::schema();
    let known = schema.get("properties").and_then(Value::as_object);

    let mut issues = Vec::new();
    for key in params.keys() {
        if !known.is_some_and(|k| k.contains_key(key)) {
            issues.push(FieldIssue::new(key.as_str(), "unknown parameter"));
        }
    }
    for required in R::required() {
        if !params.contains_key(*required) {
            issues.push(FieldIssue::new(*required, "required parameter is missing"));
        }
    }
    let instance = Value::Object(params.clone());
    for err in validator.iter_errors(&instance) {
        issues.push(FieldIssue::new(
            field_from_pointer(&err.instance_path.to_string()),
            err.to_string(),
        ));
    }
    if !issues.is_empty() {
        return Err(issues);
    }

    let mut merged = R::defaults();
    merged.extend(params.clone());
    let typed: R::Params = serde_json::from_value(Value::Object(merged))
        .map_err(|e| vec![FieldIssue::new("params", e.to_string())])?;

    let cross = R::check(&typed);
    if !cross.is_empty() {
        return Err(cross);
    }
    Ok(R::normalize(typed))
}

/// `/addresses/2` becomes `addresses[2]`.
fn field_from_pointer(pointer: &str) -> String {
    let mut out = String::new();
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        if segment.bytes().all(|b| b.is_ascii_digit()) {
            out.push_str(&format!("[{segment}]"));
        } else {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(segment);
        }
    }
    out
}
