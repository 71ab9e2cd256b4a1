//! # Rules
//!
//! One module per [`RuleKind`]. Every rule implements [`Rule`]: a parameter
//! schema with defaults, optional cross-field checks, and a `prepare` step
//! that turns typed parameters plus the evaluation context into the rule's
//! namespaced [`ConfigFragment`].
//!
//! `prepare` separates "the policy says no" ([`RuleError::Denied`]) from "the
//! rule could not be evaluated" ([`RuleError::Infrastructure`]).

pub mod recipient_whitelist;
pub mod spend_limit;
pub mod time_window;
pub mod velocity;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use polyseal_core::RuleKind;

use crate::config::ConfigFragment;
use crate::context::PolicyContext;
use crate::error::RuleError;

pub use recipient_whitelist::{RecipientWhitelistParams, RecipientWhitelistRule};
pub use spend_limit::{SpendLimitParams, SpendLimitRule};
pub use time_window::{TimeWindowParams, TimeWindowRule};
pub use velocity::{VelocityParams, VelocityRule};

/// A parameter problem attributed to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Capability shared by every rule kind.
pub trait Rule {
    type Params: Serialize + DeserializeOwned + Clone;

    const KIND: RuleKind;

    /// JSON Schema (draft 2020-12) for the parameter object. `properties`
    /// lists every accepted key; required keys are named by [`Rule::required`].
    fn schema() -> Value;

    /// Values applied for keys the author omitted.
    fn defaults() -> Map<String, Value> {
        Map::new()
    }

    fn required() -> &'static [&'static str] {
        &[]
    }

    /// Constraints spanning several fields.
    fn check(_params: &Self::Params) -> Vec<FieldIssue> {
        Vec::new()
    }

    /// Put parameters in canonical form so equal policies compile to equal
    /// bytes.
    fn normalize(params: Self::Params) -> Self::Params {
        params
    }

    /// Name of the external signal this configuration reads, if any.
    fn signal(_params: &Self::Params) -> Option<&str> {
        None
    }

    /// Produce this rule's fragment of the policy config.
    fn prepare(
        &self,
        params: &Self::Params,
        ctx: &PolicyContext,
    ) -> Result<ConfigFragment, RuleError>;
}

/// Typed, validated parameters for one rule, tagged by kind.
///
/// Serializes in the same `{type, params}` shape a document uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "kebab-case")]
pub enum RuleParams {
    RecipientWhitelist(RecipientWhitelistParams),
    TimeWindow(TimeWindowParams),
    SpendLimit(SpendLimitParams),
    Velocity(VelocityParams),
}

impl RuleParams {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::RecipientWhitelist(_) => RuleKind::RecipientWhitelist,
            Self::TimeWindow(_) => RuleKind::TimeWindow,
            Self::SpendLimit(_) => RuleKind::SpendLimit,
            Self::Velocity(_) => RuleKind::Velocity,
        }
    }

    /// Signal name this rule depends on, if any.
    pub fn signal(&self) -> Option<&str> {
        match self {
            Self::RecipientWhitelist(p) => RecipientWhitelistRule::signal(p),
            Self::TimeWindow(p) => TimeWindowRule::signal(p),
            Self::SpendLimit(p) => SpendLimitRule::signal(p),
            Self::Velocity(p) => VelocityRule::signal(p),
        }
    }
}

/// Schema fragment for an amount: a decimal string or a non-negative integer.
pub(crate) fn amount_schema() -> Value {
    serde_json::json!({
        "anyOf": [
            { "type": "string", "pattern": "^[0-9]+$" },
            { "type": "integer", "minimum": 0 }
        ]
    })
}
