//! Spend-limit rule.
//!
//! Caps the native amount of a single transaction. Optionally also caps its
//! notional value using a price signal:
//!
//! ```text
//! notional = amount * price / 10^decimals
//! ```
//!
//! where `price` is an integer number of quote units per whole token. With a
//! price signal configured the rule is signal-dependent: its outcome may vary
//! with the signal value, and only with it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use polyseal_core::{Amount, RuleKind};

use super::{amount_schema, FieldIssue, Rule};
use crate::config::{ConfigFragment, SpendLimitFragment};
use crate::context::PolicyContext;
use crate::error::RuleError;

pub const DEFAULT_DECIMALS: u8 = 18;
pub const MAX_DECIMALS: u8 = 36;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpendLimitParams {
    pub max_amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_notional: Option<Amount>,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpendLimitRule;

impl Rule for SpendLimitRule {
    type Params = SpendLimitParams;

    const KIND: RuleKind = RuleKind::SpendLimit;

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "maxAmount": amount_schema(),
                "priceSignal": { "type": "string", "minLength": 1 },
                "maxNotional": amount_schema(),
                "decimals": { "type": "integer", "minimum": 0, "maximum": MAX_DECIMALS }
            }
        })
    }

    fn defaults() -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("decimals".into(), DEFAULT_DECIMALS.into());
        m
    }

    fn required() -> &'static [&'static str] {
        &["maxAmount"]
    }

    fn check(params: &SpendLimitParams) -> Vec<FieldIssue> {
        match (&params.price_signal, &params.max_notional) {
            (Some(_), None) => vec![FieldIssue::new(
                "maxNotional",
                "maxNotional is required when priceSignal is set",
            )],
            (None, Some(_)) => vec![FieldIssue::new(
                "priceSignal",
                "priceSignal is required when maxNotional is set",
            )],
            _ => Vec::new(),
        }
    }

    fn signal(params: &SpendLimitParams) -> Option<&str> {
        params.price_signal.as_deref()
    }

    fn prepare(
        &self,
        params: &SpendLimitParams,
        ctx: &PolicyContext,
    ) -> Result<ConfigFragment, RuleError> {
        let amount = ctx.transaction.amount;
        if amount > params.max_amount {
            return Err(RuleError::denied(format!(
                "amount {amount} exceeds spend limit {}",
                params.max_amount
            )));
        }

        if let (Some(signal), Some(max_notional)) = (&params.price_signal, params.max_notional) {
            let price = read_price(ctx, signal)?;
            let scale = 10u128
                .checked_pow(u32::from(params.decimals))
                .ok_or_else(|| RuleError::Internal(format!("decimals {} out of range", params.decimals)))?;
            // A quotient beyond u128 is above any representable limit.
            let Some(notional) = amount.checked_mul_div(price.value(), scale) else {
                return Err(RuleError::denied(format!(
                    "notional value exceeds limit {max_notional}"
                )));
            };
            if notional > max_notional {
                return Err(RuleError::denied(format!(
                    "notional value {notional} exceeds limit {max_notional}"
                )));
            }
        }

        Ok(ConfigFragment::SpendLimit(SpendLimitFragment {
            enabled: true,
            max_amount: params.max_amount,
        }))
    }
}

fn read_price(ctx: &PolicyContext, signal: &str) -> Result<Amount, RuleError> {
    let infra = |reason: String| RuleError::Infrastructure {
        signal: Some(signal.to_string()),
        reason,
    };
    let data = ctx.signals.get(signal).map_err(|e| infra(e.to_string()))?;
    let raw = data
        .values
        .get("price")
        .ok_or_else(|| infra("signal has no price".into()))?;
    serde_json::from_value::<Amount>(raw.clone())
        .map_err(|e| infra(format!("signal price is not an integer: {e}")))
}
