//! Velocity rule: minimum spacing between executions.
//!
//! Uses the caller-supplied last execution time and the evaluation instant.
//! With no execution history the rule passes; the fragment still carries the
//! interval so the circuit can bind it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use polyseal_core::RuleKind;

use super::Rule;
use crate::config::{ConfigFragment, VelocityFragment};
use crate::context::PolicyContext;
use crate::error::RuleError;

pub const DEFAULT_MIN_INTERVAL_SECONDS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VelocityParams {
    pub min_interval_seconds: u64,
}

impl Default for VelocityParams {
    fn default() -> Self {
        Self {
            min_interval_seconds: DEFAULT_MIN_INTERVAL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityRule;

impl Rule for VelocityRule {
    type Params = VelocityParams;

    const KIND: RuleKind = RuleKind::Velocity;

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "minIntervalSeconds": { "type": "integer", "minimum": 1 }
            }
        })
    }

    fn defaults() -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(
            "minIntervalSeconds".into(),
            DEFAULT_MIN_INTERVAL_SECONDS.into(),
        );
        m
    }

    fn prepare(
        &self,
        params: &VelocityParams,
        ctx: &PolicyContext,
    ) -> Result<ConfigFragment, RuleError> {
        if let Some(last) = &ctx.last_execution_time {
            // A last execution after the evaluation instant counts as zero elapsed.
            let elapsed = ctx.evaluated_at.seconds_since(last).unwrap_or(0);
            if elapsed < params.min_interval_seconds {
                return Err(RuleError::denied(format!(
                    "last execution {elapsed}s ago; minimum interval is {}s",
                    params.min_interval_seconds
                )));
            }
        }
        Ok(ConfigFragment::Velocity(VelocityFragment {
            enabled: true,
            min_interval_seconds: params.min_interval_seconds,
            last_execution_time: ctx.last_execution_time.map(|t| t.unix_seconds()),
        }))
    }
}
