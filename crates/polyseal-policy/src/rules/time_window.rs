//! Time-window rule: permitted UTC hours of execution.
//!
//! The rule only prepares configuration. Whether the execution instant falls
//! inside the window is checked by the circuit against the public execution
//! timestamp, so the fragment is independent of the wall clock.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use polyseal_core::RuleKind;

use super::{FieldIssue, Rule};
use crate::config::{ConfigFragment, TimeWindowFragment};
use crate::context::PolicyContext;
use crate::error::RuleError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeWindowParams {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl Default for TimeWindowParams {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: 23,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindowRule;

impl Rule for TimeWindowRule {
    type Params = TimeWindowParams;

    const KIND: RuleKind = RuleKind::TimeWindow;

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "startHour": { "type": "integer", "minimum": 0, "maximum": 23 },
                "endHour": { "type": "integer", "minimum": 0, "maximum": 23 }
            }
        })
    }

    fn defaults() -> Map<String, Value> {
        let d = TimeWindowParams::default();
        let mut m = Map::new();
        m.insert("startHour".into(), d.start_hour.into());
        m.insert("endHour".into(), d.end_hour.into());
        m
    }

    fn check(params: &TimeWindowParams) -> Vec<FieldIssue> {
        if params.start_hour < params.end_hour {
            return Vec::new();
        }
        vec![FieldIssue::new(
            "startHour",
            format!(
                "startHour ({}) must be less than endHour ({})",
                params.start_hour, params.end_hour
            ),
        )]
    }

    fn prepare(
        &self,
        params: &TimeWindowParams,
        _ctx: &PolicyContext,
    ) -> Result<ConfigFragment, RuleError> {
        Ok(ConfigFragment::TimeWindow(TimeWindowFragment {
            enabled: true,
            start_hour: params.start_hour,
            end_hour: params.end_hour,
        }))
    }
}
