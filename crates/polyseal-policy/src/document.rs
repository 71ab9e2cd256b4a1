//! # Policy Documents
//!
//! The user-authored form of a policy. Rule kinds stay raw strings here so that
//! an unknown kind surfaces as a [`SchemaIssue::UnknownRuleKind`] with its
//! position, rather than as an opaque deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaIssue};

/// One rule entry as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Rule kind tag, e.g. `time-window`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl RuleConfig {
    pub fn new(kind: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// A user-authored policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rules: Vec<RuleConfig>,
}

impl PolicyDocument {
    pub fn new(rules: Vec<RuleConfig>) -> Self {
        Self {
            name: None,
            description: None,
            rules,
        }
    }

    /// Decode a document from an untyped JSON value.
    ///
    /// Callers that want every structural issue reported should go through
    /// [`crate::DocumentValidator::validate_value`], which checks the
    /// document schema before decoding.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value).map_err(|e| {
            SchemaError::single(SchemaIssue::MalformedDocument {
                path: String::new(),
                reason: e.to_string(),
            })
        })
    }
}

/// JSON Schema (draft 2020-12) for the document envelope. Rule parameters are
/// checked separately against each kind's own schema.
pub(crate) fn document_schema() -> Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "additionalProperties": false,
        "required": ["rules"],
        "properties": {
            "name": { "type": "string" },
            "description": { "type": "string" },
            "rules": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["type"],
                    "properties": {
                        "type": { "type": "string", "minLength": 1 },
                        "params": { "type": "object" }
                    }
                }
            }
        }
    })
}
