//! # PolicyConfig: Merged Rule Fragments
//!
//! The engine's output and the witness builder's input. Each rule kind owns
//! exactly one top-level key (its namespace); the merge is a disjoint union,
//! and inserting a second fragment for the same kind is an error rather than
//! an overwrite.
//!
//! Absent kinds are omitted from the JSON form entirely, so a policy with a
//! single time-window rule serializes to `{"timeWindow": {...}}` and nothing
//! else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use polyseal_core::{Amount, CanonicalBytes, CanonicalizationError, RuleKind};
use polyseal_crypto::Hash32;

// ---------------------------------------------------------------------------
// Fragments
// ---------------------------------------------------------------------------

/// Whitelist commitment and the recipient's membership path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipientWhitelistFragment {
    pub enabled: bool,
    pub merkle_root: Hash32,
    pub leaf_index: u64,
    /// Sibling hashes from leaf to root. Sides follow from `leaf_index` bits.
    pub path: Vec<Hash32>,
}

/// Permitted UTC hours, inclusive at both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeWindowFragment {
    pub enabled: bool,
    pub start_hour: u8,
    pub end_hour: u8,
}

impl TimeWindowFragment {
    pub fn contains_hour(&self, hour: u32) -> bool {
        (u32::from(self.start_hour)..=u32::from(self.end_hour)).contains(&hour)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpendLimitFragment {
    pub enabled: bool,
    pub max_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VelocityFragment {
    pub enabled: bool,
    pub min_interval_seconds: u64,
    /// Unix seconds of the previous execution, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution_time: Option<u64>,
}

/// A fragment tagged with the rule kind that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFragment {
    RecipientWhitelist(RecipientWhitelistFragment),
    TimeWindow(TimeWindowFragment),
    SpendLimit(SpendLimitFragment),
    Velocity(VelocityFragment),
}

impl ConfigFragment {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::RecipientWhitelist(_) => RuleKind::RecipientWhitelist,
            Self::TimeWindow(_) => RuleKind::TimeWindow,
            Self::SpendLimit(_) => RuleKind::SpendLimit,
            Self::Velocity(_) => RuleKind::Velocity,
        }
    }
}

// ---------------------------------------------------------------------------
// PolicyConfig
// ---------------------------------------------------------------------------

/// Two fragments claimed the same namespace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fragment for {0} already present in policy config")]
pub struct NamespaceCollision(pub RuleKind);

/// Merged, namespaced configuration consumed by the witness builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_whitelist: Option<RecipientWhitelistFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindowFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_limit: Option<SpendLimitFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<VelocityFragment>,
}

impl PolicyConfig {
    /// Add a fragment to its namespace. Fails if the namespace is taken.
    pub fn insert(&mut self, fragment: ConfigFragment) -> Result<(), NamespaceCollision> {
        fn put<T>(slot: &mut Option<T>, value: T, kind: RuleKind) -> Result<(), NamespaceCollision> {
            if slot.is_some() {
                return Err(NamespaceCollision(kind));
            }
            *slot = Some(value);
            Ok(())
        }
        let kind = fragment.kind();
        match fragment {
            ConfigFragment::RecipientWhitelist(f) => put(&mut self.recipient_whitelist, f, kind),
            ConfigFragment::TimeWindow(f) => put(&mut self.time_window, f, kind),
            ConfigFragment::SpendLimit(f) => put(&mut self.spend_limit, f, kind),
            ConfigFragment::Velocity(f) => put(&mut self.velocity, f, kind),
        }
    }

    /// Kinds with a fragment present, in priority order.
    pub fn kinds(&self) -> Vec<RuleKind> {
        let mut out = Vec::new();
        if self.recipient_whitelist.is_some() {
            out.push(RuleKind::RecipientWhitelist);
        }
        if self.time_window.is_some() {
            out.push(RuleKind::TimeWindow);
        }
        if self.spend_limit.is_some() {
            out.push(RuleKind::SpendLimit);
        }
        if self.velocity.is_some() {
            out.push(RuleKind::Velocity);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    /// JCS bytes of this config; the input to the policy commitment.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: u8, end: u8) -> ConfigFragment {
        ConfigFragment::TimeWindow(TimeWindowFragment {
            enabled: true,
            start_hour: start,
            end_hour: end,
        })
    }

    #[test]
    fn single_fragment_serializes_alone() {
        let mut config = PolicyConfig::default();
        config.insert(window(9, 17)).unwrap();
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({"timeWindow": {"enabled": true, "startHour": 9, "endHour": 17}})
        );
    }

    #[test]
    fn second_fragment_for_same_kind_collides() {
        let mut config = PolicyConfig::default();
        config.insert(window(9, 17)).unwrap();
        assert_eq!(
            config.insert(window(0, 23)),
            Err(NamespaceCollision(RuleKind::TimeWindow))
        );
        assert_eq!(config.time_window.as_ref().map(|w| w.start_hour), Some(9));
    }

    #[test]
    fn unrelated_fragment_leaves_others_untouched() {
        let mut a = PolicyConfig::default();
        a.insert(window(9, 17)).unwrap();
        let mut b = a.clone();
        b.insert(ConfigFragment::Velocity(VelocityFragment {
            enabled: true,
            min_interval_seconds: 60,
            last_execution_time: None,
        }))
        .unwrap();
        assert_eq!(a.time_window, b.time_window);
        assert_eq!(b.kinds(), vec![RuleKind::TimeWindow, RuleKind::Velocity]);
    }

    #[test]
    fn window_is_inclusive() {
        let w = TimeWindowFragment {
            enabled: true,
            start_hour: 9,
            end_hour: 17,
        };
        assert!(w.contains_hour(9));
        assert!(w.contains_hour(17));
        assert!(!w.contains_hour(8));
        assert!(!w.contains_hour(18));
    }

    #[test]
    fn unknown_namespace_rejected_on_input() {
        let json = serde_json::json!({"geoFence": {"enabled": true}});
        assert!(serde_json::from_value::<PolicyConfig>(json).is_err());
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let mut config = PolicyConfig::default();
        config.insert(window(1, 2)).unwrap();
        assert_eq!(
            config.canonical_bytes().unwrap().as_bytes(),
            br#"{"timeWindow":{"enabled":true,"endHour":2,"startHour":1}}"#
        );
    }
}
