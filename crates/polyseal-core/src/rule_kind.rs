//! # Rule Kinds
//!
//! The closed set of policy rule kinds. Declaration order is the compiled
//! evaluation priority: membership checks precede time checks, which precede
//! amount and rate checks. `Ord` is derived, so a `BTreeMap<RuleKind, _>`
//! iterates in priority order.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A named category of policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    RecipientWhitelist,
    TimeWindow,
    SpendLimit,
    Velocity,
}

impl RuleKind {
    /// Every kind, in priority order.
    pub const ALL: [RuleKind; 4] = [
        RuleKind::RecipientWhitelist,
        RuleKind::TimeWindow,
        RuleKind::SpendLimit,
        RuleKind::Velocity,
    ];

    /// Tag used in policy documents and denial attribution.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecipientWhitelist => "recipient-whitelist",
            Self::TimeWindow => "time-window",
            Self::SpendLimit => "spend-limit",
            Self::Velocity => "velocity",
        }
    }

    /// Top-level key owned by this kind in a merged policy config.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::RecipientWhitelist => "recipientWhitelist",
            Self::TimeWindow => "timeWindow",
            Self::SpendLimit => "spendLimit",
            Self::Velocity => "velocity",
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownRuleKind(s.to_string()))
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tags_parse_back() {
        for kind in RuleKind::ALL {
            assert_eq!(kind.as_str().parse::<RuleKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(
            "geo-fence".parse::<RuleKind>(),
            Err(ValidationError::UnknownRuleKind("geo-fence".into()))
        );
    }

    #[test]
    fn priority_order_is_declaration_order() {
        let mut shuffled = vec![
            RuleKind::Velocity,
            RuleKind::RecipientWhitelist,
            RuleKind::SpendLimit,
            RuleKind::TimeWindow,
        ];
        shuffled.sort();
        assert_eq!(shuffled, RuleKind::ALL.to_vec());
    }

    #[test]
    fn namespaces_are_distinct() {
        let set: HashSet<_> = RuleKind::ALL.iter().map(|k| k.namespace()).collect();
        assert_eq!(set.len(), RuleKind::ALL.len());
    }
}
