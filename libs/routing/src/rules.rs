//! Ordered rule set evaluation
//!
//! Rules are evaluated in stored order: the first enabled rule whose pattern
//! matches the topic and whose exclusion list does not name the topic's MMSI
//! wins. An excluded match does not stop the scan, so a later rule may still
//! pick the message up.

use std::collections::BTreeSet;

use signalk::identity::{extract_mmsi, SelfIdentity};
use tracing::trace;

use crate::pattern::{
    canonicalize_topic, has_self_segment, substitute_self, topic_matches, TOPIC_DELIMITER,
};
use crate::rule::ImportRule;

/// The ordered rule list plus the broker topic prefix applied to every
/// pattern.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ImportRule>,
    topic_prefix: String,
}

/// First `/`-segment of the topic that parses as a vessel URN, as an MMSI.
pub fn topic_mmsi(topic: &str) -> Option<&str> {
    topic.split(TOPIC_DELIMITER).find_map(extract_mmsi)
}

impl RuleSet {
    /// Rule set with an optional topic prefix (empty string for none; a
    /// trailing `/` on the prefix is tolerated).
    pub fn new(rules: Vec<ImportRule>, topic_prefix: impl Into<String>) -> Self {
        let topic_prefix = topic_prefix
            .into()
            .trim_end_matches(TOPIC_DELIMITER)
            .to_string();
        Self {
            rules,
            topic_prefix,
        }
    }

    pub fn rules(&self) -> &[ImportRule] {
        &self.rules
    }

    pub fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }

    /// Pattern with the configured topic prefix applied.
    fn prefixed(&self, pattern: &str) -> String {
        if self.topic_prefix.is_empty() {
            pattern.to_string()
        } else {
            format!("{}/{}", self.topic_prefix, pattern.trim_start_matches(TOPIC_DELIMITER))
        }
    }

    /// Topic with the configured prefix removed, for context/path
    /// derivation.
    pub fn strip_prefix<'a>(&self, topic: &'a str) -> &'a str {
        if self.topic_prefix.is_empty() {
            return topic;
        }
        match topic.strip_prefix(self.topic_prefix.as_str()) {
            // Only strip at a segment boundary: "signalk/x" yes, "signalkx" no.
            Some(rest) if rest.is_empty() || rest.starts_with(TOPIC_DELIMITER) => {
                rest.trim_start_matches(TOPIC_DELIMITER)
            }
            _ => topic,
        }
    }

    /// First enabled, matching, non-excluded rule for the topic.
    pub fn find_match(&self, topic: &str, identity: &SelfIdentity) -> Option<&ImportRule> {
        for rule in &self.rules {
            if !rule.enabled {
                continue;
            }
            let pattern = self.prefixed(&rule.topic_pattern);
            if !topic_matches(&pattern, topic, identity) {
                continue;
            }
            if !rule.excluded_mmsis.is_empty() {
                if let Some(mmsi) = topic_mmsi(topic) {
                    if rule.excluded_mmsis.contains(mmsi) {
                        trace!(rule = %rule.id, mmsi, "rule matched but excludes this vessel");
                        continue;
                    }
                }
            }
            return Some(rule);
        }
        None
    }

    /// Subscription set for the transport, recomputed on every rule change.
    ///
    /// Self-placeholder patterns expand to the encodings vessels actually
    /// publish under; patterns carrying a transport-URN literal also emit
    /// the canonicalized variant.
    pub fn subscription_topics(&self, identity: &SelfIdentity) -> BTreeSet<String> {
        let mut topics = BTreeSet::new();
        for rule in self.rules.iter().filter(|r| r.enabled) {
            let pattern = self.prefixed(&rule.topic_pattern);
            if has_self_segment(&pattern) {
                match (identity.canonical(), identity.transport()) {
                    (Some(canonical), Some(transport)) => {
                        topics.insert(substitute_self(&pattern, canonical));
                        topics.insert(substitute_self(&pattern, &transport));
                    }
                    // Unresolved identity: keep the literal subscription so
                    // the rule is not silently dead.
                    _ => {
                        topics.insert(pattern);
                    }
                }
            } else {
                let canonical = canonicalize_topic(&pattern);
                if canonical != pattern {
                    topics.insert(canonical);
                }
                topics.insert(pattern);
            }
        }
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URN: &str = "urn:mrn:imo:mmsi:368396230";

    fn me() -> SelfIdentity {
        SelfIdentity::resolved(URN)
    }

    fn rule(id: &str, pattern: &str) -> ImportRule {
        ImportRule::new(id, pattern)
    }

    #[test]
    fn test_first_enabled_matching_rule_wins() {
        let mut disabled = rule("r1", "a/b/#");
        disabled.enabled = false;
        let rules = RuleSet::new(vec![disabled, rule("r2", "a/b/#"), rule("r3", "#")], "");

        let hit = rules.find_match("a/b/c", &me()).unwrap();
        assert_eq!(hit.id, "r2");
    }

    #[test]
    fn test_exclusion_continues_scan_to_later_rules() {
        let mut excluding = rule("r1", "vessels/+/nav");
        excluding.excluded_mmsis.insert("7".to_string());
        let rules = RuleSet::new(vec![excluding, rule("r2", "vessels/+/nav")], "");

        // Excluded MMSI falls through to the next rule.
        let hit = rules.find_match("vessels/urn:mrn:imo:mmsi:7/nav", &me()).unwrap();
        assert_eq!(hit.id, "r2");

        // Other vessels still land on the first rule.
        let hit = rules.find_match("vessels/urn:mrn:imo:mmsi:8/nav", &me()).unwrap();
        assert_eq!(hit.id, "r1");
    }

    #[test]
    fn test_no_match_yields_none() {
        let rules = RuleSet::new(vec![rule("r1", "a/b")], "");
        assert!(rules.find_match("x/y", &me()).is_none());
    }

    #[test]
    fn test_topic_prefix_is_applied_and_stripped() {
        let rules = RuleSet::new(vec![rule("r1", "vessels/self/#")], "signalk/");
        assert_eq!(rules.topic_prefix(), "signalk");

        let topic = format!("signalk/vessels/{URN}/navigation/position");
        assert!(rules.find_match(&topic, &me()).is_some());
        assert!(rules.find_match("vessels/self/navigation/position", &me()).is_none());
        assert_eq!(
            rules.strip_prefix(&topic),
            format!("vessels/{URN}/navigation/position")
        );
    }

    #[test]
    fn test_subscription_topics_expand_self_placeholder() {
        let rules = RuleSet::new(vec![rule("r1", "vessels/self/#")], "");
        let topics = rules.subscription_topics(&me());
        assert!(topics.contains(&format!("vessels/{URN}/#")));
        assert!(topics.contains("vessels/urn_mrn_imo_mmsi_368396230/#"));
        assert!(!topics.contains("vessels/self/#"));
    }

    #[test]
    fn test_subscription_topics_keep_literal_when_unresolved() {
        let rules = RuleSet::new(vec![rule("r1", "vessels/self/#")], "");
        let topics = rules.subscription_topics(&SelfIdentity::unresolved());
        assert_eq!(topics.len(), 1);
        assert!(topics.contains("vessels/self/#"));
    }

    #[test]
    fn test_subscription_topics_canonicalize_transport_literals() {
        let rules = RuleSet::new(
            vec![rule("r1", "vessels/urn_mrn_imo_mmsi_111111111/#"), {
                let mut r = rule("r2", "sensors/#");
                r.enabled = false;
                r
            }],
            "",
        );
        let topics = rules.subscription_topics(&me());
        assert!(topics.contains("vessels/urn_mrn_imo_mmsi_111111111/#"));
        assert!(topics.contains("vessels/urn:mrn:imo:mmsi:111111111/#"));
        // Disabled rules contribute nothing.
        assert!(!topics.contains("sensors/#"));
    }

    #[test]
    fn test_topic_mmsi_finds_first_urn_segment() {
        assert_eq!(topic_mmsi("vessels/urn:mrn:imo:mmsi:7/nav"), Some("7"));
        assert_eq!(topic_mmsi("vessels/urn_mrn_imo_mmsi_42/nav"), Some("42"));
        assert_eq!(topic_mmsi("sensors/engine/temp"), None);
    }
}
