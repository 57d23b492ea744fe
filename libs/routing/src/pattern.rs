//! Topic pattern matching
//!
//! Decides whether a concrete topic satisfies an MQTT-style subscription
//! filter. Beyond plain `+`/`#` wildcard semantics, the matcher treats the
//! canonical (`urn:mrn:...`) and transport (`urn_mrn_...`) encodings of a
//! vessel URN as the same identifier, and understands the literal `self`
//! segment as a placeholder for the importing vessel's own URN. A single
//! rule can therefore express "this topic, for me, in any encoding" without
//! the author knowing the vessel's URN at rule-authoring time.

use regex::Regex;
use signalk::identity::{is_transport_urn, to_canonical_form, SelfIdentity};

/// Placeholder segment standing in for the vessel's own identifier.
pub const SELF_PLACEHOLDER: &str = "self";

/// Topic segment delimiter.
pub const TOPIC_DELIMITER: char = '/';

/// Rewrite every transport-form URN segment of a topic to canonical form.
///
/// Segments that do not look like transport URNs pass through untouched.
pub fn canonicalize_topic(topic: &str) -> String {
    topic
        .split(TOPIC_DELIMITER)
        .map(|segment| {
            if is_transport_urn(segment) {
                to_canonical_form(segment)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Does this pattern contain the `self` placeholder segment?
pub fn has_self_segment(pattern: &str) -> bool {
    pattern
        .split(TOPIC_DELIMITER)
        .any(|segment| segment == SELF_PLACEHOLDER)
}

/// Replace every `self` segment of a pattern with the given identifier.
pub fn substitute_self(pattern: &str, identifier: &str) -> String {
    pattern
        .split(TOPIC_DELIMITER)
        .map(|segment| {
            if segment == SELF_PLACEHOLDER {
                identifier
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Does `topic` satisfy `pattern`?
///
/// The pattern is tried as written, with its transport-URN segments
/// canonicalized, and — when it contains the `self` placeholder and identity
/// is resolved — with the placeholder substituted by each encoding of the
/// self URN. The topic is tried both raw and canonicalized. Any combination
/// succeeding is a match.
pub fn topic_matches(pattern: &str, topic: &str, identity: &SelfIdentity) -> bool {
    let mut candidates: Vec<String> = vec![pattern.to_string()];

    let canonical_pattern = canonicalize_topic(pattern);
    if canonical_pattern != pattern {
        candidates.push(canonical_pattern);
    }

    if has_self_segment(pattern) {
        if let (Some(canonical), Some(transport)) = (identity.canonical(), identity.transport()) {
            candidates.push(substitute_self(pattern, canonical));
            candidates.push(substitute_self(pattern, &transport));
        }
    }

    let canonical_topic = canonicalize_topic(topic);
    let topics = [topic, canonical_topic.as_str()];

    candidates
        .iter()
        .any(|candidate| topics.iter().any(|t| matches_literal(candidate, t)))
}

/// Wildcard evaluation of one concrete pattern against one concrete topic.
fn matches_literal(pattern: &str, topic: &str) -> bool {
    if pattern.contains('#') {
        return matches_multi_level(pattern, topic);
    }
    if pattern.contains('+') {
        return matches_single_level(pattern, topic);
    }
    pattern == topic
}

/// `#` matches the remaining levels; valid only as the final segment.
fn matches_multi_level(pattern: &str, topic: &str) -> bool {
    if pattern == "#" {
        return true;
    }
    // Anything other than one trailing "/#" segment is a malformed filter
    // and matches nothing.
    if pattern.matches('#').count() != 1 || !pattern.ends_with("/#") {
        return false;
    }
    let prefix = &pattern[..pattern.len() - 2];
    if prefix.contains('+') {
        // `+` inside the prefix: the topic, or any segment-boundary prefix
        // of it, must satisfy the single-level matcher.
        return matches_single_level(prefix, topic)
            || topic
                .char_indices()
                .filter(|&(_, c)| c == TOPIC_DELIMITER)
                .any(|(i, _)| matches_single_level(prefix, &topic[..i]));
    }
    topic == prefix || topic.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// `+` matches one or more characters excluding the segment delimiter.
fn matches_single_level(pattern: &str, topic: &str) -> bool {
    let escaped = regex::escape(pattern);
    let body = escaped.replace(r"\+", "[^/]+");
    match Regex::new(&format!("^{body}$")) {
        Ok(re) => re.is_match(topic),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URN: &str = "urn:mrn:imo:mmsi:368396230";
    const URN_TRANSPORT: &str = "urn_mrn_imo_mmsi_368396230";

    fn me() -> SelfIdentity {
        SelfIdentity::resolved(URN)
    }

    #[test]
    fn test_exact_match() {
        let id = me();
        assert!(topic_matches("a/b/c", "a/b/c", &id));
        assert!(!topic_matches("a/b/c", "a/b", &id));
        assert!(!topic_matches("a/b/c", "a/b/c/d", &id));
    }

    #[test]
    fn test_exact_match_is_encoding_agnostic() {
        let id = me();
        let canonical = format!("vessels/{URN}/navigation");
        let transport = format!("vessels/{URN_TRANSPORT}/navigation");
        assert!(topic_matches(&canonical, &transport, &id));
        assert!(topic_matches(&transport, &canonical, &id));
    }

    #[test]
    fn test_single_level_wildcard() {
        let id = me();
        assert!(topic_matches("sensors/+/temperature", "sensors/engine/temperature", &id));
        assert!(!topic_matches("sensors/+/temperature", "sensors/temperature", &id));
        assert!(!topic_matches(
            "sensors/+/temperature",
            "sensors/a/b/temperature",
            &id
        ));
        // `+` requires at least one character.
        assert!(!topic_matches("sensors/+/temperature", "sensors//temperature", &id));
    }

    #[test]
    fn test_single_level_wildcard_with_transport_segment() {
        let id = me();
        assert!(topic_matches(
            "vessels/+/navigation/position",
            &format!("vessels/{URN_TRANSPORT}/navigation/position"),
            &id
        ));
    }

    #[test]
    fn test_multi_level_wildcard() {
        let id = me();
        assert!(topic_matches("vessels/self/#", &format!("vessels/{URN}/a/b"), &id));
        assert!(topic_matches("a/b/#", "a/b", &id));
        assert!(topic_matches("a/b/#", "a/b/c/d", &id));
        assert!(!topic_matches("a/b/#", "a/bc", &id));
        assert!(topic_matches("#", "anything/at/all", &id));
    }

    #[test]
    fn test_misplaced_multi_level_wildcard_never_matches() {
        let id = me();
        assert!(!topic_matches("a/#/b", "a/x/b", &id));
        assert!(!topic_matches("a#", "a", &id));
        assert!(!topic_matches("a/b#", "a/b", &id));
    }

    #[test]
    fn test_self_placeholder_matches_all_encodings() {
        let id = me();
        let pattern = "vessels/self/navigation/position";
        assert!(topic_matches(pattern, "vessels/self/navigation/position", &id));
        assert!(topic_matches(pattern, &format!("vessels/{URN}/navigation/position"), &id));
        assert!(topic_matches(
            pattern,
            &format!("vessels/{URN_TRANSPORT}/navigation/position"),
            &id
        ));
        assert!(!topic_matches(
            pattern,
            "vessels/urn:mrn:imo:mmsi:999999999/navigation/position",
            &id
        ));
    }

    #[test]
    fn test_self_placeholder_with_unresolved_identity() {
        let id = SelfIdentity::unresolved();
        let pattern = "vessels/self/navigation/position";
        // The literal placeholder still matches; encoded forms cannot.
        assert!(topic_matches(pattern, "vessels/self/navigation/position", &id));
        assert!(!topic_matches(pattern, &format!("vessels/{URN}/navigation/position"), &id));
    }

    #[test]
    fn test_canonicalize_topic_rewrites_only_urn_segments() {
        assert_eq!(
            canonicalize_topic(&format!("vessels/{URN_TRANSPORT}/under_score/a")),
            format!("vessels/{URN}/under_score/a")
        );
    }
}
