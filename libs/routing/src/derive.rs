//! Context and path derivation from topics
//!
//! Consulted only when neither the matched rule nor the payload supplies a
//! destination. The topic must already have the broker prefix stripped.

use signalk::delta::{vessel_context, SELF_CONTEXT};
use signalk::identity::{is_transport_urn, to_canonical_form, SelfIdentity};

use crate::pattern::{SELF_PLACEHOLDER, TOPIC_DELIMITER};

/// Leading topic segment that scopes the rest of the topic to a vessel.
pub const VESSELS_KEYWORD: &str = "vessels";

/// Derive `(context, path)` from a prefix-stripped topic.
///
/// `vessels/<token>/<path...>` topics resolve the token against the self
/// identity (any encoding, or the literal `self`) and otherwise address the
/// named vessel; everything else lands on `vessels.self` with the whole
/// topic as the path.
pub fn derive_context_and_path(topic: &str, identity: &SelfIdentity) -> (String, String) {
    let cleaned = topic.trim_matches(TOPIC_DELIMITER);
    let segments: Vec<&str> = cleaned.split(TOPIC_DELIMITER).collect();

    if segments.first() == Some(&VESSELS_KEYWORD) && segments.len() > 2 {
        let token = segments[1];
        let context = if token == SELF_PLACEHOLDER || identity.matches(token) {
            SELF_CONTEXT.to_string()
        } else if is_transport_urn(token) {
            vessel_context(&to_canonical_form(token))
        } else {
            // Already canonical, or an arbitrary vessel token: use verbatim.
            vessel_context(token)
        };
        let path = segments[2..].join(".");
        return (context, path);
    }

    (SELF_CONTEXT.to_string(), cleaned.replace(TOPIC_DELIMITER, "."))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URN: &str = "urn:mrn:imo:mmsi:368396230";

    #[test]
    fn test_own_vessel_topic_derives_self_context() {
        let identity = SelfIdentity::resolved(URN);
        let (context, path) = derive_context_and_path(
            "vessels/urn_mrn_imo_mmsi_368396230/navigation/position",
            &identity,
        );
        assert_eq!(context, SELF_CONTEXT);
        assert_eq!(path, "navigation.position");
    }

    #[test]
    fn test_foreign_vessel_topic_derives_vessel_context() {
        let identity = SelfIdentity::resolved("urn:mrn:imo:mmsi:999999999");
        let (context, path) = derive_context_and_path(
            "vessels/urn_mrn_imo_mmsi_368396230/navigation/position",
            &identity,
        );
        assert_eq!(context, format!("vessels.{URN}"));
        assert_eq!(path, "navigation.position");
    }

    #[test]
    fn test_canonical_vessel_token_used_as_is() {
        let identity = SelfIdentity::resolved("urn:mrn:imo:mmsi:999999999");
        let (context, _) =
            derive_context_and_path(&format!("vessels/{URN}/navigation/position"), &identity);
        assert_eq!(context, format!("vessels.{URN}"));
    }

    #[test]
    fn test_literal_self_token_derives_self_context() {
        let identity = SelfIdentity::unresolved();
        let (context, path) = derive_context_and_path("vessels/self/tanks/freshWater/level", &identity);
        assert_eq!(context, SELF_CONTEXT);
        assert_eq!(path, "tanks.freshWater.level");
    }

    #[test]
    fn test_arbitrary_vessel_token_used_verbatim() {
        let identity = SelfIdentity::resolved(URN);
        let (context, path) = derive_context_and_path("vessels/buddyboat/navigation/speed", &identity);
        assert_eq!(context, "vessels.buddyboat");
        assert_eq!(path, "navigation.speed");
    }

    #[test]
    fn test_non_vessel_topic_lands_on_self() {
        let identity = SelfIdentity::resolved(URN);
        let (context, path) = derive_context_and_path("sensors/engine/temperature", &identity);
        assert_eq!(context, SELF_CONTEXT);
        assert_eq!(path, "sensors.engine.temperature");
    }

    #[test]
    fn test_short_vessels_topic_falls_through() {
        let identity = SelfIdentity::resolved(URN);
        let (context, path) = derive_context_and_path("vessels/self", &identity);
        assert_eq!(context, SELF_CONTEXT);
        assert_eq!(path, "vessels.self");
    }
}
