//! Payload interpretation
//!
//! Turns a raw payload plus its matched rule into a delta. Two modes:
//!
//! - **ValueOnly** is total: the payload becomes a JSON value if it parses,
//!   a number if the whole text is numeric, and the raw text otherwise.
//! - **Full** requires valid JSON. A payload that already decodes as a delta
//!   shape is forwarded as-is; any other JSON is wrapped as a single opaque
//!   value, with the object's own `context` member consulted before topic
//!   derivation.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use signalk::delta::{Delta, Source, Update};
use signalk::identity::SelfIdentity;

use crate::derive::derive_context_and_path;
use crate::error::RoutingError;
use crate::rule::{ImportRule, PayloadFormat};

/// Source label applied when the rule does not carry one.
pub const DEFAULT_SOURCE_LABEL: &str = "mqtt-import";

/// Current instant as an ISO-8601 string with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Interpret a payload under the matched rule.
///
/// `topic` must already have the broker prefix stripped. Only Full-format
/// payloads can fail, and only on invalid JSON.
pub fn interpret(
    rule: &ImportRule,
    topic: &str,
    payload: &str,
    identity: &SelfIdentity,
    timestamp: &str,
) -> Result<Delta, RoutingError> {
    match rule.payload_format {
        PayloadFormat::ValueOnly => {
            let value = parse_value_only(payload);
            Ok(wrap_value(rule, topic, value, None, identity, timestamp))
        }
        PayloadFormat::Full => {
            let parsed: Value =
                serde_json::from_str(payload).map_err(|source| RoutingError::InvalidPayload {
                    topic: topic.to_string(),
                    source,
                })?;

            // Already in destination shape: forward unchanged.
            if let Ok(delta) = serde_json::from_value::<Delta>(parsed.clone()) {
                return Ok(delta);
            }

            let context_fallback = parsed
                .get("context")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(wrap_value(rule, topic, parsed, context_fallback, identity, timestamp))
        }
    }
}

/// ValueOnly scalar resolution; never fails.
fn parse_value_only(text: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return value;
    }
    match text.trim().parse::<f64>() {
        Ok(number) => serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        Err(_) => Value::String(text.to_string()),
    }
}

/// Wrap a value as a single-path delta, resolving context and path from the
/// rule, the payload fallback, or topic derivation, in that order.
fn wrap_value(
    rule: &ImportRule,
    topic: &str,
    value: Value,
    context_fallback: Option<String>,
    identity: &SelfIdentity,
    timestamp: &str,
) -> Delta {
    let (derived_context, derived_path) = derive_context_and_path(topic, identity);

    let context = if !rule.context.is_empty() {
        rule.context.clone()
    } else {
        context_fallback.unwrap_or(derived_context)
    };
    let path = if !rule.path.is_empty() {
        rule.path.clone()
    } else {
        derived_path
    };
    let label = if rule.source_label.is_empty() {
        DEFAULT_SOURCE_LABEL
    } else {
        rule.source_label.as_str()
    };

    Delta::new(context, vec![Update::single(Source::mqtt(label), timestamp, path, value)])
}
