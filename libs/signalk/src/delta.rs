//! Signal K delta update model
//!
//! A delta addresses a context (a vessel scope) and carries one or more
//! timestamped updates, each a list of path/value pairs. Field names follow
//! the Signal K wire format, so these types serialize directly into the JSON
//! a server accepts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context addressing the importing vessel itself.
pub const SELF_CONTEXT: &str = "vessels.self";

/// Source type tag attached to every update produced by the gateway.
pub const SOURCE_TYPE_MQTT: &str = "mqtt";

/// Build the context string addressing a specific vessel by canonical URN.
pub fn vessel_context(urn: &str) -> String {
    format!("vessels.{urn}")
}

/// A complete delta message: one context plus its updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    pub context: String,
    pub updates: Vec<Update>,
}

/// One timestamped batch of values from a single source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub source: Source,
    /// ISO-8601 / RFC 3339 instant.
    pub timestamp: String,
    pub values: Vec<PathValue>,
}

/// Provenance of an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A single dotted-path/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathValue {
    pub path: String,
    pub value: Value,
}

impl Source {
    /// MQTT-attributed source with the given label.
    pub fn mqtt(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: SOURCE_TYPE_MQTT.to_string(),
        }
    }
}

impl Update {
    /// Update carrying a single path/value pair.
    pub fn single(
        source: Source,
        timestamp: impl Into<String>,
        path: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            source,
            timestamp: timestamp.into(),
            values: vec![PathValue {
                path: path.into(),
                value,
            }],
        }
    }
}

impl Delta {
    pub fn new(context: impl Into<String>, updates: Vec<Update>) -> Self {
        Self {
            context: context.into(),
            updates,
        }
    }

    /// Whether this delta is complete enough to hand to a sink: a non-empty
    /// context and at least one update with at least one value.
    pub fn is_deliverable(&self) -> bool {
        !self.context.is_empty()
            && !self.updates.is_empty()
            && self.updates.iter().all(|u| !u.values.is_empty())
    }
}
