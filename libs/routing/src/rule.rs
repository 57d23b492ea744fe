//! Import rule definition
//!
//! Rules are authored through the management API, persisted as a JSON array
//! and evaluated in stored order. Every field carries a serde default so an
//! API body may omit anything but the pattern.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a matched message's payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadFormat {
    /// Payload may already be a full delta; anything else is wrapped as a
    /// single value.
    Full,
    /// Payload is a bare value: JSON if it parses, else number, else text.
    #[default]
    ValueOnly,
}

/// One user-defined routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRule {
    /// Opaque stable id, unique within the rule set.
    #[serde(default)]
    pub id: String,

    /// Display label; no uniqueness constraint.
    #[serde(default)]
    pub name: String,

    /// MQTT subscription filter; may contain `+`, a trailing `#`, and the
    /// literal `self` placeholder segment.
    #[serde(default)]
    pub topic_pattern: String,

    /// Destination context override; empty means "derive from topic".
    #[serde(default)]
    pub context: String,

    /// Destination path override; empty means "derive from topic".
    #[serde(default)]
    pub path: String,

    /// Source label attached to produced updates; empty falls back to a
    /// generic label.
    #[serde(default)]
    pub source_label: String,

    #[serde(default)]
    pub payload_format: PayloadFormat,

    /// Suppress repeated identical (topic, payload) pairs for this rule.
    #[serde(default)]
    pub ignore_duplicates: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// MMSIs to skip even when the pattern matches; the scan continues with
    /// later rules.
    #[serde(default)]
    pub excluded_mmsis: HashSet<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ImportRule {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            topic_pattern: String::new(),
            context: String::new(),
            path: String::new(),
            source_label: String::new(),
            payload_format: PayloadFormat::default(),
            ignore_duplicates: false,
            enabled: true,
            excluded_mmsis: HashSet::new(),
        }
    }
}

impl ImportRule {
    /// Minimal enabled ValueOnly rule for the given pattern.
    pub fn new(id: impl Into<String>, topic_pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic_pattern: topic_pattern.into(),
            ..Self::default()
        }
    }
}
