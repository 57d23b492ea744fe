//! Persisted rule store
//!
//! One JSON file holding the rule array exactly as the management API
//! accepts it. Saves are whole-set replacements written to a temp file and
//! renamed into place. A missing file on first run is seeded with the
//! default rule set.

use mqtt_routing::{ImportRule, PayloadFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ImporterError, Result};

/// File-backed rule persistence.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

/// The rule set seeded on first run: the vessel's own core data groups
/// enabled, plus a broad all-vessels subscription left disabled.
pub fn default_rules() -> Vec<ImportRule> {
    let self_rule = |id: &str, group: &str| ImportRule {
        id: id.to_string(),
        name: format!("Own vessel {group}"),
        topic_pattern: format!("vessels/self/{group}/#"),
        source_label: "mqtt".to_string(),
        ignore_duplicates: true,
        ..ImportRule::default()
    };

    vec![
        self_rule("self-navigation", "navigation"),
        self_rule("self-electrical", "electrical"),
        self_rule("self-propulsion", "propulsion"),
        self_rule("self-environment", "environment"),
        ImportRule {
            id: "all-vessels".to_string(),
            name: "All vessels".to_string(),
            topic_pattern: "vessels/#".to_string(),
            source_label: "mqtt".to_string(),
            payload_format: PayloadFormat::ValueOnly,
            enabled: false,
            ..ImportRule::default()
        },
    ]
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted rules, seeding and persisting the defaults when
    /// no file exists yet.
    pub fn load(&self) -> Result<Vec<ImportRule>> {
        if !self.path.exists() {
            let rules = default_rules();
            info!(path = %self.path.display(), "no rule file found, seeding defaults");
            self.save(&rules)?;
            return Ok(rules);
        }

        let text = fs::read_to_string(&self.path).map_err(|source| ImporterError::Store {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Persist the whole rule set, replacing the previous file atomically.
    pub fn save(&self, rules: &[ImportRule]) -> Result<()> {
        let io_err = |source| ImporterError::Store {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let text = serde_json::to_string_pretty(rules)?;
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, text).map_err(io_err)?;
        fs::rename(&temp, &self.path).map_err(io_err)?;
        Ok(())
    }
}
