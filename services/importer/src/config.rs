//! Configuration for the importer service
//!
//! Loads from a TOML file when one is given, otherwise from environment
//! variables with sensible defaults, in the style of the adapter services.
//! Every section has a `Default` and the TOML side uses serde defaults, so a
//! partial file is fine.

use mqtt_routing::ImportRule;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{ImporterError, Result};

/// Main importer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// Broker connection settings.
    pub mqtt: MqttConfig,

    /// Management API settings.
    pub http: HttpConfig,

    /// Signal K side: identity source and delta sink.
    pub signalk: SignalkConfig,

    /// Path of the persisted rule file.
    pub rules_file: PathBuf,

    /// Prefix applied to every rule pattern before matching and
    /// subscribing; empty for none.
    pub topic_prefix: String,

    /// Legacy inline rule list. When present it supersedes the persisted
    /// store at startup and is written through to it.
    pub initial_rules: Option<Vec<ImportRule>>,
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay_secs: u64,
}

/// Management API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Signal K server coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalkConfig {
    /// Own vessel URN; set this to skip resolution against the server.
    pub self_urn: Option<String>,

    /// Base URL of a Signal K server used to resolve the self identity
    /// (e.g. `http://localhost:3000`).
    pub server_url: Option<String>,

    /// TCP address deltas are written to, newline-delimited JSON.
    pub sink_address: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: format!("mqtt-importer-{}", Uuid::new_v4().simple()),
            username: None,
            password: None,
            keep_alive_secs: 30,
            reconnect_delay_secs: 5,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8181,
        }
    }
}

impl Default for SignalkConfig {
    fn default() -> Self {
        Self {
            self_urn: None,
            server_url: None,
            sink_address: "127.0.0.1:8375".to_string(),
        }
    }
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            http: HttpConfig::default(),
            signalk: SignalkConfig::default(),
            rules_file: PathBuf::from("import-rules.json"),
            topic_prefix: String::new(),
            initial_rules: None,
        }
    }
}

impl MqttConfig {
    /// Broker URL for status reporting.
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.host, self.port)
    }
}

impl ImporterConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            mqtt: MqttConfig {
                host: env::var("SK_MQTT_HOST").unwrap_or(defaults.mqtt.host),
                port: env_parse("SK_MQTT_PORT", defaults.mqtt.port),
                client_id: env::var("SK_MQTT_CLIENT_ID").unwrap_or(defaults.mqtt.client_id),
                username: env::var("SK_MQTT_USERNAME").ok(),
                password: env::var("SK_MQTT_PASSWORD").ok(),
                keep_alive_secs: env_parse("SK_MQTT_KEEP_ALIVE_SECS", defaults.mqtt.keep_alive_secs),
                reconnect_delay_secs: env_parse(
                    "SK_MQTT_RECONNECT_DELAY_SECS",
                    defaults.mqtt.reconnect_delay_secs,
                ),
            },
            http: HttpConfig {
                bind_address: env::var("SK_MQTT_HTTP_BIND").unwrap_or(defaults.http.bind_address),
                port: env_parse("SK_MQTT_HTTP_PORT", defaults.http.port),
            },
            signalk: SignalkConfig {
                self_urn: env::var("SK_MQTT_SELF_URN").ok(),
                server_url: env::var("SK_MQTT_SERVER_URL").ok(),
                sink_address: env::var("SK_MQTT_SINK_ADDRESS")
                    .unwrap_or(defaults.signalk.sink_address),
            },
            rules_file: env::var("SK_MQTT_RULES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.rules_file),
            topic_prefix: env::var("SK_MQTT_TOPIC_PREFIX").unwrap_or(defaults.topic_prefix),
            initial_rules: None,
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ImporterError::Store {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text)
            .map_err(|e| ImporterError::Configuration(format!("invalid config file: {e}")))
    }

    /// File when given, environment otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::from_env()),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            return Err(ImporterError::Configuration(
                "mqtt host cannot be empty".to_string(),
            ));
        }
        if self.mqtt.port == 0 {
            return Err(ImporterError::Configuration(
                "mqtt port cannot be zero".to_string(),
            ));
        }
        if self.http.port == 0 {
            return Err(ImporterError::Configuration(
                "http port cannot be zero".to_string(),
            ));
        }
        if self.rules_file.as_os_str().is_empty() {
            return Err(ImporterError::Configuration(
                "rules file path cannot be empty".to_string(),
            ));
        }
        if !self.signalk.sink_address.contains(':') {
            return Err(ImporterError::Configuration(
                "sink address must be host:port".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
