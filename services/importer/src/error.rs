//! Error types for the importer service

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for importer operations.
pub type Result<T> = std::result::Result<T, ImporterError>;

/// Main error type for the importer service.
#[derive(Debug, Error)]
pub enum ImporterError {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Rule store read or write failure.
    #[error("rule store failure at {path}: {source}")]
    Store {
        /// File the store operates on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Persisted or submitted rules that do not decode.
    #[error("invalid rule data: {0}")]
    InvalidRules(#[from] serde_json::Error),

    /// MQTT client request failure (subscribe/unsubscribe).
    #[error("mqtt client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
}
