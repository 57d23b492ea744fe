//! Error types for the routing engine

use thiserror::Error;

/// Errors raised while interpreting an inbound message.
///
/// None of these are fatal: every variant degrades to "this message is
/// dropped" at the router.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Full-format payload that is not valid JSON.
    #[error("payload on topic '{topic}' is not valid JSON: {source}")]
    InvalidPayload {
        /// Topic the payload arrived on
        topic: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}
