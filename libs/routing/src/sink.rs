//! Delta sink abstraction
//!
//! A destination for normalized deltas that abstracts away connection
//! details. The engine calls it once per successfully interpreted message;
//! delivery failures are reported but never corrupt engine state.

use async_trait::async_trait;
use signalk::delta::Delta;
use std::fmt::Debug;
use thiserror::Error;

/// Errors surfaced by a delta sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink has no live connection and could not establish one.
    #[error("sink not connected: {0}")]
    NotConnected(String),

    /// Transport failure while writing.
    #[error("sink I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Delta could not be serialized for the wire.
    #[error("failed to serialize delta: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A destination for normalized deltas.
#[async_trait]
pub trait DeltaSink: Send + Sync + Debug {
    /// Deliver a single delta.
    async fn deliver(&self, delta: Delta) -> Result<(), SinkError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;
}
