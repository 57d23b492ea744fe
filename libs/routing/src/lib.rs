//! # MQTT Routing Engine
//!
//! Rule-based routing and normalization of MQTT messages into Signal K
//! deltas. This crate holds the whole decision pipeline and none of the I/O:
//!
//! ```text
//! (topic, payload) → RuleSet (pattern match + exclusion)
//!                  → DedupCache (flood suppression)
//!                  → payload interpretation (context/path derivation)
//!                  → Delta → DeltaSink
//! ```
//!
//! - [`rule::ImportRule`] — one user-authored routing rule; rules live in an
//!   ordered list where the first enabled, matching, non-excluded rule wins.
//! - [`pattern`] — MQTT wildcard matching that treats the canonical and
//!   transport encodings of a vessel URN as equivalent, and understands the
//!   `self` placeholder segment.
//! - [`rules::RuleSet`] — the ordered rule list plus the broker topic prefix;
//!   also computes the subscription set for the transport.
//! - [`payload`] — turns a raw payload plus its matched rule into a delta.
//! - [`dedup::DedupCache`] — bounded (topic, payload) recency store.
//! - [`router::Router`] — wires the above together per inbound message and
//!   hands the result to a [`sink::DeltaSink`].
//!
//! Everything here is synchronous pure computation except the final sink
//! delivery; no function blocks on I/O.

pub mod dedup;
pub mod derive;
pub mod error;
pub mod pattern;
pub mod payload;
pub mod router;
pub mod rule;
pub mod rules;
pub mod sink;

pub use dedup::DedupCache;
pub use error::RoutingError;
pub use router::{Outcome, Router, RouterStats};
pub use rule::{ImportRule, PayloadFormat};
pub use rules::RuleSet;
pub use sink::{DeltaSink, SinkError};

/// Result type alias for routing operations.
pub type Result<T> = std::result::Result<T, RoutingError>;
