//! # Signal K MQTT Importer Service
//!
//! Thin I/O plumbing around the [`mqtt_routing`] engine:
//!
//! - [`config`] — environment and TOML configuration with validation.
//! - [`store`] — the persisted rule file, seeded with defaults on first run.
//! - [`identity`] — one-shot self-identity resolution at startup.
//! - [`mqtt`] — broker transport: rumqttc event loop, fixed-interval
//!   reconnect, resubscribe-all on rule changes.
//! - [`api`] — HTTP management API (rules, connection status, statistics).
//! - [`sink`] — newline-delimited JSON delta delivery over TCP.
//!
//! The binary (`mqtt-importer`) wires these together and runs until
//! interrupted. All failures degrade to dropped messages or failed API
//! calls; nothing in here is fatal to the process once startup succeeds.

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod mqtt;
pub mod sink;
pub mod store;

pub use config::ImporterConfig;
pub use error::{ImporterError, Result};
