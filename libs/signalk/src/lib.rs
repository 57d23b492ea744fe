//! # Signal K Core Types
//!
//! Data model and identity primitives shared by the MQTT import gateway:
//!
//! - **Delta model**: [`Delta`], [`Update`], [`Source`], [`PathValue`] — the
//!   update format accepted by a Signal K server, serialized with the wire
//!   field names (camelCase, `source.type`).
//! - **Vessel URN codec**: conversion between the colon-delimited canonical
//!   form (`urn:mrn:imo:mmsi:368396230`) and the underscore-delimited
//!   transport form used inside MQTT topic segments, plus MMSI extraction.
//! - **Self identity**: the process's own vessel URN, resolved once at
//!   startup, with encoding-agnostic matching.
//!
//! This crate is intentionally runtime-agnostic and contains no async code
//! and no I/O; everything here is pure computation over in-memory values.

pub mod delta;
pub mod identity;

pub use delta::{vessel_context, Delta, PathValue, Source, Update, SELF_CONTEXT};
pub use identity::{
    extract_mmsi, is_transport_urn, to_canonical_form, to_transport_form, SelfIdentity,
};
