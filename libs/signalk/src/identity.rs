//! Vessel URN codec and self-identity resolution
//!
//! A vessel is identified by a canonical URN such as
//! `urn:mrn:imo:mmsi:368396230`. MQTT topic segments cannot safely carry the
//! `:` delimiter, so the same identifier also travels in a transport form
//! with every colon replaced by an underscore
//! (`urn_mrn_imo_mmsi_368396230`). The codec here converts between the two
//! and extracts the trailing MMSI digit run.

use once_cell::sync::Lazy;
use regex::Regex;

/// Structural prefix of a transport-form vessel URN.
const TRANSPORT_URN_PREFIX: &str = "urn_";

/// Anchored matcher for a vessel URN in either delimiter form, capturing the
/// trailing MMSI digits.
static MMSI_URN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^urn[:_]mrn[:_]imo[:_]mmsi[:_](\d+)$").expect("static pattern"));

/// Rewrite a canonical identifier into its transport form (`:` → `_`).
///
/// Identity on input containing no colon.
pub fn to_transport_form(id: &str) -> String {
    id.replace(':', "_")
}

/// Rewrite a transport-form token back to canonical (`_` → `:`).
///
/// Lossy on arbitrary tokens: any underscore that is not an identifier
/// delimiter gets rewritten too. Gate calls on [`is_transport_urn`].
pub fn to_canonical_form(token: &str) -> String {
    token.replace('_', ":")
}

/// Structural check: does this token look like a transport-form vessel URN?
pub fn is_transport_urn(token: &str) -> bool {
    token.starts_with(TRANSPORT_URN_PREFIX)
}

/// Extract the MMSI digit run from a vessel URN in either delimiter form.
///
/// Returns `None` when the token is not a well-formed MMSI URN.
pub fn extract_mmsi(token: &str) -> Option<&str> {
    MMSI_URN
        .captures(token)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The process's own vessel identity.
///
/// Resolved once at startup from an external source and never mutated
/// afterwards. An unresolved identity is a supported state: matching then
/// always fails instead of erroring.
#[derive(Debug, Clone, Default)]
pub struct SelfIdentity {
    canonical: Option<String>,
}

impl SelfIdentity {
    /// Identity resolved to the given canonical URN.
    pub fn resolved(urn: impl Into<String>) -> Self {
        Self {
            canonical: Some(urn.into()),
        }
    }

    /// Identity that could not be resolved at startup.
    pub fn unresolved() -> Self {
        Self { canonical: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.canonical.is_some()
    }

    /// Canonical (colon-delimited) form, when resolved.
    pub fn canonical(&self) -> Option<&str> {
        self.canonical.as_deref()
    }

    /// Transport (underscore-delimited) form, when resolved.
    pub fn transport(&self) -> Option<String> {
        self.canonical.as_deref().map(to_transport_form)
    }

    /// Own MMSI, when resolved to an MMSI-shaped URN.
    pub fn mmsi(&self) -> Option<&str> {
        self.canonical.as_deref().and_then(extract_mmsi)
    }

    /// Does this token denote this vessel, in either encoding?
    ///
    /// Always `false` when unresolved.
    pub fn matches(&self, token: &str) -> bool {
        match self.canonical.as_deref() {
            Some(canonical) => token == canonical || token == to_transport_form(canonical),
            None => false,
        }
    }
}
