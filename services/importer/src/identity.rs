//! Self-identity resolution at startup
//!
//! The gateway needs to know its own vessel URN to expand `self` patterns
//! and to scope derived contexts. An explicitly configured URN wins;
//! otherwise the Signal K server is asked once. Resolution failure is a
//! supported degraded state, never an error.

use signalk::identity::SelfIdentity;
use tracing::{info, warn};

use crate::config::SignalkConfig;

/// Resolve the process's own vessel identity, once, at startup.
pub async fn resolve_self_identity(config: &SignalkConfig) -> SelfIdentity {
    if let Some(urn) = &config.self_urn {
        info!(urn = %urn, "self identity from configuration");
        return SelfIdentity::resolved(urn);
    }

    if let Some(server_url) = &config.server_url {
        match fetch_self_urn(server_url).await {
            Ok(urn) => {
                info!(urn = %urn, server_url = %server_url, "self identity resolved from server");
                return SelfIdentity::resolved(urn);
            }
            Err(e) => {
                warn!(server_url = %server_url, error = %e, "could not resolve self identity, self matching disabled");
            }
        }
    } else {
        warn!("no self identity source configured, self matching disabled");
    }

    SelfIdentity::unresolved()
}

/// GET the server's self identifier.
///
/// The endpoint returns a JSON string, either `"vessels.<urn>"` or the bare
/// URN depending on server version.
async fn fetch_self_urn(server_url: &str) -> anyhow::Result<String> {
    let url = format!("{}/signalk/v1/api/self", server_url.trim_end_matches('/'));
    let text = reqwest::get(&url)
        .await?
        .error_for_status()?
        .text()
        .await?;

    let token = serde_json::from_str::<String>(&text).unwrap_or_else(|_| text.trim().to_string());
    Ok(token
        .strip_prefix("vessels.")
        .unwrap_or(token.as_str())
        .to_string())
}
