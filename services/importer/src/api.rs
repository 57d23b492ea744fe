//! HTTP management API
//!
//! JSON endpoints under `/api` for rule administration and status:
//!
//! - `GET  /api/rules` — current rule list plus connection flag
//! - `POST /api/rules` — whole-set replacement; swaps the in-memory rules,
//!   persists them, then triggers a resubscribe. Non-array bodies are
//!   rejected before any state mutation.
//! - `GET  /api/connection` — broker URL, client id, connected flag
//! - `POST /api/connection/test` — connectivity probe
//! - `GET  /api/stats` — rule and dedup counters

use mqtt_routing::{ImportRule, Router};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::mqtt::{ConnectionStatus, ControlCommand};
use crate::store::RuleStore;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct ApiContext {
    pub router: Arc<Router>,
    pub store: Arc<RuleStore>,
    pub status: Arc<ConnectionStatus>,
    pub commands: mpsc::Sender<ControlCommand>,
}

/// Assemble all management routes.
pub fn routes(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let get_rules = warp::path!("api" / "rules")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(get_rules);

    let post_rules = warp::path!("api" / "rules")
        .and(warp::post())
        .and(warp::body::content_length_limit(1024 * 1024))
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(replace_rules);

    let get_connection = warp::path!("api" / "connection")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .and_then(get_connection);

    let test_connection = warp::path!("api" / "connection" / "test")
        .and(warp::post())
        .and(with_ctx(ctx.clone()))
        .and_then(test_connection);

    let get_stats = warp::path!("api" / "stats")
        .and(warp::get())
        .and(with_ctx(ctx))
        .and_then(get_stats);

    get_rules
        .or(post_rules)
        .or(get_connection)
        .or(test_connection)
        .or(get_stats)
}

fn with_ctx(ctx: ApiContext) -> impl Filter<Extract = (ApiContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

async fn get_rules(ctx: ApiContext) -> Result<impl Reply, Infallible> {
    let rules = ctx.router.rule_set();
    Ok(warp::reply::json(&json!({
        "rules": rules.rules(),
        "connected": ctx.status.is_connected(),
    })))
}

async fn replace_rules(body: Value, ctx: ApiContext) -> Result<impl Reply, Infallible> {
    // Reject malformed bodies before touching any state.
    if !body.is_array() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&json!({"error": "rules must be a JSON array"})),
            StatusCode::BAD_REQUEST,
        ));
    }
    let rules: Vec<ImportRule> = match serde_json::from_value(body) {
        Ok(rules) => rules,
        Err(e) => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&json!({"error": format!("invalid rule: {e}")})),
                StatusCode::BAD_REQUEST,
            ));
        }
    };

    info!(count = rules.len(), "replacing rule set");
    ctx.router.replace_rules(rules.clone());

    let persisted = ctx.store.save(&rules);

    // Resubscribe regardless of persistence: the in-memory set is live.
    if let Err(e) = ctx.commands.send(ControlCommand::Resubscribe).await {
        warn!(error = %e, "transport command channel closed, subscriptions not refreshed");
    }

    match persisted {
        Ok(()) => Ok(warp::reply::with_status(
            warp::reply::json(&json!({"success": true, "count": rules.len()})),
            StatusCode::OK,
        )),
        Err(e) => {
            error!(error = %e, "rule persistence failed, in-memory rules still applied");
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({
                    "error": format!("rules applied but not persisted: {e}")
                })),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn get_connection(ctx: ApiContext) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "url": ctx.status.broker_url(),
        "clientId": ctx.status.client_id(),
        "connected": ctx.status.is_connected(),
    })))
}

async fn test_connection(ctx: ApiContext) -> Result<impl Reply, Infallible> {
    if ctx.status.is_connected() {
        Ok(warp::reply::with_status(
            warp::reply::json(&json!({"success": true})),
            StatusCode::OK,
        ))
    } else {
        Ok(warp::reply::with_status(
            warp::reply::json(&json!({"success": false, "error": "not connected to broker"})),
            StatusCode::SERVICE_UNAVAILABLE,
        ))
    }
}

async fn get_stats(ctx: ApiContext) -> Result<impl Reply, Infallible> {
    let stats = ctx.router.stats();
    Ok(warp::reply::json(&json!({
        "totalRules": stats.total_rules,
        "enabledRules": stats.enabled_rules,
        "dedupEntries": stats.dedup_entries,
        "connected": ctx.status.is_connected(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mqtt_routing::{DeltaSink, RuleSet, SinkError};
    use signalk::delta::Delta;
    use signalk::identity::SelfIdentity;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct NullSink;

    #[async_trait]
    impl DeltaSink for NullSink {
        async fn deliver(&self, _delta: Delta) -> Result<(), SinkError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    fn test_ctx(dir: &std::path::Path) -> (ApiContext, mpsc::Receiver<ControlCommand>) {
        let router = Arc::new(Router::new(
            RuleSet::new(vec![ImportRule::new("r1", "vessels/self/#")], ""),
            SelfIdentity::resolved("urn:mrn:imo:mmsi:368396230"),
            Arc::new(NullSink),
        ));
        let (tx, rx) = mpsc::channel(8);
        let ctx = ApiContext {
            router,
            store: Arc::new(RuleStore::new(dir.join("rules.json"))),
            status: Arc::new(ConnectionStatus::new("mqtt://localhost:1883", "test-client")),
            commands: tx,
        };
        (ctx, rx)
    }

    #[tokio::test]
    async fn test_get_rules_returns_current_set() {
        let dir = tempdir().unwrap();
        let (ctx, _rx) = test_ctx(dir.path());

        let response = warp::test::request()
            .method("GET")
            .path("/api/rules")
            .reply(&routes(ctx))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["rules"][0]["id"], "r1");
        assert_eq!(body["connected"], false);
    }

    #[tokio::test]
    async fn test_post_rules_swaps_persists_and_resubscribes() {
        let dir = tempdir().unwrap();
        let (ctx, mut rx) = test_ctx(dir.path());
        let router = ctx.router.clone();
        let store = ctx.store.clone();

        let response = warp::test::request()
            .method("POST")
            .path("/api/rules")
            .json(&json!([{"id": "new", "topicPattern": "sensors/#"}]))
            .reply(&routes(ctx))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(router.rule_set().rules()[0].id, "new");
        assert_eq!(store.load().unwrap()[0].id, "new");
        assert_eq!(rx.try_recv().unwrap(), ControlCommand::Resubscribe);
    }

    #[tokio::test]
    async fn test_post_rules_rejects_non_array() {
        let dir = tempdir().unwrap();
        let (ctx, _rx) = test_ctx(dir.path());
        let router = ctx.router.clone();

        let response = warp::test::request()
            .method("POST")
            .path("/api/rules")
            .json(&json!({"id": "not-an-array"}))
            .reply(&routes(ctx))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // State untouched.
        assert_eq!(router.rule_set().rules()[0].id, "r1");
    }

    #[tokio::test]
    async fn test_connection_status_and_probe() {
        let dir = tempdir().unwrap();
        let (ctx, _rx) = test_ctx(dir.path());
        let filter = routes(ctx);

        let response = warp::test::request()
            .method("GET")
            .path("/api/connection")
            .reply(&filter)
            .await;
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["url"], "mqtt://localhost:1883");
        assert_eq!(body["clientId"], "test-client");
        assert_eq!(body["connected"], false);

        // Probe fails while disconnected.
        let response = warp::test::request()
            .method("POST")
            .path("/api/connection/test")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let dir = tempdir().unwrap();
        let (ctx, _rx) = test_ctx(dir.path());

        let response = warp::test::request()
            .method("GET")
            .path("/api/stats")
            .reply(&routes(ctx))
            .await;

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["totalRules"], 1);
        assert_eq!(body["enabledRules"], 1);
        assert_eq!(body["dedupEntries"], 0);
        assert_eq!(body["connected"], false);
    }
}
