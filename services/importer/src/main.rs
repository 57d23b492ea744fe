//! Signal K MQTT importer binary
//!
//! Wires configuration, rule store, self identity, router, broker transport
//! and management API together and runs until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use importer_service::api::{self, ApiContext};
use importer_service::config::ImporterConfig;
use importer_service::identity::resolve_self_identity;
use importer_service::mqtt::{ConnectionStatus, MqttTransport};
use importer_service::sink::TcpDeltaSink;
use importer_service::store::RuleStore;
use mqtt_routing::{Router, RuleSet};

#[derive(Debug, Parser)]
#[command(name = "mqtt-importer", about = "MQTT to Signal K import gateway")]
struct Args {
    /// TOML configuration file; environment variables are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter override (e.g. "debug", "importer_service=trace").
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ImporterConfig::load(args.config.as_deref()).context("loading configuration")?;
    config.validate().context("validating configuration")?;

    let store = Arc::new(RuleStore::new(config.rules_file.clone()));
    let rules = match &config.initial_rules {
        Some(initial) => {
            // Legacy inline rules supersede the store and are written
            // through to it.
            store
                .save(initial)
                .context("migrating inline rules to the rule store")?;
            info!(count = initial.len(), "adopted inline rule configuration");
            initial.clone()
        }
        None => store.load().context("loading rule store")?,
    };
    info!(
        total = rules.len(),
        enabled = rules.iter().filter(|r| r.enabled).count(),
        path = %store.path().display(),
        "rule set loaded"
    );

    let identity = resolve_self_identity(&config.signalk).await;

    let sink = Arc::new(TcpDeltaSink::new(config.signalk.sink_address.clone()));
    info!(address = %sink.address(), "delta sink configured");

    let router = Arc::new(Router::new(
        RuleSet::new(rules, config.topic_prefix.clone()),
        identity,
        sink,
    ));

    let status = Arc::new(ConnectionStatus::new(
        config.mqtt.broker_url(),
        config.mqtt.client_id.clone(),
    ));
    let (commands_tx, commands_rx) = mpsc::channel(16);

    let transport = MqttTransport::new(
        config.mqtt.clone(),
        router.clone(),
        status.clone(),
        commands_rx,
    );
    let transport_handle = tokio::spawn(transport.run());

    let api_addr: SocketAddr = format!("{}:{}", config.http.bind_address, config.http.port)
        .parse()
        .context("invalid management API bind address")?;
    let ctx = ApiContext {
        router,
        store,
        status,
        commands: commands_tx,
    };
    info!(address = %api_addr, "management API listening");
    let api_handle = tokio::spawn(warp::serve(api::routes(ctx)).run(api_addr));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
        result = transport_handle => {
            error!(?result, "mqtt transport task ended unexpectedly");
        }
        result = api_handle => {
            error!(?result, "management API task ended unexpectedly");
        }
    }

    Ok(())
}
