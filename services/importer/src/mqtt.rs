//! MQTT broker transport
//!
//! Runs the rumqttc event loop, feeding every publish through the router
//! one message at a time. Connection loss is retried indefinitely with a
//! fixed delay; every successful (re)connect re-applies the full
//! subscription set. Rule changes arrive as a [`ControlCommand::Resubscribe`]
//! and swap subscriptions with an unsubscribe-all / subscribe-all pass
//! rather than incremental diffing.

use mqtt_routing::Router;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;

/// Commands the management API sends to the transport task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Rule set changed: drop all active subscriptions and subscribe the
    /// freshly computed set.
    Resubscribe,
}

/// Broker connection state shared with the management API.
#[derive(Debug)]
pub struct ConnectionStatus {
    connected: AtomicBool,
    broker_url: String,
    client_id: String,
}

impl ConnectionStatus {
    pub fn new(broker_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            connected: AtomicBool::new(false),
            broker_url: broker_url.into(),
            client_id: client_id.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn broker_url(&self) -> &str {
        &self.broker_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// The broker transport task.
pub struct MqttTransport {
    config: MqttConfig,
    router: Arc<Router>,
    status: Arc<ConnectionStatus>,
    commands: mpsc::Receiver<ControlCommand>,
}

impl MqttTransport {
    pub fn new(
        config: MqttConfig,
        router: Arc<Router>,
        status: Arc<ConnectionStatus>,
        commands: mpsc::Receiver<ControlCommand>,
    ) -> Self {
        Self {
            config,
            router,
            status,
            commands,
        }
    }

    /// Run the transport until the process shuts down.
    pub async fn run(self) {
        let MqttTransport {
            config,
            router,
            status,
            mut commands,
        } = self;

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut event_loop) = AsyncClient::new(options, 100);
        let reconnect_delay = Duration::from_secs(config.reconnect_delay_secs.max(1));
        let mut active_subscriptions: Vec<String> = Vec::new();

        info!(broker = %status.broker_url(), client_id = %status.client_id(), "starting mqtt transport");

        loop {
            tokio::select! {
                event = event_loop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(broker = %status.broker_url(), "connected to broker");
                        status.set_connected(true);
                        active_subscriptions.clear();
                        subscribe_all(&router, &client, &mut active_subscriptions).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        // One message to completion before the next poll.
                        router.handle_message(&publish.topic, &publish.payload).await;
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        warn!("broker sent disconnect");
                        status.set_connected(false);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        status.set_connected(false);
                        warn!(error = %e, delay_secs = reconnect_delay.as_secs(), "mqtt connection lost, retrying");
                        tokio::time::sleep(reconnect_delay).await;
                    }
                },
                Some(command) = commands.recv() => match command {
                    ControlCommand::Resubscribe => {
                        unsubscribe_all(&client, &mut active_subscriptions).await;
                        subscribe_all(&router, &client, &mut active_subscriptions).await;
                    }
                },
            }
        }
    }
}

async fn subscribe_all(router: &Router, client: &AsyncClient, active: &mut Vec<String>) {
    for topic in router.subscription_topics() {
        match client.subscribe(&topic, QoS::AtLeastOnce).await {
            Ok(()) => {
                debug!(topic = %topic, "subscribed");
                active.push(topic);
            }
            Err(e) => warn!(topic = %topic, error = %e, "subscribe failed"),
        }
    }
    info!(count = active.len(), "subscriptions applied");
}

async fn unsubscribe_all(client: &AsyncClient, active: &mut Vec<String>) {
    for topic in active.drain(..) {
        if let Err(e) = client.unsubscribe(&topic).await {
            warn!(topic = %topic, error = %e, "unsubscribe failed");
        }
    }
}
