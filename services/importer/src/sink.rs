//! TCP delta sink
//!
//! Writes normalized deltas to a Signal K server's TCP interface as
//! newline-delimited JSON. The connection is established lazily on first
//! delivery and re-established with bounded backoff after a write failure;
//! a delivery that exhausts its attempts reports the failure and leaves the
//! next delivery to try again.

use async_trait::async_trait;
use mqtt_routing::{DeltaSink, SinkError};
use signalk::delta::Delta;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

const MAX_CONNECT_ATTEMPTS: u32 = 5;
const BASE_DELAY_MS: u64 = 100;
const MAX_DELAY_MS: u64 = 5000;

/// Newline-delimited JSON delta output over TCP.
#[derive(Debug)]
pub struct TcpDeltaSink {
    address: String,
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
    deltas_sent: AtomicU64,
}

impl TcpDeltaSink {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
            deltas_sent: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Total deltas successfully written.
    pub fn deltas_sent(&self) -> u64 {
        self.deltas_sent.load(Ordering::Relaxed)
    }

    async fn connect_with_retry(&self) -> Result<TcpStream, SinkError> {
        let mut delay = BASE_DELAY_MS;
        let mut last_error = String::new();

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            match TcpStream::connect(&self.address).await {
                Ok(stream) => {
                    info!(address = %self.address, attempt, "connected to delta sink");
                    self.connected.store(true, Ordering::Relaxed);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(address = %self.address, attempt, error = %e, "sink connect failed");
                    last_error = e.to_string();
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_DELAY_MS);
                }
            }
        }

        self.connected.store(false, Ordering::Relaxed);
        Err(SinkError::NotConnected(format!(
            "{} after {MAX_CONNECT_ATTEMPTS} attempts: {last_error}",
            self.address
        )))
    }
}

#[async_trait]
impl DeltaSink for TcpDeltaSink {
    async fn deliver(&self, delta: Delta) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&delta)?;
        line.push(b'\n');

        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_with_retry().await?);
        }

        // Guard is Some here; a write failure drops the stream so the next
        // delivery reconnects.
        if let Some(stream) = guard.as_mut() {
            if let Err(e) = stream.write_all(&line).await {
                warn!(address = %self.address, error = %e, "sink write failed, dropping connection");
                *guard = None;
                self.connected.store(false, Ordering::Relaxed);
                return Err(SinkError::Io(e));
            }
        }

        self.deltas_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
