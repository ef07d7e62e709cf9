use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::wire::{self, OutboundEvent};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Drop and delivery counters. Dropped events are visible here, not only
/// in the logs.
#[derive(Debug, Default)]
pub struct ForwarderMetrics {
    connect_attempts: AtomicU64,
    events_sent: AtomicU64,
    dropped_disconnected: AtomicU64,
    dropped_filtered: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_queue_full: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        pub(crate) fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl ForwarderMetrics {
    counter!(inc_connect_attempts, connect_attempts, connect_attempts);
    counter!(inc_events_sent, events_sent, events_sent);
    counter!(inc_dropped_disconnected, dropped_disconnected, dropped_disconnected);
    counter!(inc_dropped_filtered, dropped_filtered, dropped_filtered);
    counter!(inc_dropped_malformed, dropped_malformed, dropped_malformed);
    counter!(inc_dropped_queue_full, dropped_queue_full, dropped_queue_full);
}

enum PumpEnd {
    Shutdown,
    ConnectionLost,
}

/// The single task owning the connection. It is the only writer of the
/// connection state and the only holder of the socket, so state
/// transitions cannot race with senders.
pub(crate) struct SenderTask {
    url: String,
    sensor: String,
    reconnect_delay: Duration,
    rx: mpsc::Receiver<OutboundEvent>,
    state: watch::Sender<ConnectionState>,
    metrics: Arc<ForwarderMetrics>,
    shutdown: CancellationToken,
}

impl SenderTask {
    pub(crate) fn new(
        url: String,
        sensor: String,
        reconnect_delay: Duration,
        rx: mpsc::Receiver<OutboundEvent>,
        state: watch::Sender<ConnectionState>,
        metrics: Arc<ForwarderMetrics>,
        shutdown: CancellationToken,
    ) -> Self {
        SenderTask {
            url,
            sensor,
            reconnect_delay,
            rx,
            state,
            metrics,
            shutdown,
        }
    }

    /// Connect-retry loop: a failed handshake or a lost connection retries
    /// at a fixed interval, forever, until shutdown.
    pub(crate) async fn run(mut self) {
        loop {
            let shutdown = self.shutdown.clone();
            let connected = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.establish() => result,
            };

            match connected {
                Ok(socket) => {
                    info!("connected to {}", self.url);
                    self.state.send_replace(ConnectionState::Connected);
                    match self.pump(socket).await {
                        PumpEnd::Shutdown => break,
                        PumpEnd::ConnectionLost => {
                            self.state.send_replace(ConnectionState::Disconnected);
                        }
                    }
                }
                Err(e) => {
                    warn!("connection to {} failed: {e:#}", self.url);
                    self.state.send_replace(ConnectionState::Disconnected);
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.state.send_replace(ConnectionState::Disconnected);
    }

    async fn establish(&mut self) -> Result<Socket> {
        self.state.send_replace(ConnectionState::Connecting);
        self.metrics.inc_connect_attempts();

        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .context("websocket handshake failed")?;
        socket
            .send(Message::Text(wire::auth_frame(&self.sensor)))
            .await
            .context("failed to send auth frame")?;

        Ok(socket)
    }

    /// Drains the queue onto the socket, in order. A send error drops the
    /// in-flight event and returns to the connect-retry loop; there is no
    /// per-event retry.
    async fn pump(&mut self, mut socket: Socket) -> PumpEnd {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if let Err(e) = socket.close(None).await {
                        warn!("error closing connection: {e}");
                    }
                    return PumpEnd::Shutdown;
                }
                inbound = socket.next() => {
                    match inbound {
                        Some(Ok(Message::Close(_))) | None => {
                            info!("backend closed the connection");
                            return PumpEnd::ConnectionLost;
                        }
                        Some(Ok(_)) => {} // no ack processing
                        Some(Err(e)) => {
                            warn!("connection error: {e}");
                            return PumpEnd::ConnectionLost;
                        }
                    }
                }
                maybe = self.rx.recv() => {
                    let Some(event) = maybe else {
                        // all senders dropped without stop()
                        if let Err(e) = socket.close(None).await {
                            warn!("error closing connection: {e}");
                        }
                        return PumpEnd::Shutdown;
                    };
                    let frame = wire::event_frame(&event);
                    if let Err(e) = socket.send(Message::Text(frame)).await {
                        error!("failed to send event {}: {e}", event.topic);
                        return PumpEnd::ConnectionLost;
                    }
                    self.metrics.inc_events_sent();
                    debug!("sent event {}", event.topic);
                }
            }
        }
    }
}
