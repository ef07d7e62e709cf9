use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hivewire_common::event::{event_id, EventFilter, EventRecord};

use crate::config_manager::Config;
use crate::connection::{ConnectionState, ForwarderMetrics, SenderTask};
use crate::wire::OutboundEvent;

/// Forwards qualifying honeypot events to the messaging backend.
///
/// `write()` is non-blocking and total: events are filtered, reshaped and
/// enqueued onto a bounded queue drained by a single sender task, which
/// also owns the connection state. Anything that cannot be forwarded is
/// dropped with a log line and a metric, never an error to the caller.
pub struct EventForwarder {
    filter: EventFilter,
    tx: mpsc::Sender<OutboundEvent>,
    state: watch::Receiver<ConnectionState>,
    metrics: Arc<ForwarderMetrics>,
    shutdown: CancellationToken,
    sender_handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventForwarder {
    /// Spawns the connection actor and returns immediately; the caller is
    /// never stalled by network latency, and connect failures are retried
    /// in the background.
    pub fn start(config: Config) -> Self {
        info!("connecting to {}", config.url);

        let filter = EventFilter::new(config.allowed_events, config.forward_fields);
        let (tx, rx) = mpsc::channel::<OutboundEvent>(config.queue_capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let metrics = Arc::new(ForwarderMetrics::default());
        let shutdown = CancellationToken::new();

        let task = SenderTask::new(
            config.url,
            config.sensor,
            Duration::from_millis(config.reconnect_delay_ms),
            rx,
            state_tx,
            metrics.clone(),
            shutdown.clone(),
        );
        let handle = tokio::spawn(task.run());

        EventForwarder {
            filter,
            tx,
            state: state_rx,
            metrics,
            shutdown,
            sender_handle: Mutex::new(Some(handle)),
        }
    }

    /// Accepts one event from the host framework. Never blocks, never
    /// fails outward. The event is borrowed for the duration of the call
    /// only.
    pub fn write(&self, event: &EventRecord) {
        if *self.state.borrow() != ConnectionState::Connected {
            debug!(
                "not connected, dropping event {}",
                event_id(event).unwrap_or("unknown")
            );
            self.metrics.inc_dropped_disconnected();
            return;
        }

        if !self.filter.accepts(event) {
            self.metrics.inc_dropped_filtered();
            return;
        }

        // accepts() guarantees a string eventid
        let topic = event_id(event).unwrap_or_default().to_string();

        let payload = match self.filter.reshape(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("dropping event {topic}: {e:#}");
                self.metrics.inc_dropped_malformed();
                return;
            }
        };

        match self.tx.try_send(OutboundEvent { topic, payload }) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("send queue full, dropping event {}", event.topic);
                self.metrics.inc_dropped_queue_full();
            }
            Err(TrySendError::Closed(event)) => {
                debug!("sender task stopped, dropping event {}", event.topic);
                self.metrics.inc_dropped_disconnected();
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch handle on the connection state, for callers that want to
    /// await a transition instead of polling.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn metrics(&self) -> Arc<ForwarderMetrics> {
        self.metrics.clone()
    }

    /// Graceful shutdown: closes the connection if one is up, cancels any
    /// pending reconnect, and awaits the sender task. The forwarder is
    /// always Disconnected afterwards.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.sender_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("sender task ended abnormally: {e}");
            }
        }
        info!("disconnected");
    }
}
