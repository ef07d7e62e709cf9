use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use hivewire_client::config_manager::Config;
use hivewire_client::connection::ConnectionState;
use hivewire_client::EventForwarder;
use hivewire_common::event::EventRecord;

/// In-process WebSocket backend recording every text frame it receives.
pub struct TestBackend {
    addr: SocketAddr,
    frames: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl TestBackend {
    pub async fn launch() -> Self {
        Self::launch_with(None).await
    }

    /// Backend that drops each connection after `events` event frames,
    /// for exercising the reconnect path.
    pub async fn launch_closing_after(events: usize) -> Self {
        Self::launch_with(Some(events)).await
    }

    async fn launch_with(close_after_events: Option<usize>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let frames: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = frames.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, sink.clone(), close_after_events));
            }
        });

        TestBackend {
            addr,
            frames,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn frames(&self) -> Vec<String> {
        self.frames.lock().await.clone()
    }

    pub async fn wait_for_frames(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let frames = self.frames().await;
            if frames.len() >= count {
                return frames;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {count} frames, got {frames:?}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    stream: TcpStream,
    sink: Arc<Mutex<Vec<String>>>,
    close_after_events: Option<usize>,
) {
    let Ok(mut socket) = accept_async(stream).await else {
        return;
    };

    // the first text frame on every connection is the auth frame
    let mut events_seen: usize = 0;
    let mut auth_seen = false;

    while let Some(Ok(message)) = socket.next().await {
        if let Message::Text(text) = message {
            sink.lock().await.push(text);
            if !auth_seen {
                auth_seen = true;
                continue;
            }
            events_seen += 1;
            if close_after_events.is_some_and(|n| events_seen >= n) {
                let _ = socket.close(None).await;
                return;
            }
        }
    }
}

pub fn test_config(url: String) -> Config {
    Config {
        url,
        sensor: "s01".to_string(),
        allowed_events: vec![
            "cowrie.login.failed".to_string(),
            "cowrie.login.success".to_string(),
        ],
        forward_fields: vec![
            "session".to_string(),
            "src_ip".to_string(),
            "username".to_string(),
            "password".to_string(),
        ],
        reconnect_delay_ms: 25,
        queue_capacity: 64,
    }
}

pub async fn wait_connected(forwarder: &EventForwarder, timeout: Duration) {
    let mut watch = forwarder.state_watch();
    tokio::time::timeout(timeout, watch.wait_for(|s| *s == ConnectionState::Connected))
        .await
        .expect("forwarder did not connect in time")
        .expect("state channel closed");
}

/// A loopback URL nothing listens on: bind, read the port, drop.
pub async fn free_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}")
}

pub async fn wait_for_attempts(forwarder: &EventForwarder, count: u64, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while forwarder.metrics().connect_attempts() < count {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {count} connect attempts"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn login_event(eventid: &str, session: &str) -> EventRecord {
    serde_json::json!({
        "eventid": eventid,
        "session": session,
        "src_ip": "1.2.3.4",
        "username": "root",
        "password": "toor",
        "timestamp": "2024-05-01T10:00:00Z",
        "sensor_local": "extra-field"
    })
    .as_object()
    .unwrap()
    .clone()
}
