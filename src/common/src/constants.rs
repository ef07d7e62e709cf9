/// Event types forwarded when no allow-list is configured. Matches the
/// credential events a Cowrie-style honeypot emits for login attempts.
pub const DEFAULT_ALLOWED_EVENTS: &[&str] = &["cowrie.login.failed", "cowrie.login.success"];

/// Fields copied into the outbound payload when no field list is configured.
pub const DEFAULT_FORWARD_FIELDS: &[&str] = &["session", "src_ip", "username", "password"];

/// Key carrying the event type tag on every honeypot event.
pub const EVENT_ID_KEY: &str = "eventid";

pub const DEFAULT_BACKEND_URL: &str = "ws://127.0.0.1:3000";
pub const DEFAULT_SENSOR: &str = "cowrie";

pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
