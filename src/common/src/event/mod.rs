use std::collections::HashSet;

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use crate::constants::EVENT_ID_KEY;

/// One telemetry record as emitted by the honeypot: an externally-defined
/// JSON mapping. The forwarder borrows records per call and never retains
/// them.
pub type EventRecord = Map<String, Value>;

/// The type tag of an event, if present and a string.
pub fn event_id(event: &EventRecord) -> Option<&str> {
    event.get(EVENT_ID_KEY).and_then(Value::as_str)
}

/// Decides which events qualify for forwarding and projects them down to
/// the outbound field set. Both lists come from configuration; the defaults
/// narrow the stream to login attempts with their credentials.
#[derive(Debug, Clone)]
pub struct EventFilter {
    allowed_events: HashSet<String>,
    forward_fields: Vec<String>,
}

impl EventFilter {
    pub fn new(allowed_events: Vec<String>, forward_fields: Vec<String>) -> Self {
        EventFilter {
            allowed_events: allowed_events.into_iter().collect(),
            forward_fields,
        }
    }

    /// True when the event carries a type tag on the allow-list. Events
    /// without a string `eventid` never qualify.
    pub fn accepts(&self, event: &EventRecord) -> bool {
        match event_id(event) {
            Some(id) => self.allowed_events.contains(id),
            None => false,
        }
    }

    /// Builds the outbound payload containing exactly the configured
    /// fields; everything else on the event is discarded. Every configured
    /// field is required, so a record missing one fails the whole event.
    pub fn reshape(&self, event: &EventRecord) -> Result<Map<String, Value>> {
        let mut payload = Map::with_capacity(self.forward_fields.len());
        for field in &self.forward_fields {
            match event.get(field) {
                Some(value) => {
                    payload.insert(field.clone(), value.clone());
                }
                None => bail!(
                    "event {} is missing required field '{}'",
                    event_id(event).unwrap_or("unknown"),
                    field
                ),
            }
        }
        Ok(payload)
    }
}
