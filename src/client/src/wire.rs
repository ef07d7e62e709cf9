use serde_json::{json, Map, Value};

/// One queued emission: the event's type tag as topic plus the reshaped
/// payload.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub topic: String,
    pub payload: Map<String, Value>,
}

/// First frame on every connection; identifies the honeypot instance to
/// the backend.
pub fn auth_frame(sensor: &str) -> String {
    json!({ "sensor": sensor }).to_string()
}

/// Emissions are `(topic, payload)` pairs encoded as a two-element JSON
/// array, the shape the backend demultiplexes on.
pub fn event_frame(event: &OutboundEvent) -> String {
    Value::Array(vec![
        Value::String(event.topic.clone()),
        Value::Object(event.payload.clone()),
    ])
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_frame_carries_the_sensor_id() {
        assert_eq!(auth_frame("sensor-eu-1"), r#"{"sensor":"sensor-eu-1"}"#);
    }

    #[test]
    fn event_frame_is_a_topic_payload_pair() {
        let mut payload = Map::new();
        payload.insert("session".into(), json!("S1"));
        payload.insert("src_ip".into(), json!("1.2.3.4"));

        let frame = event_frame(&OutboundEvent {
            topic: "cowrie.login.failed".into(),
            payload,
        });

        let parsed: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            parsed,
            json!(["cowrie.login.failed", {"session": "S1", "src_ip": "1.2.3.4"}])
        );
    }
}
