use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as RConfig, Environment, File};
use serde::{Deserialize, Serialize};

use hivewire_common::constants::{
    DEFAULT_ALLOWED_EVENTS, DEFAULT_BACKEND_URL, DEFAULT_FORWARD_FIELDS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SENSOR,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// WebSocket endpoint of the messaging backend.
    pub url: String,
    /// Identity of this honeypot instance, sent in the auth frame.
    pub sensor: String,

    /// Event type tags that qualify for forwarding.
    pub allowed_events: Vec<String>,
    /// Fields copied into the outbound payload; all of them are required.
    pub forward_fields: Vec<String>,

    pub reconnect_delay_ms: u64,
    pub queue_capacity: usize,
}

impl Config {
    /// The URL is only dialed from a background task, so malformed ones
    /// are rejected up front instead of failing silently in the retry
    /// loop.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.url)
            .with_context(|| format!("invalid backend url '{}'", self.url))?;
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads defaults, then the optional TOML file, then `HIVEWIRE_*`
    /// environment overrides. List-valued env overrides are
    /// comma-separated.
    pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
        let mut builder = RConfig::builder();

        builder = builder
            .set_default("url", DEFAULT_BACKEND_URL)?
            .set_default("sensor", DEFAULT_SENSOR)?
            .set_default::<&str, Vec<&str>>("allowed_events", DEFAULT_ALLOWED_EVENTS.to_vec())?
            .set_default::<&str, Vec<&str>>("forward_fields", DEFAULT_FORWARD_FIELDS.to_vec())?
            .set_default("reconnect_delay_ms", DEFAULT_RECONNECT_DELAY_MS)?
            .set_default("queue_capacity", DEFAULT_QUEUE_CAPACITY as u64)?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("HIVEWIRE")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_events")
                .with_list_parse_key("forward_fields"),
        );

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("failed to parse forwarder config")?;

        config.validate()?;

        Ok(config)
    }

    pub fn load_default_config() -> Result<Config> {
        Self::load_config(None)
    }
}
