pub mod config_manager;
pub mod connection;
pub mod forwarder;
pub mod wire;

pub use forwarder::EventForwarder;
