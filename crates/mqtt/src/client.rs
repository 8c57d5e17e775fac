//! MQTT client construction from configuration.
//!
//! `ClientBuilder` wraps the setup of rumqttc's `AsyncClient` and
//! `EventLoop` so callers deal with a validated `Config` instead of raw
//! protocol options. The transport is plain TCP; the bridge talks to a
//! broker on a trusted local network.

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};

use super::{config::Config, error::TransferError};

/// Builder for the MQTT client and its event loop.
///
/// The builder is consumed by `build()`, which returns both halves: the
/// client to send commands, and the event loop that must be polled for any
/// of them to make progress.
pub struct ClientBuilder {
    opts: MqttOptions,
    cap: usize,
}

impl ClientBuilder {
    /// Creates a builder with minimal settings and defaults for the rest.
    pub fn new(client_id: impl Into<String>, host: impl Into<String>, port: u16, cap: usize) -> Self {
        Self {
            opts: MqttOptions::new(client_id, host, port),
            cap,
        }
    }

    /// Creates a builder from a validated `Config`.
    ///
    /// An empty `client_id` is replaced with a generated UUID so two bridge
    /// instances on the same broker cannot collide.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::ConfigError` naming the offending field if
    /// validation fails.
    pub fn from_config(config: &Config) -> Result<Self, TransferError> {
        use validator::Validate;
        config.validate()?;

        let client_id = if config.client_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            config.client_id.clone()
        };

        let mut opts = MqttOptions::new(client_id, config.host.clone(), config.port);
        opts.set_keep_alive(Duration::from_secs(config.keep_alive));
        opts.set_clean_session(config.clean_session);

        let cap = config.request_channel_capacity.unwrap_or(10) as usize;

        Ok(Self { opts, cap })
    }

    /// Sets the keep-alive interval (seconds).
    pub fn keep_alive(mut self, secs: u64) -> Self {
        self.opts.set_keep_alive(Duration::from_secs(secs));
        self
    }

    /// Configures whether to request a clean session from the broker.
    pub fn clean_session(mut self, clean: bool) -> Self {
        self.opts.set_clean_session(clean);
        self
    }

    /// Constructs the client and event loop, consuming the builder.
    ///
    /// The `AsyncClient` is cheap to clone and thread-safe; the `EventLoop`
    /// must be driven by a single task (the connection kernel).
    pub fn build(self) -> (AsyncClient, EventLoop) {
        AsyncClient::new(self.opts, self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_creation() {
        let builder = ClientBuilder::new("test_client", "localhost", 1883, 100);
        assert_eq!(builder.cap, 100);
    }

    #[test]
    fn builder_chain_methods() {
        let builder = ClientBuilder::new("test_client", "localhost", 1883, 100)
            .keep_alive(30)
            .clean_session(true);
        assert_eq!(builder.cap, 100);
    }

    #[test]
    fn build_tcp_client() {
        let (client, _event_loop) = ClientBuilder::new("test_client", "localhost", 1883, 100).build();
        assert!(!format!("{:?}", client).is_empty());
    }

    #[test]
    fn from_config_defaults() {
        let config = Config::default();
        let builder = ClientBuilder::from_config(&config).unwrap();
        assert_eq!(builder.cap, 10);
    }

    #[test]
    fn from_config_generates_client_id_when_empty() {
        let config = Config {
            client_id: String::new(),
            ..Default::default()
        };
        // An empty id passes validation and is replaced by a UUID.
        assert!(ClientBuilder::from_config(&config).is_ok());
    }

    #[test]
    fn from_config_invalid_host() {
        let config = Config {
            host: String::new(),
            ..Default::default()
        };
        assert!(ClientBuilder::from_config(&config).is_err());
    }
}
