//! High-level assembly of the MQTT pieces.
//!
//! `MqttManager` is the entry point: it validates configuration, builds the
//! client and connection kernel, spawns the kernel task, and returns an
//! `MqttInstance` the application holds for the rest of its life.
//!
//! ```ignore
//! let manager = MqttManager::from_config(config)?;
//! let instance = manager.build_and_start().await?;
//!
//! // gate startup on the first CONNACK
//! let mut state_rx = instance.state_receiver();
//! // ... then publish through instance.publisher(metadata)?
//! ```

use std::time::Duration;

use rumqttc::AsyncClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{
    backoff::Backoff,
    client::ClientBuilder,
    config::{Config, EndpointMetadata},
    connection::ConnectionKernel,
    error::TransferError,
    publisher::Publisher,
    state::ConnectionState,
};

/// Builds the MQTT infrastructure from a validated configuration.
pub struct MqttManager {
    config: Config,
    cancel_token: CancellationToken,
}

impl MqttManager {
    /// Creates a manager from an existing configuration.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::ConfigError` if validation fails.
    pub fn from_config(config: Config) -> Result<Self, TransferError> {
        use validator::Validate;
        config.validate()?;

        Ok(Self {
            config,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Creates a manager with defaults for everything but the broker
    /// address. Useful for tests and quick setups.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, TransferError> {
        let config = Config {
            host: host.into(),
            port,
            ..Default::default()
        };
        Self::from_config(config)
    }

    /// A reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cancellation token that shuts the kernel down.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Builds the client and connection kernel, spawns the kernel task, and
    /// returns the running instance.
    ///
    /// The actual connection happens asynchronously after this returns;
    /// observe it through `MqttInstance::state_receiver()`.
    pub async fn build_and_start(self) -> Result<MqttInstance, TransferError> {
        info!(
            "Building MQTT infrastructure for {}:{}",
            self.config.host, self.config.port
        );

        let (client, event_loop) = ClientBuilder::from_config(&self.config)?.build();

        let mut backoff = Backoff::new(
            Duration::from_secs(self.config.reconnect_delay),
            Duration::from_secs(60),
            self.config.reconnect_backoff_factor as f64,
        );
        if self.config.max_reconnect_attempts > 0 {
            backoff.set_max_attempts(self.config.max_reconnect_attempts as u32);
        }

        let mut kernel = ConnectionKernel::new(
            client.clone(),
            event_loop,
            backoff,
            self.cancel_token.clone(),
        );
        let state_rx = kernel.subscribe_state();

        tokio::spawn(async move {
            if let Err(e) = kernel.run().await {
                error!("MQTT connection kernel stopped: {}", e);
            }
        });

        Ok(MqttInstance {
            client,
            state_rx,
            cancel_token: self.cancel_token,
        })
    }
}

/// A running MQTT connection: the client, the state channel, and shutdown.
#[derive(Debug, Clone)]
pub struct MqttInstance {
    client: AsyncClient,
    state_rx: tokio::sync::watch::Receiver<ConnectionState>,
    cancel_token: CancellationToken,
}

impl MqttInstance {
    /// The MQTT client; thread-safe and cheap to clone.
    pub fn client(&self) -> &AsyncClient {
        &self.client
    }

    /// A fresh receiver for connection state changes.
    pub fn state_receiver(&self) -> tokio::sync::watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Creates a publisher bound to the given endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint metadata is invalid (see `Publisher::new`).
    pub fn publisher(&self, metadata: EndpointMetadata) -> Result<Publisher, TransferError> {
        Publisher::new(self.client.clone(), metadata)
    }

    /// The cancellation token; cloning it lets other parts of the
    /// application trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Gracefully shuts down the connection.
    ///
    /// Sends a best-effort DISCONNECT, stops the kernel, and waits out the
    /// grace window so the packet has a chance to reach the broker before
    /// the process exits.
    pub async fn shutdown(&self, grace: Duration) {
        if let Err(e) = self.client.disconnect().await {
            warn!("Clean disconnect failed: {}", e);
        }
        self.cancel_token.cancel();
        tokio::time::sleep(grace).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manager_creation() {
        let manager = MqttManager::new("localhost", 1883).unwrap();
        assert_eq!(manager.config().host, "localhost");
        assert_eq!(manager.config().port, 1883);
        assert!(!manager.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn manager_rejects_invalid_config() {
        let config = Config {
            host: String::new(),
            ..Default::default()
        };
        assert!(MqttManager::from_config(config).is_err());
    }

    #[tokio::test]
    async fn instance_lifecycle() {
        // Port 1 is never serviced, so the kernel stays in a connecting
        // state for the duration of the test.
        let manager = MqttManager::new("localhost", 1).unwrap();
        let instance = manager.build_and_start().await.unwrap();

        let state_rx = instance.state_receiver();
        assert!(state_rx.borrow().is_connecting());

        let publisher = instance
            .publisher(EndpointMetadata {
                qos: 0,
                topic: "topic/temperature".into(),
                retain: false,
            })
            .unwrap();
        assert_eq!(publisher.topic(), "topic/temperature");

        instance.shutdown(Duration::from_millis(10)).await;
        assert!(instance.cancel_token().is_cancelled());
    }
}
