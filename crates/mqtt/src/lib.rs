//! # thermbridge-mqtt: reliable MQTT publishing for the telemetry bridge
//!
//! A small, publish-only MQTT client layer built on top of `rumqttc`. It adds
//! the pieces the bridge needs and nothing more:
//!
//! - **Connection kernel** that drives the rumqttc event loop, classifies
//!   failures as fatal or retryable, and reconnects with exponential backoff
//! - **State monitoring** through a watch channel (`ConnectionState`)
//! - **Validated configuration** loadable from TOML
//! - **Text publisher** bound to a single endpoint (topic, QoS, retain)
//!
//! # Quick Start
//!
//! ```ignore
//! let manager = MqttManager::new("localhost", 1883)?;
//! let instance = manager.build_and_start().await?;
//!
//! let publisher = instance.publisher(EndpointMetadata {
//!     topic: "topic/temperature".into(),
//!     qos: 0,
//!     retain: false,
//! })?;
//! publisher.publish("ADC: 30000, Temp: 28.84°C / 83.91°F").await?;
//!
//! instance.shutdown(Duration::from_millis(250)).await;
//! ```
//!
//! # Connection Lifecycle
//!
//! ```text
//! Connecting ──(CONNACK)──> Connected
//!                              │
//!                       (network error)
//!                              │
//!                              ▼
//!                       Reconnecting(secs) ──(delay elapsed)──> Connecting
//! ```
//!
//! Fatal errors (protocol violations, refused credentials, local
//! misconfiguration) stop the kernel instead of retrying; everything else
//! goes through the backoff schedule. Subscribe to state changes via
//! `MqttInstance::state_receiver()` to observe this.

pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod publisher;
pub mod state;

pub use client::ClientBuilder;
pub use config::{Config as MqttConfig, EndpointMetadata};
pub use connection::ConnectionKernel;
pub use error::TransferError;
pub use manager::{MqttInstance, MqttManager};
pub use publisher::Publisher;
pub use state::ConnectionState;

/// Result type for MQTT operations; every fallible operation in this crate
/// returns it.
pub type Result<T> = std::result::Result<T, TransferError>;
