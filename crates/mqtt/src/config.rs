//! Configuration structures for the MQTT connection and publish endpoints.
//!
//! All types deserialize with serde (TOML in practice) and carry `validator`
//! constraints, so an invalid configuration fails at load time rather than
//! at connect time, with a message naming the field and constraint.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// MQTT connection configuration.
///
/// Every field has a default suitable for a broker on the local machine, so
/// the bridge runs with no configuration file at all.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Broker hostname or IP address.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port. 1883 is the conventional unencrypted MQTT port.
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// How long to wait for the TCP connect and the MQTT CONNACK before the
    /// initial connection attempt is considered failed (seconds).
    #[validate(range(
        min = 1,
        max = 300,
        message = "Connection timeout must be between 1 and 300 seconds"
    ))]
    pub connection_timeout: u64,

    /// Whether to request a clean session. True means the broker forgets
    /// state between connections; appropriate for a publish-only client.
    pub clean_session: bool,

    /// Keep-alive interval in seconds. The client pings the broker at this
    /// cadence when otherwise idle.
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// Client identifier presented to the broker. Empty means a UUID is
    /// generated at build time.
    #[validate(length(max = 36, message = "Client ID must not exceed 36 characters"))]
    pub client_id: String,

    /// Capacity of the internal request channel: how many publishes can be
    /// queued before senders hit backpressure.
    #[validate(range(
        min = 1,
        max = 255,
        message = "Request channel capacity must be between 1 and 255"
    ))]
    pub request_channel_capacity: Option<u8>,

    /// Initial delay before the first reconnection attempt (seconds). The
    /// backoff schedule grows from here.
    #[validate(range(
        min = 1,
        max = 60,
        message = "Reconnect delay must be between 1 and 60 seconds"
    ))]
    pub reconnect_delay: u64,

    /// Hard cap on reconnection attempts. Zero means the cap is computed
    /// from the backoff timing parameters instead.
    #[validate(range(
        min = 0,
        max = 100,
        message = "Max reconnect attempts must be between 0 and 100"
    ))]
    pub max_reconnect_attempts: u64,

    /// Multiplier applied to the reconnect delay after each failed attempt.
    #[validate(range(
        min = 2,
        max = 30,
        message = "Reconnect backoff factor must be between 2 and 30"
    ))]
    pub reconnect_backoff_factor: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_string(),
            port: 1883,
            connection_timeout: 30,
            clean_session: true,
            keep_alive: 60,
            client_id: "thermbridge".to_string(),
            request_channel_capacity: Some(10),
            reconnect_delay: 1,
            max_reconnect_attempts: 0,
            reconnect_backoff_factor: 2,
        }
    }
}

/// Metadata for a single publish endpoint: where readings go and with what
/// delivery guarantees.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EndpointMetadata {
    /// MQTT Quality of Service level.
    ///
    /// - 0 (AtMostOnce): fire and forget; a dropped message is acceptable
    /// - 1 (AtLeastOnce): broker acknowledges; duplicates possible
    /// - 2 (ExactlyOnce): full handshake; slowest
    #[validate(range(min = 0, max = 2, message = "Invalid QoS value, must be 0, 1, or 2"))]
    pub qos: u8,

    /// The topic readings are published to. Must be concrete (no wildcards).
    #[validate(length(min = 1, message = "Topic must not be empty"))]
    pub topic: String,

    /// Whether the broker should retain the last message for new
    /// subscribers. Wasteful for a high-frequency reading stream.
    pub retain: bool,
}

impl Default for EndpointMetadata {
    fn default() -> Self {
        Self {
            qos: 0,
            topic: "telemetry".to_string(),
            retain: false,
        }
    }
}
