//! Unified error handling for MQTT transfer operations.
//!
//! `TransferError` aggregates failures from configuration, the local client,
//! and the network into a single type the application can pattern-match on.
//! The variants fall into three buckets:
//!
//! - **Setup errors** (`ClientSetup`, `ConfigError`, `InvalidMetadata`):
//!   caught at startup, fix the configuration and restart.
//! - **Runtime errors** (`ClientTransfer`, `ClientConnection`,
//!   `ConnectionState`): transient connectivity issues, handled by the
//!   connection kernel's retry policy.
//! - **Policy exhaustion** (`RetriesPolicy`): the backoff schedule gave up;
//!   the connection is considered unrecoverable.

use thiserror::Error;

/// The unified error type for MQTT transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Endpoint metadata is invalid (e.g. a QoS value outside 0-2 or an
    /// empty topic). A programming or configuration error; caught before
    /// the first publish.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Client initialization failed. The application won't start; fail fast.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// Configuration validation failed. The message names the offending
    /// field and constraint; fix the config file and restart.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] validator::ValidationErrors),

    /// The local client could not queue a packet (internal channel full or
    /// the event loop has shut down).
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// The broker connection failed or was lost. Boxed to keep the enum
    /// small; see the manual `From` impl below.
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// The MQTT state machine rejected a transition. Indicates a protocol
    /// violation; should not happen in normal operation.
    #[error("Client connection state error: {0}")]
    ConnectionState(#[from] rumqttc::StateError),

    /// The reconnection backoff exhausted its attempt budget. Sustained
    /// outage, not a transient glitch.
    #[error("Retry policy error: {0}")]
    RetriesPolicy(#[from] super::backoff::BackoffError),

    /// Local I/O failure (not network).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ConnectionError is large; box it rather than bloating every Result in the
// crate. The `?` operator picks this up automatically.
impl From<rumqttc::ConnectionError> for TransferError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransferError::ClientConnection(Box::new(err))
    }
}
