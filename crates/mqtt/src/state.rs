//! Observable connection state for the MQTT client.
//!
//! The connection kernel broadcasts the current state through a watch
//! channel so the application can react to broker availability: log
//! transitions, gate startup on the first CONNACK, or show a countdown to
//! the next reconnection attempt.

use std::fmt;

/// The current state of the broker connection.
///
/// Lifecycle: `Connecting` → `Connected`, then on failure
/// `Reconnecting(secs)` → `Connecting` → ... under the backoff schedule, or
/// `Disconnected(reason)` when the kernel stops retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// CONNECT sent, waiting for the broker's CONNACK.
    Connecting,

    /// Handshake complete; publishes will reach the broker.
    Connected,

    /// Connection lost or refused; carries the reason. Terminal unless the
    /// kernel is restarted.
    Disconnected(String),

    /// Waiting out a backoff delay; carries seconds until the next attempt.
    Reconnecting(f64),
}

impl ConnectionState {
    /// Short static identifier for logging and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected(_) => "Disconnected",
            ConnectionState::Reconnecting(_) => "Reconnecting",
        }
    }

    /// Contextual detail: the disconnect reason or the reconnect delay.
    pub fn details(&self) -> String {
        match self {
            ConnectionState::Connecting | ConnectionState::Connected => String::new(),
            ConnectionState::Disconnected(reason) => reason.clone(),
            ConnectionState::Reconnecting(seconds) => format!("in {seconds} seconds"),
        }
    }

    /// True only in the `Connected` state.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True while an attempt is in flight or scheduled.
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting(_)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())?;
        let details = self.details();
        if !details.is_empty() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_values() {
        assert_eq!(ConnectionState::Connecting.as_str(), "Connecting");
        assert_eq!(ConnectionState::Connected.as_str(), "Connected");
        assert_eq!(
            ConnectionState::Disconnected("test".into()).as_str(),
            "Disconnected"
        );
        assert_eq!(ConnectionState::Reconnecting(1.0).as_str(), "Reconnecting");
    }

    #[test]
    fn details_carry_context() {
        assert_eq!(ConnectionState::Connected.details(), "");
        assert_eq!(
            ConnectionState::Disconnected("network error".into()).details(),
            "network error"
        );
        assert_eq!(
            ConnectionState::Reconnecting(3.5).details(),
            "in 3.5 seconds"
        );
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionState::Reconnecting(2.0).to_string(),
            "Reconnecting (in 2 seconds)"
        );
        assert_eq!(
            ConnectionState::Disconnected("broker closed".into()).to_string(),
            "Disconnected (broker closed)"
        );
    }

    #[test]
    fn connected_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Connecting.is_connecting());
        assert!(ConnectionState::Reconnecting(1.0).is_connecting());
        assert!(!ConnectionState::Disconnected("error".into()).is_connecting());
    }
}
