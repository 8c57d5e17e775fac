//! Connection management: event loop driving, error classification, and
//! reconnection.
//!
//! `ConnectionKernel` is the heart of this crate. rumqttc's `AsyncClient`
//! only enqueues requests; nothing reaches the network until the associated
//! `EventLoop` is polled. The kernel owns that polling loop, watches for
//! failures, sorts them into fatal vs retryable, sleeps out the backoff
//! between retryable failures, and broadcasts `ConnectionState` changes
//! through a watch channel.
//!
//! ```text
//! Application ── publish() ──> AsyncClient ──> EventLoop <── ConnectionKernel.run()
//!                                                  │
//!                                              TCP to broker
//! ```

use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Packet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{backoff::Backoff, error::TransferError, state::ConnectionState};

/// Drives the MQTT event loop and keeps the connection alive.
///
/// Runs on a single task; the `AsyncClient` handed out alongside it can be
/// cloned and used from anywhere.
pub struct ConnectionKernel {
    client: AsyncClient,
    event_loop: EventLoop,
    backoff: Backoff,
    cancel: CancellationToken,
    state_tx: tokio::sync::watch::Sender<ConnectionState>,
    state_rx: tokio::sync::watch::Receiver<ConnectionState>,
}

impl ConnectionKernel {
    /// Creates a kernel over a freshly built client/event-loop pair.
    ///
    /// The initial broadcast state is `Connecting`; the first successful
    /// CONNACK moves it to `Connected`.
    pub fn new(
        client: AsyncClient,
        event_loop: EventLoop,
        backoff: Backoff,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, state_rx) = tokio::sync::watch::channel(ConnectionState::Connecting);
        Self {
            client,
            event_loop,
            backoff,
            cancel,
            state_tx,
            state_rx,
        }
    }

    /// Subscribes to connection state changes.
    ///
    /// The receiver sees the current state immediately and every transition
    /// afterwards.
    pub fn subscribe_state(&self) -> tokio::sync::watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Broadcasts a state change, skipping no-op updates.
    fn update_state(&mut self, state: ConnectionState) {
        let changed = *self.state_tx.borrow() != state;
        if changed {
            info!("Connection state changed to: {}", state);
            if self.state_tx.send(state).is_err() {
                warn!("No subscribers for connection state updates");
            }
        }
    }

    /// Runs the connection until cancelled or a terminal failure.
    ///
    /// Behavior per outcome:
    /// - **CONNACK received**: broadcast `Connected`, reset the backoff.
    /// - **Retryable error** (network timeout, refused-but-temporary, most
    ///   I/O failures): broadcast `Reconnecting(secs)`, sleep, poll again.
    /// - **Fatal error** (protocol violation, bad credentials, local
    ///   misconfiguration): broadcast `Disconnected(reason)` and return it.
    /// - **Cancellation**: best-effort DISCONNECT, then `Ok(())`.
    pub async fn run(&mut self) -> Result<(), TransferError> {
        self.update_state(ConnectionState::Connecting);
        self.backoff.reset();

        info!("Starting connection event loop...");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Shutdown signal received, closing MQTT connection...");
                    self.disconnect().await;
                    info!("Connection kernel shutdown completed");
                    return Ok(());
                }

                event_result = self.event_loop.poll() => {
                    match event_result {
                        Ok(event) => self.handle_event(event),
                        Err(e) => {
                            if is_fatal_error(&e) {
                                error!("Fatal connection error, stopping kernel: {}", root_cause(&e));
                                self.update_state(ConnectionState::Disconnected(e.to_string()));
                                return Err(TransferError::from(e));
                            }

                            match self.backoff.next_sleep() {
                                Ok(delay) => {
                                    warn!(
                                        "Reconnecting in {:.2} seconds due to error: {}",
                                        delay.as_secs_f64(),
                                        root_cause(&e)
                                    );
                                    self.update_state(ConnectionState::Reconnecting(delay.as_secs_f64()));
                                    tokio::time::sleep(delay).await;
                                }
                                Err(backoff_err) => {
                                    error!("Maximum retry attempts exceeded: {}", backoff_err);
                                    self.update_state(ConnectionState::Disconnected(backoff_err.to_string()));
                                    return Err(backoff_err.into());
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Updates internal state from a single protocol event.
    ///
    /// Only the handshake and disconnect packets matter here; acknowledgment
    /// bookkeeping is rumqttc's job.
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(packet) => match packet {
                Packet::ConnAck(conn_ack) => {
                    if conn_ack.code == ConnectReturnCode::Success {
                        info!("Connection established successfully.");
                        self.update_state(ConnectionState::Connected);
                        self.backoff.reset();
                    }
                }
                Packet::Disconnect => {
                    warn!("Disconnected by broker");
                    self.update_state(ConnectionState::Disconnected(
                        "Disconnected by broker".into(),
                    ));
                }
                other => {
                    trace!("Incoming packet: {:?}", other);
                }
            },
            Event::Outgoing(outgoing) => {
                trace!("Outgoing packet: {:?}", outgoing);
            }
        }
    }

    /// Best-effort DISCONNECT. The connection closes either way.
    async fn disconnect(&mut self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("Error sending disconnect packet: {:?}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Unrecoverable; reconnecting cannot help.
    Fatal,
    /// Temporary; a reconnect attempt is reasonable.
    Reconnect,
}

/// Sorts a connection error into the fatal/retryable split that drives the
/// kernel's retry policy.
fn classify_connection_error(err: &ConnectionError) -> Disposition {
    use Disposition::*;

    match err {
        // Broken crypto setup or certificates; a retry hits the same wall.
        ConnectionError::Tls(_) => Fatal,

        // Protocol-level corruption inside the MQTT state machine.
        ConnectionError::MqttState(_) => Fatal,

        // The broker answered the handshake with something other than
        // CONNACK.
        ConnectionError::NotConnAck(_) => Fatal,

        // All request handles dropped; the connection cannot be reused.
        ConnectionError::RequestsDone => Fatal,

        ConnectionError::Io(e) => match e.kind() {
            // Local misconfiguration, not a transient condition.
            std::io::ErrorKind::AddrInUse
            | std::io::ErrorKind::PermissionDenied
            | std::io::ErrorKind::InvalidInput
            | std::io::ErrorKind::InvalidData => Fatal,

            // Everything else (refused, reset, unreachable, ...) may clear
            // up on its own.
            _ => Reconnect,
        },

        // The broker went quiet; worth another try.
        ConnectionError::NetworkTimeout | ConnectionError::FlushTimeout => Reconnect,

        ConnectionError::ConnectionRefused(code) => match code {
            // Permanent incompatibility or invalid identity.
            ConnectReturnCode::RefusedProtocolVersion
            | ConnectReturnCode::BadClientId
            | ConnectReturnCode::BadUserNamePassword
            | ConnectReturnCode::NotAuthorized => Fatal,

            // Broker up but overloaded.
            ConnectReturnCode::ServiceUnavailable => Reconnect,

            _ => Reconnect,
        },

        // Unknown/future variants: prefer retrying over a hard stop.
        #[allow(unreachable_patterns)]
        _ => Reconnect,
    }
}

fn is_fatal_error(err: &ConnectionError) -> bool {
    matches!(classify_connection_error(err), Disposition::Fatal)
}

/// Walks the source chain to the innermost error message.
fn root_cause(e: &dyn std::error::Error) -> String {
    let mut current = e;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{client::ClientBuilder, config::Config};

    fn test_kernel() -> ConnectionKernel {
        let (client, event_loop) = ClientBuilder::from_config(&Config::default())
            .unwrap()
            .build();
        ConnectionKernel::new(
            client,
            event_loop,
            Backoff::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn initial_state_is_connecting() {
        let kernel = test_kernel();
        let state_rx = kernel.subscribe_state();
        assert_eq!(*state_rx.borrow(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn state_updates_reach_subscribers() {
        let mut kernel = test_kernel();
        let mut state_rx = kernel.subscribe_state();

        kernel.update_state(ConnectionState::Connected);

        state_rx.changed().await.unwrap();
        assert_eq!(*state_rx.borrow(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn cancelled_kernel_returns_ok() {
        let mut kernel = test_kernel();
        let cancel = kernel.cancel.clone();
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), kernel.run()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[test]
    fn io_errors_classified() {
        use std::io;

        let refused = ConnectionError::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(!is_fatal_error(&refused));

        let addr_in_use =
            ConnectionError::Io(io::Error::new(io::ErrorKind::AddrInUse, "address in use"));
        assert!(is_fatal_error(&addr_in_use));

        let denied = ConnectionError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
        assert!(is_fatal_error(&denied));
    }

    #[test]
    fn timeouts_are_retryable() {
        assert!(!is_fatal_error(&ConnectionError::NetworkTimeout));
        assert!(!is_fatal_error(&ConnectionError::FlushTimeout));
    }

    #[test]
    fn refused_codes_classified() {
        assert!(is_fatal_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::BadUserNamePassword
        )));
        assert!(!is_fatal_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::ServiceUnavailable
        )));
    }

    #[test]
    fn root_cause_unwraps_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let outer = ConnectionError::Io(inner);
        assert_eq!(root_cause(&outer), "refused");
    }
}
