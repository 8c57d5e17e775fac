//! Text publishing bound to a single endpoint.
//!
//! The bridge's payloads are already-formatted UTF-8 readings, so the
//! publisher does no serialization of its own: it validates the endpoint
//! once at construction and then hands payloads to the client with the
//! configured QoS and retain flag.

use rumqttc::{AsyncClient, QoS};
use tracing::debug;

use super::{config::EndpointMetadata, error::TransferError};

/// Publishes text payloads to one fixed topic.
///
/// Cheap to clone; the underlying client is shared.
#[derive(Clone)]
pub struct Publisher {
    client: AsyncClient,
    metadata: EndpointMetadata,
    qos: QoS,
}

impl Publisher {
    /// Creates a publisher for the given endpoint.
    ///
    /// # Errors
    ///
    /// Fails with `TransferError::InvalidMetadata` if the QoS value is not
    /// 0, 1, or 2, or the topic is empty.
    pub fn new(client: AsyncClient, metadata: EndpointMetadata) -> Result<Self, TransferError> {
        if metadata.topic.is_empty() {
            return Err(TransferError::InvalidMetadata(
                "Topic must not be empty".to_string(),
            ));
        }
        let qos = qos_from_u8(metadata.qos)?;
        Ok(Self {
            client,
            metadata,
            qos,
        })
    }

    /// The topic this publisher is bound to.
    pub fn topic(&self) -> &str {
        &self.metadata.topic
    }

    /// Publishes one payload and waits for the client to accept it.
    ///
    /// At QoS 0 the send completes once the request is handed to the event
    /// loop; delivery is at-most-once by design. Failure here means the
    /// connection kernel has stopped or its queue is full; the caller logs
    /// and drops the reading.
    pub async fn publish(&self, payload: &str) -> Result<(), TransferError> {
        debug!(
            "Publishing {} bytes to topic '{}'",
            payload.len(),
            self.metadata.topic
        );

        self.client
            .publish(
                self.metadata.topic.clone(),
                self.qos,
                self.metadata.retain,
                payload,
            )
            .await?;

        Ok(())
    }
}

/// Maps the config-level u8 QoS to the protocol enum.
fn qos_from_u8(qos: u8) -> Result<QoS, TransferError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        _ => Err(TransferError::InvalidMetadata(
            "Invalid QoS value".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::ClientBuilder, config::Config};

    fn test_client() -> AsyncClient {
        let (client, _event_loop) = ClientBuilder::from_config(&Config::default())
            .unwrap()
            .build();
        client
    }

    #[test]
    fn qos_mapping() {
        assert!(matches!(qos_from_u8(0), Ok(QoS::AtMostOnce)));
        assert!(matches!(qos_from_u8(1), Ok(QoS::AtLeastOnce)));
        assert!(matches!(qos_from_u8(2), Ok(QoS::ExactlyOnce)));
        assert!(qos_from_u8(3).is_err());
    }

    #[tokio::test]
    async fn publisher_binds_topic() {
        let metadata = EndpointMetadata {
            qos: 0,
            topic: "topic/temperature".into(),
            retain: false,
        };
        let publisher = Publisher::new(test_client(), metadata).unwrap();
        assert_eq!(publisher.topic(), "topic/temperature");
    }

    #[tokio::test]
    async fn invalid_qos_rejected() {
        let metadata = EndpointMetadata {
            qos: 9,
            topic: "topic/temperature".into(),
            retain: false,
        };
        assert!(Publisher::new(test_client(), metadata).is_err());
    }

    #[tokio::test]
    async fn empty_topic_rejected() {
        let metadata = EndpointMetadata {
            qos: 0,
            topic: String::new(),
            retain: false,
        };
        assert!(Publisher::new(test_client(), metadata).is_err());
    }
}
