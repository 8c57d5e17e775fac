//! Configuration for the published telemetry stream.

use serde::{Deserialize, Serialize};
use thermbridge_mqtt::EndpointMetadata;
use validator::Validate;

/// Publishing settings for the temperature reading stream.
///
/// Defaults to `topic/temperature` at QoS 0, non-retained: a dropped
/// reading is acceptable because a fresher one follows shortly.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Topic, QoS, and retain flag for readings.
    #[validate(nested)]
    pub metadata: EndpointMetadata,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            metadata: EndpointMetadata {
                qos: 0,
                topic: "topic/temperature".to_string(),
                retain: false,
            },
        }
    }
}
