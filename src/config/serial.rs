//! Configuration for the serial sensor source.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for the serial device the sensor stream arrives on.
///
/// The device path can additionally be overridden by the bridge's single
/// positional command-line argument, which takes precedence over both the
/// file and the default.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SerialConfig {
    /// Path of the serial device. USB CDC-ACM microcontrollers typically
    /// enumerate as `/dev/ttyACM0` or `/dev/ttyUSB0`.
    #[validate(length(min = 1, message = "Serial device path must not be empty"))]
    pub device: String,

    /// Line speed in baud. The sensor firmware transmits at 9600.
    #[validate(range(min = 1, message = "Baud rate must be positive"))]
    pub baud_rate: u32,

    /// Seconds to wait after a failed serial read before the next attempt.
    #[validate(range(
        min = 1,
        max = 60,
        message = "Read retry delay must be between 1 and 60 seconds"
    ))]
    pub read_retry_delay: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            device: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            read_retry_delay: 1,
        }
    }
}
