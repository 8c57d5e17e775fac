//! The published telemetry payload.
//!
//! Downstream subscribers parse this text, so the shape is a wire contract:
//! `ADC: <uint>, Temp: <celsius:2dp>°C / <fahrenheit:2dp>°F`, two decimal
//! places in both temperature fields. Degenerate model output (NaN,
//! infinities) is formatted as-is rather than guarded.

use std::fmt;

use super::{decoder::Sample, thermistor::Temperature};

/// One reading ready for publication: the raw sample plus its derived
/// temperature. Built, published, and discarded within a single loop
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryMessage {
    sample: Sample,
    temperature: Temperature,
}

impl TelemetryMessage {
    pub fn new(sample: Sample, temperature: Temperature) -> Self {
        Self {
            sample,
            temperature,
        }
    }

    pub fn sample(&self) -> Sample {
        self.sample
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }
}

impl fmt::Display for TelemetryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ADC: {}, Temp: {:.2}°C / {:.2}°F",
            self.sample, self.temperature.celsius, self.temperature.fahrenheit
        )
    }
}
