//! Thermistor temperature model.
//!
//! Converts a raw ADC sample into a physical temperature for an NTC
//! thermistor in a voltage divider, using the simplified beta form of the
//! Steinhart-Hart equation. The circuit constants are properties of the
//! sensor hardware and are fixed, not configurable.

use super::decoder::Sample;

/// Supply voltage across the divider (V).
const VCC: f64 = 5.0;
/// Fixed series resistor (Ω).
const R_SERIES: f64 = 1000.0;
/// Thermistor reference resistance at `T0` (Ω).
const RT0: f64 = 1000.0;
/// Reference temperature, 25 °C in Kelvin.
const T0: f64 = 25.0 + 273.15;
/// Beta coefficient of the thermistor (K).
const B: f64 = 3977.0;
/// ADC full-scale reading (16-bit).
const ADC_MAX: f64 = 65535.0;

/// A derived temperature reading in both customary units.
///
/// Both fields are NaN when the model is undefined for the input sample
/// (see [`convert`]); that is a valid, publishable reading, not an error.
#[derive(Debug, Clone, Copy)]
pub struct Temperature {
    pub celsius: f64,
    pub fahrenheit: f64,
}

/// Computes the temperature corresponding to a raw ADC sample.
///
/// Steps:
/// 1. voltage across the thermistor from the ADC ratio
/// 2. thermistor resistance from the divider equation
/// 3. Kelvin temperature from the beta equation
/// 4. Celsius and Fahrenheit conversions
///
/// A sample of zero makes the divider equation degenerate (division by
/// zero); the result is NaN in both fields. A full-scale sample produces an
/// infinite resistance which flows through the logarithm to a finite
/// absolute-zero reading. Neither case panics, and the function is a pure
/// deterministic map: equal samples give bit-identical results.
pub fn convert(sample: Sample) -> Temperature {
    // Voltage across the thermistor
    let v_rt = VCC * f64::from(sample) / ADC_MAX;

    if v_rt == 0.0 {
        // Model undefined at zero volts
        return Temperature {
            celsius: f64::NAN,
            fahrenheit: f64::NAN,
        };
    }

    // Thermistor resistance from the divider
    let r_t = v_rt * R_SERIES / (VCC - v_rt);

    // Beta-form Steinhart-Hart
    let ln = (r_t / RT0).ln();
    let kelvin = 1.0 / ((ln / B) + (1.0 / T0));

    let celsius = kelvin - 273.15;
    let fahrenheit = celsius * 9.0 / 5.0 + 32.0;

    Temperature {
        celsius,
        fahrenheit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sample_is_nan_in_both_units() {
        let t = convert(0);
        assert!(t.celsius.is_nan());
        assert!(t.fahrenheit.is_nan());
    }

    #[test]
    fn midrange_samples_are_finite() {
        for sample in [1, 100, 10_000, 30_000, 50_000, 65_534] {
            let t = convert(sample);
            assert!(t.celsius.is_finite(), "sample {sample} gave {:?}", t);
            assert!(t.fahrenheit.is_finite(), "sample {sample} gave {:?}", t);
        }
    }

    #[test]
    fn fahrenheit_tracks_celsius() {
        for sample in [1, 500, 10_000, 30_000, 65_000] {
            let t = convert(sample);
            let expected = t.celsius * 9.0 / 5.0 + 32.0;
            assert!(
                (t.fahrenheit - expected).abs() < 1e-9,
                "sample {sample}: {} vs {}",
                t.fahrenheit,
                expected
            );
        }
    }

    #[test]
    fn reference_point_reads_room_temperature() {
        // At half scale the divider is balanced, the thermistor reads RT0,
        // and the model lands exactly on the 25 °C reference.
        let t = convert(32_768);
        assert!((t.celsius - 25.0).abs() < 0.1, "got {}", t.celsius);
    }

    #[test]
    fn known_sample_value() {
        // 30000 counts is slightly below the balance point, so the reading
        // lands a few degrees above the 25 °C reference.
        let t = convert(30_000);
        assert!((28.0..30.0).contains(&t.celsius), "got {}", t.celsius);
    }

    #[test]
    fn temperature_decreases_with_rising_sample() {
        // NTC in the low side of the divider: more counts means more
        // resistance, which means colder.
        let warm = convert(10_000);
        let mid = convert(30_000);
        let cold = convert(60_000);
        assert!(warm.celsius > mid.celsius);
        assert!(mid.celsius > cold.celsius);
    }

    #[test]
    fn full_scale_sample_degenerates_to_absolute_zero() {
        // v_rt == VCC: infinite resistance, the logarithm saturates, and
        // the beta equation collapses to 0 K without panicking.
        let t = convert(65_535);
        assert!((t.celsius - -273.15).abs() < 1e-9, "got {}", t.celsius);
        assert!((t.fahrenheit - -459.67).abs() < 1e-9, "got {}", t.fahrenheit);
    }

    #[test]
    fn conversion_is_deterministic() {
        for sample in [0, 1, 30_000, 65_535] {
            let a = convert(sample);
            let b = convert(sample);
            assert_eq!(a.celsius.to_bits(), b.celsius.to_bits());
            assert_eq!(a.fahrenheit.to_bits(), b.fahrenheit.to_bits());
        }
    }
}
