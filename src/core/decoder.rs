//! Decoding of raw serial lines into ADC sample values.
//!
//! The sensor firmware writes one unsigned decimal number per line. The
//! decoder is total over all input strings and pure: it never performs I/O
//! and leaves logging of rejected lines to the caller.

use thiserror::Error;

/// A raw ADC sample as transmitted by the sensor. The thermistor model
/// assumes a 16-bit full scale (0..=65535); wider values are accepted here
/// and produce non-physical model output downstream, matching the device
/// contract.
pub type Sample = u32;

/// Reasons a serial line does not yield a sample.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line was empty after trimming whitespace. Benign noise on a
    /// freshly opened port.
    #[error("empty line received from serial port")]
    EmptyLine,

    /// The line held anything other than a bare unsigned decimal number.
    #[error("invalid ADC value '{input}': {source}")]
    Invalid {
        input: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Parses one line of serial text into a sample.
///
/// Leading and trailing whitespace (including the newline terminator) is
/// trimmed first. The entire remaining token must parse as a base-10
/// unsigned integer; a numeric prefix with trailing garbage is rejected
/// outright rather than truncated.
///
/// # Errors
///
/// `DecodeError::EmptyLine` for whitespace-only input,
/// `DecodeError::Invalid` for anything that is not a bare unsigned number
/// (including negatives and overflow).
pub fn decode(line: &str) -> Result<Sample, DecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::EmptyLine);
    }

    trimmed.parse::<Sample>().map_err(|source| DecodeError::Invalid {
        input: trimmed.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number_decodes() {
        assert_eq!(decode("1234").unwrap(), 1234);
    }

    #[test]
    fn whitespace_and_newline_are_trimmed() {
        assert_eq!(decode(" 1234 \n").unwrap(), 1234);
        assert_eq!(decode("30000\r\n").unwrap(), 30000);
    }

    #[test]
    fn empty_variants_fail_with_empty_line() {
        assert!(matches!(decode(""), Err(DecodeError::EmptyLine)));
        assert!(matches!(decode("   "), Err(DecodeError::EmptyLine)));
        assert!(matches!(decode("\n"), Err(DecodeError::EmptyLine)));
    }

    #[test]
    fn trailing_garbage_rejected() {
        assert!(matches!(decode("12ab"), Err(DecodeError::Invalid { .. })));
    }

    #[test]
    fn non_numeric_rejected() {
        assert!(matches!(decode("abc"), Err(DecodeError::Invalid { .. })));
    }

    #[test]
    fn negative_rejected() {
        assert!(matches!(decode("-5"), Err(DecodeError::Invalid { .. })));
    }

    #[test]
    fn overflow_rejected() {
        assert!(matches!(
            decode("99999999999999999999"),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn full_scale_value_decodes() {
        assert_eq!(decode("65535").unwrap(), 65535);
        assert_eq!(decode("0").unwrap(), 0);
    }

    #[test]
    fn error_carries_offending_text() {
        let err = decode("  12ab\n").unwrap_err();
        assert!(err.to_string().contains("'12ab'"));
    }
}
