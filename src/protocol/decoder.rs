//! # Telemetry Line Decoder
//!
//! Decodes one telemetry line into a [`GyroSample`].

use super::*;
use crate::error::{AirMouseError, Result};

/// Decode a telemetry line
///
/// Trailing `\r`/`\n` are ignored. Only fields 3, 4 and 5 are interpreted;
/// the others are passed through untouched on the wire and never parsed.
///
/// # Arguments
///
/// * `line` - One line as received from the device
///
/// # Returns
///
/// * `Result<GyroSample>` - Roll, pitch and yaw rates
///
/// # Errors
///
/// Returns [`AirMouseError::MalformedLine`] if:
/// - The line does not have exactly 7 fields
/// - A rate field is not a finite decimal number (`nan`, `inf` are rejected)
///
/// # Examples
///
/// ```
/// use airmouse_bridge::protocol::decoder::decode_line;
///
/// let sample = decode_line("0,0,0,1.5,-2.0,0.25,0\n").unwrap();
/// assert_eq!(sample.roll, 1.5);
/// assert_eq!(sample.pitch, -2.0);
/// assert_eq!(sample.yaw, 0.25);
/// ```
pub fn decode_line(line: &str) -> Result<GyroSample> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

    if fields.len() != TELEMETRY_FIELD_COUNT {
        return Err(AirMouseError::MalformedLine(format!(
            "expected {} fields, got {}",
            TELEMETRY_FIELD_COUNT,
            fields.len()
        )));
    }

    Ok(GyroSample {
        roll: parse_rate(fields[ROLL_RATE_FIELD], "roll")?,
        pitch: parse_rate(fields[PITCH_RATE_FIELD], "pitch")?,
        yaw: parse_rate(fields[YAW_RATE_FIELD], "yaw")?,
    })
}

fn parse_rate(field: &str, name: &str) -> Result<f64> {
    let value = field.trim().parse::<f64>().map_err(|e| {
        AirMouseError::MalformedLine(format!("invalid {} rate {:?}: {}", name, field, e))
    })?;

    // `parse` also accepts nan and inf
    if !value.is_finite() {
        return Err(AirMouseError::MalformedLine(format!(
            "non-finite {} rate {:?}",
            name, field
        )));
    }
    Ok(value)
}
