//! Sweep wire protocol
//!
//! Line classification for the analyzer's serial output. Each sweep arrives
//! as a batch of newline-terminated ASCII lines with `;`-separated fields:
//!
//! - `COARSE;<index>;<freqKHz>;<adc>` - one coarse-pass measurement
//! - `FINE;<index>;<freqKHz>;<adc>` - one fine-pass measurement
//! - `COARSE_MAX;<adc>;<freqHz>` - coarse-pass peak marker
//! - `FINE_MAX_RAW;<adc>;<freqHz>` - fine-pass raw peak marker
//! - `FINE_MAX_SMOOTHED;<adc>;<freqHz>` - fine-pass smoothed peak marker
//! - `SWEEP_DONE` - end-of-transmission sentinel
//!
//! Lines with an unknown prefix are not part of the protocol and classify
//! to `None`; lines with a known prefix but broken fields are malformed and
//! classify to an error so the caller can apply its skip policy.

use thiserror::Error;

/// End-of-transmission sentinel sent after each complete sweep.
pub const SWEEP_DONE: &str = "SWEEP_DONE";

/// Field separator used by all data and marker lines.
pub const FIELD_SEPARATOR: char = ';';

/// A single (frequency, amplitude) measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Measured frequency in kilohertz.
    pub freq_khz: u32,
    /// Raw ADC reading at that frequency.
    pub adc: u32,
}

/// One classified line of analyzer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepLine {
    /// Coarse-pass measurement with its transmit-order index.
    Coarse { index: u32, sample: Sample },
    /// Fine-pass measurement with its transmit-order index.
    Fine { index: u32, sample: Sample },
    /// Peak of the coarse pass, frequency in hertz.
    CoarseMax { adc: u32, freq_hz: u64 },
    /// Unsmoothed peak of the fine pass, frequency in hertz.
    FineMaxRaw { adc: u32, freq_hz: u64 },
    /// Moving-average peak of the fine pass, frequency in hertz.
    FineMaxSmoothed { adc: u32, freq_hz: u64 },
    /// End-of-transmission sentinel.
    SweepDone,
}

/// A line with a recognized prefix but broken fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{line:?}: expected {expected} fields, got {got}")]
    FieldCount {
        line: String,
        expected: usize,
        got: usize,
    },
    #[error("{line:?}: field {field:?} is not a number")]
    InvalidNumber { line: String, field: String },
}

/// Classify one line of analyzer output.
///
/// Returns `Ok(None)` for lines that are not part of the protocol (the
/// analyzer shares the port with its boot log), and an error for lines that
/// carry a protocol prefix but fail to parse.
pub fn classify(line: &str) -> Result<Option<SweepLine>, ProtocolError> {
    let line = line.trim();
    if line == SWEEP_DONE {
        return Ok(Some(SweepLine::SweepDone));
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    match fields[0] {
        "COARSE" | "FINE" => {
            check_field_count(line, &fields, 4)?;
            let index = parse_number(line, fields[1])?;
            let sample = Sample {
                freq_khz: parse_number(line, fields[2])?,
                adc: parse_number(line, fields[3])?,
            };
            Ok(Some(if fields[0] == "COARSE" {
                SweepLine::Coarse { index, sample }
            } else {
                SweepLine::Fine { index, sample }
            }))
        }
        "COARSE_MAX" | "FINE_MAX_RAW" | "FINE_MAX_SMOOTHED" => {
            check_field_count(line, &fields, 3)?;
            let adc = parse_number(line, fields[1])?;
            let freq_hz = parse_number(line, fields[2])?;
            Ok(Some(match fields[0] {
                "COARSE_MAX" => SweepLine::CoarseMax { adc, freq_hz },
                "FINE_MAX_RAW" => SweepLine::FineMaxRaw { adc, freq_hz },
                _ => SweepLine::FineMaxSmoothed { adc, freq_hz },
            }))
        }
        _ => Ok(None),
    }
}

fn check_field_count(line: &str, fields: &[&str], expected: usize) -> Result<(), ProtocolError> {
    if fields.len() != expected {
        return Err(ProtocolError::FieldCount {
            line: line.to_string(),
            expected,
            got: fields.len(),
        });
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(line: &str, field: &str) -> Result<T, ProtocolError> {
    field
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber {
            line: line.to_string(),
            field: field.to_string(),
        })
}
