//! Threshold flow accumulation (TFA) ranges.

use std::str::FromStr;

use thiserror::Error;

/// Errors parsing or constructing a TFA range.
#[derive(Debug, Error)]
pub enum TfaRangeError {
    /// Input was not MIN:MAX:STEP.
    #[error("Could not parse TFA range from {input:?} (expected MIN:MAX:STEP, e.g. 500:10000:200)")]
    Unparseable {
        /// The offending input string.
        input: String,
    },

    /// Step must be positive.
    #[error("TFA step must be positive, got {0}")]
    NonPositiveStep(i64),

    /// Min must not exceed max.
    #[error("TFA min {min} exceeds max {max}")]
    Inverted {
        /// Range minimum.
        min: i64,
        /// Range maximum.
        max: i64,
    },
}

/// An inclusive range of threshold flow accumulation values.
///
/// One stream raster is extracted per value. The maximum is included
/// when reachable by stepping: `500:1100:300` yields 500, 800, 1100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfaRange {
    /// First threshold.
    pub min: i64,
    /// Last threshold, inclusive when reachable by `step`.
    pub max: i64,
    /// Increment between thresholds.
    pub step: i64,
}

impl TfaRange {
    /// Create a range, validating min/max/step.
    pub fn new(min: i64, max: i64, step: i64) -> Result<Self, TfaRangeError> {
        if step <= 0 {
            return Err(TfaRangeError::NonPositiveStep(step));
        }
        if min > max {
            return Err(TfaRangeError::Inverted { min, max });
        }
        Ok(Self { min, max, step })
    }

    /// Iterate the thresholds in ascending order.
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        (self.min..=self.max).step_by(self.step as usize)
    }
}

impl FromStr for TfaRange {
    type Err = TfaRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i64> = s
            .split(':')
            .map(|part| part.trim().parse::<i64>())
            .collect::<Result<_, _>>()
            .map_err(|_| TfaRangeError::Unparseable {
                input: s.to_string(),
            })?;

        match parts.as_slice() {
            [min, max, step] => TfaRange::new(*min, *max, *step),
            _ => Err(TfaRangeError::Unparseable {
                input: s.to_string(),
            }),
        }
    }
}
