//! The handful of genuinely recoverable, caller-facing error conditions.
//! Everything else in this crate is a contract violation and panics via
//! `debug_assert!`/`assert!` instead: a mismatched scan length handed in
//! from outside, or a config struct a host deserialized from its own file
//! and never validated, is data a caller can get wrong and recover from,
//! so those get a `Result`; an internal arena index the crate itself
//! allocated is not.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlamError {
    #[error("measurement has {actual} ranges, expected {expected}")]
    MeasurementSizeMismatch { expected: usize, actual: usize },

    #[error("sensor model size {size} is not a multiple of samples {samples}")]
    SensorSizeNotDivisible { size: u32, samples: u32 },

    #[error("sensor model samples must be at least 1")]
    SensorSamplesZero,

    #[error("motion model coefficient {field} must be non-negative, got {value}")]
    MotionCoefficientNegative { field: &'static str, value: f64 },
}
