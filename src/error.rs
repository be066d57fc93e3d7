//! Typed failures raised by the attribution core
//!
//! Every variant aborts the current report computation. None of them are
//! retried locally; the caller decides whether to re-fetch a wider sensor
//! range, abort, or surface the error.

use crate::Micros;
use std::fmt;
use thiserror::Error;

/// Side of the CPU profile that the power series fails to cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageSide {
    /// Power data starts after the first CPU sample
    Leading,
    /// Power data ends before the last CPU sample
    Trailing,
    /// Both ends are uncovered
    Both,
}

impl fmt::Display for CoverageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageSide::Leading => write!(f, "leading"),
            CoverageSide::Trailing => write!(f, "trailing"),
            CoverageSide::Both => write!(f, "leading and trailing"),
        }
    }
}

/// Errors that can occur while building profiles, attributing energy or
/// assembling a report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Malformed CPU profile: {0}")]
    MalformedProfile(String),

    #[error("Malformed sensor data: {0}")]
    MalformedSensorData(String),

    #[error(
        "Insufficient sensor coverage ({side}): missing {leading_us}us before profile start \
         and {trailing_us}us after profile end (profile [{cpu_start}, {cpu_end}], \
         sensor [{power_start}, {power_end}])"
    )]
    InsufficientCoverage {
        side: CoverageSide,
        leading_us: u64,
        trailing_us: u64,
        cpu_start: Micros,
        cpu_end: Micros,
        power_start: Micros,
        power_end: Micros,
    },

    #[error("Power query at {timestamp}us outside sensor range [{start}, {end}]")]
    OutOfRange {
        timestamp: Micros,
        start: Micros,
        end: Micros,
    },

    #[error("Profile has zero duration (all samples at {at}us)")]
    DegenerateDuration { at: Micros },
}

impl EngineError {
    /// True for failures that indicate a defect in the engine itself rather
    /// than bad input data.
    ///
    /// `OutOfRange` can only surface after coverage validation passed, so it
    /// is never a user-facing retry condition.
    pub fn is_internal(&self) -> bool {
        matches!(self, EngineError::OutOfRange { .. })
    }

    /// True when re-fetching the sensor series over a wider range might succeed
    pub fn is_coverage_gap(&self) -> bool {
        matches!(self, EngineError::InsufficientCoverage { .. })
    }
}

/// Result type for attribution core operations
pub type Result<T> = std::result::Result<T, EngineError>;
