//! Common timeline shared by CPU samples and power readings
//!
//! Every timestamp inside the engine is an integer count of microseconds on
//! the CPU profiler's clock. Sensor records may use a different unit or
//! epoch; [`ClockAlignment`] maps them onto this timeline once, at
//! `PowerProfile` construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in microseconds on the CPU profiler's clock
pub type Micros = i64;

/// Microseconds per second, applied only at the final energy multiplication
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Closed time range `[start, end]` in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: Micros,
    pub end: Micros,
}

impl TimeSpan {
    pub fn new(start: Micros, end: Micros) -> Self {
        Self { start, end }
    }

    /// Length of the span; zero when `end <= start`
    pub fn duration_us(&self) -> u64 {
        self.end.saturating_sub(self.start).max(0) as u64
    }

    /// Boundary-inclusive containment test
    pub fn contains(&self, t: Micros) -> bool {
        self.start <= t && t <= self.end
    }

    /// True when `other` lies entirely within this span (bounds inclusive)
    pub fn encloses(&self, other: &TimeSpan) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Span widened by `margin_us` on both sides
    pub fn widened(&self, margin_us: u64) -> TimeSpan {
        let margin = i64::try_from(margin_us).unwrap_or(i64::MAX);
        TimeSpan {
            start: self.start.saturating_sub(margin),
            end: self.end.saturating_add(margin),
        }
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}us, {}us]", self.start, self.end)
    }
}

/// Unit of raw sensor timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    #[default]
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    fn micros_per_unit(self) -> Option<i64> {
        match self {
            TimeUnit::Nanoseconds => None,
            TimeUnit::Microseconds => Some(1),
            TimeUnit::Milliseconds => Some(1_000),
            TimeUnit::Seconds => Some(1_000_000),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        };
        f.write_str(suffix)
    }
}

/// Mapping from raw sensor timestamps onto the CPU timeline
///
/// `aligned = convert(raw, unit) + offset_us`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockAlignment {
    pub unit: TimeUnit,
    pub offset_us: i64,
}

impl ClockAlignment {
    /// Identity alignment: sensor already reports CPU-clock microseconds
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(unit: TimeUnit, offset_us: i64) -> Self {
        Self { unit, offset_us }
    }

    /// Convert a raw sensor timestamp to CPU-clock microseconds.
    ///
    /// Returns `None` on overflow. Nanosecond inputs are floored to the
    /// containing microsecond, so two readings less than 1us apart map to the
    /// same timestamp and `PowerProfile::from_raw` rejects them.
    pub fn to_micros(&self, raw: i64) -> Option<Micros> {
        let micros = match self.unit.micros_per_unit() {
            Some(factor) => raw.checked_mul(factor)?,
            None => raw.div_euclid(1_000),
        };
        micros.checked_add(self.offset_us)
    }

    /// Raw-unit range that contains every sample whose aligned timestamp
    /// falls inside `span`. Coarser units round outward.
    pub fn to_source_range(&self, span: TimeSpan) -> (i64, i64) {
        let start = span.start.saturating_sub(self.offset_us);
        let end = span.end.saturating_sub(self.offset_us);
        match self.unit.micros_per_unit() {
            Some(factor) => (start.div_euclid(factor), ceil_div(end, factor)),
            None => (start.saturating_mul(1_000), end.saturating_mul(1_000).saturating_add(999)),
        }
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let q = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        q
    } else {
        q + 1
    }
}
