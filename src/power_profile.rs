//! Power sample series
//!
//! Normalizes a raw sensor record into a strictly increasing sequence of
//! `(timestamp, watts)` readings on the CPU clock, and answers point queries
//! by linear interpolation between the bracketing readings.

use crate::error::{EngineError, Result};
use crate::timeline::{ClockAlignment, Micros, TimeSpan};
use serde::{Deserialize, Serialize};

/// One reading as stored by the sensor collector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPowerSample {
    /// Raw timestamp in the collector's unit
    pub timestamp: i64,
    /// Instantaneous power in watts
    #[serde(alias = "watts")]
    pub power: f64,
}

impl RawPowerSample {
    pub fn new(timestamp: i64, power: f64) -> Self {
        Self { timestamp, power }
    }
}

/// Normalized reading on the CPU timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub timestamp: Micros,
    pub watts: f64,
}

impl PowerSample {
    pub fn new(timestamp: Micros, watts: f64) -> Self {
        Self { timestamp, watts }
    }
}

/// Ordered power readings spanning `[start_time, end_time]`
#[derive(Debug, Clone, PartialEq)]
pub struct PowerProfile {
    samples: Vec<PowerSample>,
}

impl PowerProfile {
    /// Align raw readings onto the CPU clock and validate them
    pub fn from_raw(raw: &[RawPowerSample], alignment: ClockAlignment) -> Result<Self> {
        let samples = raw
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let timestamp = alignment.to_micros(r.timestamp).ok_or_else(|| {
                    EngineError::MalformedSensorData(format!(
                        "timestamp {} of reading {} overflows after alignment",
                        r.timestamp, i
                    ))
                })?;
                Ok(PowerSample::new(timestamp, r.power))
            })
            .collect::<Result<Vec<_>>>()?;

        // Sub-microsecond readings collapse onto one timestamp after flooring
        for (i, pair) in samples.windows(2).enumerate() {
            if pair[0].timestamp == pair[1].timestamp && raw[i].timestamp != raw[i + 1].timestamp {
                return Err(EngineError::MalformedSensorData(format!(
                    "readings {} and {} ({} and {} {}) fall in the same microsecond {}us; \
                     sensors sampling faster than 1 MHz are not supported",
                    i,
                    i + 1,
                    raw[i].timestamp,
                    raw[i + 1].timestamp,
                    alignment.unit,
                    pair[0].timestamp
                )));
            }
        }

        Self::new(samples)
    }

    /// Parse a JSON array of `{timestamp, power}` readings
    pub fn from_json(json: &str, alignment: ClockAlignment) -> Result<Self> {
        let raw: Vec<RawPowerSample> = serde_json::from_str(json)
            .map_err(|e| EngineError::MalformedSensorData(format!("invalid JSON: {}", e)))?;
        Self::from_raw(&raw, alignment)
    }

    /// Validate already-aligned readings
    ///
    /// # Errors
    /// `MalformedSensorData` with fewer than two readings, non-increasing
    /// timestamps, a negative or non-finite reading, or a span whose length
    /// does not fit in `i64` microseconds.
    pub fn new(samples: Vec<PowerSample>) -> Result<Self> {
        if samples.len() < 2 {
            return Err(EngineError::MalformedSensorData(format!(
                "need at least 2 readings to integrate, got {}",
                samples.len()
            )));
        }

        for (i, sample) in samples.iter().enumerate() {
            if !sample.watts.is_finite() || sample.watts < 0.0 {
                return Err(EngineError::MalformedSensorData(format!(
                    "reading {} at {}us has invalid power {}",
                    i, sample.timestamp, sample.watts
                )));
            }
        }

        for (i, pair) in samples.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                let kind = if pair[1].timestamp == pair[0].timestamp {
                    "duplicate"
                } else {
                    "decreasing"
                };
                return Err(EngineError::MalformedSensorData(format!(
                    "{} timestamp at reading {}: {}us after {}us",
                    kind,
                    i + 1,
                    pair[1].timestamp,
                    pair[0].timestamp
                )));
            }
        }

        let (first, last) = (samples[0].timestamp, samples[samples.len() - 1].timestamp);
        if last.checked_sub(first).is_none() {
            return Err(EngineError::MalformedSensorData(format!(
                "span [{}us, {}us] exceeds the representable duration",
                first, last
            )));
        }

        Ok(Self { samples })
    }

    pub fn start_time(&self) -> Micros {
        self.samples[0].timestamp
    }

    pub fn end_time(&self) -> Micros {
        self.samples[self.samples.len() - 1].timestamp
    }

    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.start_time(), self.end_time())
    }

    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; a profile holds at least two readings
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Power at `t`, linearly interpolated between the bracketing readings.
    ///
    /// Exact at reading timestamps.
    ///
    /// # Errors
    /// `OutOfRange` if `t` lies outside `[start_time, end_time]`.
    pub fn power_at(&self, t: Micros) -> Result<f64> {
        if !self.span().contains(t) {
            return Err(EngineError::OutOfRange {
                timestamp: t,
                start: self.start_time(),
                end: self.end_time(),
            });
        }

        let idx = self.samples.partition_point(|s| s.timestamp < t);
        let right = self.samples[idx];
        if right.timestamp == t {
            return Ok(right.watts);
        }

        // t > start_time here, so idx >= 1
        let left = self.samples[idx - 1];
        let fraction = (t - left.timestamp) as f64 / (right.timestamp - left.timestamp) as f64;
        Ok(left.watts + (right.watts - left.watts) * fraction)
    }

    /// Readings strictly inside `(t0, t1)`
    pub fn interior(&self, t0: Micros, t1: Micros) -> &[PowerSample] {
        let lo = self.samples.partition_point(|s| s.timestamp <= t0);
        let hi = self.samples.partition_point(|s| s.timestamp < t1);
        if lo < hi {
            &self.samples[lo..hi]
        } else {
            &[]
        }
    }
}
