// Trapezoid-rule integration of the power curve
//
// All arithmetic here stays in watt-microseconds. Conversion to joules
// happens once, when totals leave the engine, so thousands of tiny intervals
// do not each pick up a rounding step.

use crate::error::Result;
use crate::power_profile::PowerProfile;
use crate::timeline::{Micros, MICROS_PER_SECOND};
use serde::{Deserialize, Serialize};

/// Which points of the power curve an interval integral samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Integration {
    /// One trapezoid over the interval endpoints
    Endpoints,
    /// Split the interval at every sensor reading strictly inside it; exact
    /// for the piecewise-linear curve through the readings
    #[default]
    SensorKnots,
}

/// Energy over `[t0, t1]` in watt-microseconds
///
/// # Errors
/// `OutOfRange` if either endpoint lies outside the power series.
pub fn interval_energy_watt_us(
    power: &PowerProfile,
    t0: Micros,
    t1: Micros,
    integration: Integration,
) -> Result<f64> {
    let p0 = power.power_at(t0)?;
    let p1 = power.power_at(t1)?;
    if t1 <= t0 {
        return Ok(0.0);
    }

    let interior = match integration {
        Integration::Endpoints => &[][..],
        Integration::SensorKnots => power.interior(t0, t1),
    };

    let mut total = 0.0;
    let (mut prev_t, mut prev_w) = (t0, p0);
    for knot in interior {
        total += trapezoid(prev_t, prev_w, knot.timestamp, knot.watts);
        prev_t = knot.timestamp;
        prev_w = knot.watts;
    }
    total += trapezoid(prev_t, prev_w, t1, p1);

    Ok(total)
}

/// Integral of the full piecewise-linear power curve over `[t0, t1]`, in joules
pub fn curve_energy_joules(power: &PowerProfile, t0: Micros, t1: Micros) -> Result<f64> {
    Ok(to_joules(interval_energy_watt_us(
        power,
        t0,
        t1,
        Integration::SensorKnots,
    )?))
}

pub fn to_joules(watt_us: f64) -> f64 {
    watt_us / MICROS_PER_SECOND
}

fn trapezoid(t0: Micros, w0: f64, t1: Micros, w1: f64) -> f64 {
    (w0 + w1) * 0.5 * (t1 - t0) as f64
}
