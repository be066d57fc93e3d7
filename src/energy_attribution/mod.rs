// Energy attribution for sampled CPU profiles
//
// Objective: credit measured energy to the call-tree node that was on-CPU
// while it was drawn.
//
// Each consecutive pair of CPU samples defines an interval owned by the
// earlier sample's node. The power curve (piecewise-linear through the
// sensor readings) is integrated over that interval with the trapezoid rule
// and the result is added to the node's self energy. Inclusive energy is a
// separate post-order rollup, so self and inclusive totals never mix.

mod attribution;
mod hotspot;
mod integrate;

pub use attribution::{attribute, AttributionOptions, EnergyAttribution, NodeEnergy};
pub use hotspot::{identify_hotspots, Hotspot, HOTSPOT_THRESHOLD_PERCENT};
pub use integrate::{curve_energy_joules, interval_energy_watt_us, to_joules, Integration};
