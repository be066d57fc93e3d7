//! Temporal coverage check between a CPU profile and a power series
//!
//! Attribution only runs over sensor data that fully spans the profile.
//! Nothing here widens, truncates or extrapolates; an uncovered profile is a
//! typed failure naming the missing margin on each side.

use crate::cpu_profile::CpuProfile;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::error::{CoverageSide, EngineError, Result};
use crate::power_profile::PowerProfile;
use crate::timeline::TimeSpan;

/// How far sensor data extends past each end of the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageSlack {
    pub leading_us: u64,
    pub trailing_us: u64,
}

/// Proof that a power series covers a CPU profile
///
/// Only [`validate_coverage`] constructs this, and the attribution engine
/// accepts nothing else, so energy cannot be attributed over unvalidated
/// data.
#[derive(Debug, Clone, Copy)]
pub struct CoveredProfiles<'a> {
    cpu: &'a CpuProfile,
    power: &'a PowerProfile,
    slack: CoverageSlack,
}

impl<'a> CoveredProfiles<'a> {
    pub fn cpu(&self) -> &'a CpuProfile {
        self.cpu
    }

    pub fn power(&self) -> &'a PowerProfile {
        self.power
    }

    pub fn slack(&self) -> CoverageSlack {
        self.slack
    }
}

/// Check that `sensor` encloses `cpu` (bounds inclusive)
///
/// Used both on the requested sensor window before fetching and on the
/// fetched series itself.
pub fn check_window(cpu: TimeSpan, sensor: TimeSpan) -> Result<CoverageSlack> {
    let leading_gap = gap(sensor.start, cpu.start);
    let trailing_gap = gap(cpu.end, sensor.end);

    let side = match (leading_gap > 0, trailing_gap > 0) {
        (false, false) => {
            return Ok(CoverageSlack {
                leading_us: gap(cpu.start, sensor.start),
                trailing_us: gap(sensor.end, cpu.end),
            })
        }
        (true, false) => CoverageSide::Leading,
        (false, true) => CoverageSide::Trailing,
        (true, true) => CoverageSide::Both,
    };

    Err(EngineError::InsufficientCoverage {
        side,
        leading_us: leading_gap,
        trailing_us: trailing_gap,
        cpu_start: cpu.start,
        cpu_end: cpu.end,
        power_start: sensor.start,
        power_end: sensor.end,
    })
}

/// Validate that `power` spans `cpu` before attribution
///
/// # Example
/// ```
/// use vatio::coverage::validate_coverage;
/// use vatio::cpu_profile::{CpuProfile, CpuSample, ProfileOptions, RawCpuNode};
/// use vatio::diagnostics::NullSink;
/// use vatio::power_profile::{PowerProfile, PowerSample};
///
/// let cpu = CpuProfile::new(
///     vec![RawCpuNode::new(1, "main", vec![])],
///     vec![CpuSample::new(0, 1), CpuSample::new(3000, 1)],
///     ProfileOptions::default(),
/// ).unwrap();
/// let power = PowerProfile::new(vec![
///     PowerSample::new(500, 10.0),
///     PowerSample::new(2500, 10.0),
/// ]).unwrap();
///
/// let err = validate_coverage(&cpu, &power, &NullSink).unwrap_err();
/// assert!(err.is_coverage_gap());
/// ```
pub fn validate_coverage<'a>(
    cpu: &'a CpuProfile,
    power: &'a PowerProfile,
    diagnostics: &dyn DiagnosticSink,
) -> Result<CoveredProfiles<'a>> {
    let slack = check_window(cpu.span(), power.span())?;
    diagnostics.record(&DiagnosticEvent::CoverageValidated {
        leading_slack_us: slack.leading_us,
        trailing_slack_us: slack.trailing_us,
    });
    Ok(CoveredProfiles { cpu, power, slack })
}

/// `later - earlier`, clamped at zero
fn gap(later: i64, earlier: i64) -> u64 {
    (i128::from(later) - i128::from(earlier)).clamp(0, i128::from(u64::MAX)) as u64
}
