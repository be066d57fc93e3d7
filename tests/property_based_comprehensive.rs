//! Property-based tests for the attribution engine
//!
//! Core properties:
//! 1. Energy conservation across nodes
//! 2. Inclusive rollup at the root equals the total
//! 3. Interpolation is exact at sensor readings
//! 4. Coverage accepts exactly the enclosing windows
//! 5. Repeated runs are bit-identical

use proptest::prelude::*;
use vatio::coverage::{check_window, validate_coverage};
use vatio::cpu_profile::{
    CpuProfile, CpuSample, DuplicateTimestampPolicy, ProfileOptions, RawCpuNode,
};
use vatio::diagnostics::NullSink;
use vatio::energy_attribution::{
    attribute, curve_energy_joules, AttributionOptions, EnergyAttribution, Integration,
};
use vatio::power_profile::{PowerProfile, PowerSample};
use vatio::TimeSpan;

#[derive(Debug)]
struct Run {
    nodes: Vec<RawCpuNode>,
    samples: Vec<CpuSample>,
    power: Vec<PowerSample>,
}

/// Random tree, samples on it, and a power series covering them with margin
fn arb_run() -> impl Strategy<Value = Run> {
    (
        prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        prop::collection::vec((0i64..500, any::<prop::sample::Index>()), 2..40),
        prop::collection::vec((1i64..300, 0.0f64..50.0), 0..30),
        0.0f64..50.0,
    )
        .prop_map(|(parents, steps, readings, first_watts)| {
            let node_count = parents.len() + 1;
            let mut children = vec![Vec::new(); node_count];
            for (k, parent) in parents.iter().enumerate() {
                // node k + 2 hangs below one of the nodes created before it
                let parent_id = parent.index(k + 1) + 1;
                children[parent_id - 1].push((k + 2) as u64);
            }
            let nodes = children
                .into_iter()
                .enumerate()
                .map(|(i, kids)| RawCpuNode::new(i as u64 + 1, &format!("fn{}", i + 1), kids))
                .collect();

            let mut t = 1_000;
            let samples: Vec<CpuSample> = steps
                .iter()
                .map(|(delta, node)| {
                    t += delta;
                    CpuSample::new(t, node.index(node_count) as u64 + 1)
                })
                .collect();
            let cpu_end = samples[samples.len() - 1].timestamp;

            let mut ts = samples[0].timestamp - 50;
            let mut power = vec![PowerSample::new(ts, first_watts)];
            for (gap, watts) in readings {
                ts += gap;
                power.push(PowerSample::new(ts, watts));
            }
            power.push(PowerSample::new(ts.max(cpu_end) + 1, 7.5));

            Run {
                nodes,
                samples,
                power,
            }
        })
}

fn options() -> ProfileOptions {
    ProfileOptions {
        duplicate_timestamps: DuplicateTimestampPolicy::ZeroDuration,
    }
}

fn run_attribution(run: &Run, integration: Integration) -> (CpuProfile, PowerProfile, EnergyAttribution) {
    let cpu = CpuProfile::new(run.nodes.clone(), run.samples.clone(), options()).unwrap();
    let power = PowerProfile::new(run.power.clone()).unwrap();
    let attribution = {
        let covered = validate_coverage(&cpu, &power, &NullSink).unwrap();
        attribute(&covered, AttributionOptions { integration }, &NullSink).unwrap()
    };
    (cpu, power, attribution)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_self_energy_sums_to_curve_integral(run in arb_run()) {
        let (cpu, power, attribution) = run_attribution(&run, Integration::SensorKnots);

        let expected = curve_energy_joules(&power, cpu.start_time(), cpu.end_time()).unwrap();
        let total: f64 = attribution.touched().map(|(_, e)| e.self_energy_joules()).sum();

        prop_assert!(close(total, expected), "sum {} != integral {}", total, expected);
        prop_assert!(close(attribution.total_energy_joules(), expected));
    }

    #[test]
    fn prop_root_inclusive_equals_total(run in arb_run()) {
        let (cpu, _power, attribution) = run_attribution(&run, Integration::SensorKnots);

        let root = attribution.inclusive_energy_joules(cpu.root_id());
        prop_assert!(close(root, attribution.total_energy_joules()));

        for node in cpu.nodes() {
            let inclusive = attribution.inclusive_energy_joules(node.id);
            let children: f64 = node
                .children
                .iter()
                .map(|&c| attribution.inclusive_energy_joules(c))
                .sum();
            prop_assert!(close(inclusive, attribution.self_energy_joules(node.id) + children));
        }
    }

    #[test]
    fn prop_self_durations_cover_span(run in arb_run()) {
        let (cpu, _power, attribution) = run_attribution(&run, Integration::Endpoints);

        let duration: u64 = attribution.touched().map(|(_, e)| e.self_duration_us).sum();
        prop_assert_eq!(duration, cpu.span().duration_us());
        prop_assert_eq!(attribution.interval_count(), cpu.samples().len() - 1);
    }

    #[test]
    fn prop_attribution_is_deterministic(run in arb_run()) {
        let (_, _, first) = run_attribution(&run, Integration::SensorKnots);
        let (_, _, second) = run_attribution(&run, Integration::SensorKnots);

        prop_assert_eq!(
            first.total_energy_joules().to_bits(),
            second.total_energy_joules().to_bits()
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_power_exact_at_readings(run in arb_run()) {
        let power = PowerProfile::new(run.power.clone()).unwrap();
        for reading in &run.power {
            prop_assert_eq!(power.power_at(reading.timestamp).unwrap(), reading.watts);
        }
    }

    #[test]
    fn prop_power_outside_range_is_error(run in arb_run(), past in 1i64..10_000) {
        let power = PowerProfile::new(run.power.clone()).unwrap();
        prop_assert!(power.power_at(power.start_time() - past).is_err());
        prop_assert!(power.power_at(power.end_time() + past).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_coverage_accepts_only_enclosing_windows(
        cpu_start in -10_000i64..10_000,
        cpu_len in 0i64..5_000,
        sensor_start in -15_000i64..15_000,
        sensor_len in 0i64..20_000,
    ) {
        let cpu = TimeSpan::new(cpu_start, cpu_start + cpu_len);
        let sensor = TimeSpan::new(sensor_start, sensor_start + sensor_len);
        let encloses = sensor.start <= cpu.start && cpu.end <= sensor.end;

        match check_window(cpu, sensor) {
            Ok(slack) => {
                prop_assert!(encloses);
                prop_assert_eq!(slack.leading_us, (cpu.start - sensor.start) as u64);
                prop_assert_eq!(slack.trailing_us, (sensor.end - cpu.end) as u64);
            }
            Err(err) => {
                prop_assert!(!encloses);
                prop_assert!(err.is_coverage_gap());
            }
        }
    }
}
