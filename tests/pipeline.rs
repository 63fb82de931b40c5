//! End-to-end sweeps of whole machine classes, and the symmetry arithmetic
//! that makes the reduced enumeration equivalent to the raw one.

use ctm_estimator::aggregate::{complement, OutputFrequency};
use ctm_estimator::enumeration::EnumerationMode;
use ctm_estimator::estimator::ComplexityEstimator;
use ctm_estimator::{Driver, SimulationConfig};
use std::collections::{HashMap, HashSet};

fn sweep(config: SimulationConfig) -> OutputFrequency {
    Driver::new(config)
        .expect("valid config")
        .run()
        .expect("run succeeds")
        .aggregate
}

fn raw_config(n: usize, max_steps: u64) -> SimulationConfig {
    let mut config = SimulationConfig::new(n, max_steps);
    config.batch_size = 997;
    config.checkpoint_interval = 0;
    config
}

fn reduced_config(n: usize, max_steps: u64) -> SimulationConfig {
    let mut config = raw_config(n, max_steps);
    config.enumeration = EnumerationMode::Reduced;
    config
}

/// Fold fixed-blank raw counts into the dual-blank convention that
/// completion produces: `folded[s] = raw[s] + raw[complement(s)]`.
fn complement_fold(counts: &HashMap<String, u64>) -> HashMap<String, u64> {
    let mut folded = counts.clone();
    for (s, c) in counts {
        *folded.entry(complement(s)).or_default() += c;
    }
    folded
}

#[test]
fn test_blank_tape_class_two_scenario() {
    let aggregate = sweep(raw_config(2, 100));
    assert_eq!(aggregate.machines, 10_000);
    let d = aggregate.distribution().expect("halting machines exist");
    let p0 = d["0"];
    let p1 = d["1"];
    assert!(p0 + p1 >= 0.5);
    for (s, p) in &d {
        if s != "0" && s != "1" {
            assert!(*p <= p0.min(p1), "{s} outranks a single symbol");
        }
    }
    let total: f64 = d.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_raw_equals_completed_reduced_n1() {
    let raw = sweep(raw_config(1, 50));
    let reduced = sweep(reduced_config(1, 50));
    assert!(reduced.completion_applied);
    assert_eq!(reduced.machines, 2 * raw.machines);
    let folded = complement_fold(&raw.counts);
    assert_eq!(reduced.counts, folded);
    assert_eq!(
        reduced.non_halting.total(),
        2 * raw.non_halting.total()
    );
}

#[test]
fn test_raw_equals_completed_reduced_n2() {
    for blank in [0, 1] {
        let mut raw_cfg = raw_config(2, 100);
        raw_cfg.blank_symbol = blank;
        let mut red_cfg = reduced_config(2, 100);
        red_cfg.blank_symbol = blank;

        let raw = sweep(raw_cfg);
        let reduced = sweep(red_cfg);
        assert_eq!(raw.machines, 10_000);
        assert_eq!(reduced.machines, 20_000);

        let folded = complement_fold(&raw.counts);
        assert_eq!(reduced.counts, folded, "blank={blank}");
        assert_eq!(reduced.non_halting.total(), 2 * raw.non_halting.total());

        // Scenario: the completed-reduced distribution matches the folded
        // raw one to machine precision.
        let raw_halting: u64 = folded.values().sum();
        let d = reduced.distribution().expect("halting machines exist");
        for (s, c) in &folded {
            let expected = *c as f64 / raw_halting as f64;
            assert!((d[s] - expected).abs() < 1e-12);
        }
    }
}

// Dual-blank involution: running every machine with blank = 1 yields
// exactly the complemented output multiset of the blank = 0 sweep.
#[test]
fn test_dual_blank_runs_are_complements() {
    let blank0 = sweep(raw_config(2, 100));
    let mut config = raw_config(2, 100);
    config.blank_symbol = 1;
    let blank1 = sweep(config);
    let expected: HashMap<String, u64> = blank0
        .counts
        .iter()
        .map(|(s, c)| (complement(s), *c))
        .collect();
    assert_eq!(blank1.counts, expected);
}

#[test]
fn test_aggregate_invariant_under_batching_and_workers() {
    let baseline = sweep(raw_config(2, 100));
    for (batch_size, workers) in [(10_000, 1), (137, 1), (512, 4), (1_000, 3)] {
        let mut config = raw_config(2, 100);
        config.batch_size = batch_size;
        config.num_processes = workers;
        let aggregate = sweep(config);
        assert_eq!(
            aggregate, baseline,
            "batch_size={batch_size} workers={workers}"
        );
    }
}

#[test]
fn test_decider_toggles_do_not_change_halting_counts() {
    // Deciders only reclassify non-halting machines; the halting counts and
    // the set of output strings must be identical without them.
    let with = sweep(raw_config(2, 100));
    let mut config = raw_config(2, 100);
    config.escapee_decider = false;
    config.cycle_decider = false;
    let without = sweep(config);
    assert_eq!(with.counts, without.counts);
    assert_eq!(
        with.non_halting.total(),
        without.non_halting.timeout + without.non_halting.no_halt_transition
    );
}

#[test]
#[ignore = "walks the full 3-state class; minutes in debug builds"]
fn test_class_three_ranking_scenario() {
    let aggregate = sweep(reduced_config(3, 200));
    let d = aggregate.distribution().expect("halting machines exist");
    assert!(d["0"] >= d["01"]);
    let estimator = ComplexityEstimator::new(&d);
    assert!(estimator.estimate("0") < estimator.estimate("01"));
    assert!(estimator.estimate("010101").is_finite());
}

#[test]
fn test_outputs_are_binary_strings() {
    let aggregate = sweep(raw_config(2, 100));
    let alphabet: HashSet<char> = ['0', '1'].into();
    for s in aggregate.counts.keys() {
        assert!(!s.is_empty());
        assert!(s.chars().all(|c| alphabet.contains(&c)));
    }
}
