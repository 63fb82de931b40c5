//! Checkpointed interruption and resume: a run cut short and resumed must
//! land on exactly the same aggregate as an uninterrupted one.

use ctm_estimator::aggregate::OutputFrequency;
use ctm_estimator::checkpoint::CheckpointStore;
use ctm_estimator::enumeration::EnumerationMode;
use ctm_estimator::error::Error;
use ctm_estimator::{Driver, SimulationConfig};
use std::path::Path;
use std::sync::atomic::Ordering;

fn base_config() -> SimulationConfig {
    let mut config = SimulationConfig::new(2, 100);
    config.batch_size = 500;
    config.checkpoint_interval = 1_000;
    config
}

fn sweep_with_store(config: SimulationConfig, path: &Path) -> OutputFrequency {
    Driver::new(config)
        .expect("valid config")
        .with_checkpoint(CheckpointStore::new(path))
        .run()
        .expect("run succeeds")
        .aggregate
}

#[test]
fn test_resume_after_truncated_run_matches_uninterrupted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.ckpt");

    // First leg: stop after 4000 of the 10000 machines (batch-aligned).
    let mut first = base_config();
    first.num_machines_to_run = Some(4_000);
    let partial = sweep_with_store(first, &path);
    assert_eq!(partial.machines, 4_000);

    // Second leg: pick up from the checkpoint and finish the class.
    let resumed = sweep_with_store(base_config(), &path);

    let uninterrupted = Driver::new(base_config())
        .unwrap()
        .run()
        .unwrap()
        .aggregate;
    assert_eq!(resumed, uninterrupted);
}

#[test]
fn test_preset_stop_then_resume_matches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.ckpt");

    let driver = Driver::new(base_config())
        .unwrap()
        .with_checkpoint(CheckpointStore::new(&path));
    driver.stop_flag().store(true, Ordering::Relaxed);
    let report = driver.run().unwrap();
    assert!(report.interrupted);
    assert!(path.exists(), "interruption must leave a checkpoint");

    let resumed = sweep_with_store(base_config(), &path);
    let uninterrupted = Driver::new(base_config())
        .unwrap()
        .run()
        .unwrap()
        .aggregate;
    assert_eq!(resumed, uninterrupted);
}

#[test]
fn test_completed_reduced_run_does_not_recomplete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.ckpt");

    let mut config = base_config();
    config.enumeration = EnumerationMode::Reduced;
    let first = sweep_with_store(config.clone(), &path);
    assert!(first.completion_applied);
    assert_eq!(first.machines, 20_000);

    // Resuming the finished run must re-emit the same aggregate, not apply
    // completion a second time.
    let second = sweep_with_store(config, &path);
    assert_eq!(second, first);
}

#[test]
fn test_incompatible_checkpoint_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.ckpt");
    sweep_with_store(base_config(), &path);

    let mut changed = base_config();
    changed.max_runtime_steps = 200;
    let result = Driver::new(changed)
        .unwrap()
        .with_checkpoint(CheckpointStore::new(&path))
        .run();
    assert!(matches!(
        result,
        Err(Error::CheckpointMismatch {
            field: "max_runtime_steps",
            ..
        })
    ));
}

#[test]
fn test_mid_batch_truncation_cannot_be_extended() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.ckpt");

    let mut first = base_config();
    first.num_machines_to_run = Some(3_777);
    sweep_with_store(first, &path);

    let result = Driver::new(base_config())
        .unwrap()
        .with_checkpoint(CheckpointStore::new(&path))
        .run();
    assert!(matches!(
        result,
        Err(Error::CheckpointNotAligned { machines: 3_777 })
    ));
}
