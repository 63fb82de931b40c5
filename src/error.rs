//! Errors surfaced by the pipeline. Non-halting verdicts are not errors;
//! they are ordinary outcomes recorded by the aggregator.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("n_states must be in 1..={max}, got {n}", max = crate::core::MAX_TM_STATES)]
    InvalidStateCount { n: usize },
    #[error("max_runtime_steps must be positive")]
    InvalidStepBudget,
    #[error("blank symbol must be 0 or 1, got {0}")]
    InvalidBlankSymbol(u8),
    #[error("batch_size must be positive")]
    InvalidBatchSize,
    #[error("num_machines_to_run must be positive when set")]
    InvalidMachineLimit,
    #[error("machine code {code} is outside [0, {max})")]
    CodeOutOfRange { code: u64, max: u64 },
    #[error("completion has already been applied to this aggregate")]
    CompletionAlreadyApplied,
    #[error("no halting machines were observed; the distribution is empty")]
    EmptyDistribution,
    #[error("checkpoint version {found} is unsupported (this build writes {expected})")]
    CheckpointVersion { found: u32, expected: u32 },
    #[error("checkpoint is from an incompatible run: {field} was {found}, requested {expected}")]
    CheckpointMismatch {
        field: &'static str,
        found: String,
        expected: String,
    },
    #[error("checkpoint ends mid-batch at {machines} machines; resume with the same num_machines_to_run")]
    CheckpointNotAligned { machines: u64 },
    #[error("batch {batch} failed twice; aborting the run")]
    WorkerFailure { batch: u64 },
    #[error("worker pool shut down before the enumeration was exhausted")]
    WorkerPoolShutdown,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
