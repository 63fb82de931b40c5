//! Atomic persistence of a run's resumable state.
//!
//! Writes go to a temporary file in the target directory followed by a
//! rename, so a reader never observes a torn checkpoint. Periodic write
//! failures are survivable (a later consistent checkpoint supersedes);
//! read failures are not.

use crate::aggregate::OutputFrequency;
use crate::config::SimulationConfig;
use crate::enumeration::EnumerationMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Format version; bump on any incompatible change.
const CHECKPOINT_VERSION: u32 = 1;
/// Transient write failures are retried this many times in total.
const WRITE_ATTEMPTS: u32 = 3;

/// The driver's resumable state. Every distribution-determining parameter
/// is recorded so a resume under different settings is rejected instead of
/// silently producing a different `D`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub n_states: usize,
    pub max_runtime_steps: u64,
    pub enumeration: EnumerationMode,
    pub blank_symbol: u8,
    pub batch_size: u64,
    pub escapee_decider: bool,
    pub cycle_decider: bool,
    /// Contiguous prefix of merged batches; resume re-runs everything at or
    /// beyond this watermark.
    pub completed_batches: u64,
    pub machines_processed: u64,
    pub aggregate: OutputFrequency,
}

impl Checkpoint {
    pub fn capture(
        config: &SimulationConfig,
        completed_batches: u64,
        machines_processed: u64,
        aggregate: &OutputFrequency,
    ) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            n_states: config.n_states,
            max_runtime_steps: config.max_runtime_steps,
            enumeration: config.enumeration,
            blank_symbol: config.blank_symbol,
            batch_size: config.batch_size,
            escapee_decider: config.escapee_decider,
            cycle_decider: config.cycle_decider,
            completed_batches,
            machines_processed,
            aggregate: aggregate.clone(),
        }
    }

    /// Abort resume unless the checkpoint matches the requested run.
    pub fn verify_compatible(&self, config: &SimulationConfig) -> Result<()> {
        fn check<T: PartialEq + std::fmt::Display>(
            field: &'static str,
            found: T,
            expected: T,
        ) -> Result<()> {
            if found == expected {
                Ok(())
            } else {
                Err(Error::CheckpointMismatch {
                    field,
                    found: found.to_string(),
                    expected: expected.to_string(),
                })
            }
        }
        check("n_states", self.n_states, config.n_states)?;
        check(
            "max_runtime_steps",
            self.max_runtime_steps,
            config.max_runtime_steps,
        )?;
        check("enumeration", self.enumeration, config.enumeration)?;
        check("blank_symbol", self.blank_symbol, config.blank_symbol)?;
        check("batch_size", self.batch_size, config.batch_size)?;
        check(
            "escapee_decider",
            self.escapee_decider,
            config.escapee_decider,
        )?;
        check("cycle_decider", self.cycle_decider, config.cycle_decider)?;
        Ok(())
    }
}

pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> CheckpointStore {
        CheckpointStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, or `None` if none has been written yet.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };
        let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(Error::CheckpointVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        Ok(Some(checkpoint))
    }

    /// Write-and-rename, retrying transient failures a bounded number of
    /// times before giving up with the last error.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_save(checkpoint) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < WRITE_ATTEMPTS => {
                    warn!(attempt, error = %e, "checkpoint write failed; retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut file = NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
        serde_json::to_writer(&mut file, checkpoint)?;
        file.flush()?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
