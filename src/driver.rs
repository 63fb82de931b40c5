//! Drives the pipeline end to end: partitions the enumeration into batches,
//! fans them out to a worker pool, merges worker aggregates back in batch
//! order, checkpoints, and finalises the distribution.
//!
//! Batches are addressed by index range, so workers need no shared state at
//! all; the only cross-thread traffic is a `Batch` going out and an
//! `OutputFrequency` coming back. Merging is order-invariant, but the
//! watermark is not: a batch only counts as complete once every batch before
//! it has been merged, so out-of-order results are parked until the prefix
//! advances and a checkpoint never includes an unmerged gap.

use crate::aggregate::OutputFrequency;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::SimulationConfig;
use crate::core::Machine;
use crate::deciders;
use crate::enumeration::{Enumeration, EnumerationMode};
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// One contiguous slice of the enumeration, in index space.
#[derive(Clone, Copy, Debug)]
struct Batch {
    seq: u64,
    start: u64,
    end: u64,
}

enum BatchReply {
    Done { seq: u64, local: OutputFrequency },
    Failed { seq: u64 },
}

/// What a finished (or interrupted) run produced.
#[derive(Debug)]
pub struct RunReport {
    pub aggregate: OutputFrequency,
    pub machines_processed: u64,
    /// True when the stop flag cut the run short; the aggregate is then a
    /// consistent prefix, resumable from the checkpoint.
    pub interrupted: bool,
}

pub struct Driver {
    config: SimulationConfig,
    store: Option<CheckpointStore>,
    stop: Arc<AtomicBool>,
}

impl Driver {
    pub fn new(config: SimulationConfig) -> Result<Driver> {
        config.validate()?;
        Ok(Driver {
            config,
            store: None,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_checkpoint(mut self, store: CheckpointStore) -> Driver {
        self.store = Some(store);
        self
    }

    /// A flag that makes the driver stop dispatching, drain in-flight
    /// batches, checkpoint, and return. Hand it to a signal handler or a
    /// watchdog thread.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn run(&self) -> Result<RunReport> {
        let config = &self.config;
        let enumeration = Enumeration::new(config.enumeration, config.n_states, config.blank_symbol);
        let total = match config.num_machines_to_run {
            Some(limit) => enumeration.size().min(limit),
            None => enumeration.size(),
        };
        let num_batches = total.div_ceil(config.batch_size);

        let (mut aggregate, start_batch, mut processed) = self.resume_state()?;
        // A checkpoint whose last merged batch was cut short (by a
        // num_machines_to_run truncation) is only resumable to that same
        // endpoint; continuing past it would re-run or skip part of a batch.
        if processed > total || (processed != start_batch * config.batch_size && processed != total)
        {
            return Err(Error::CheckpointNotAligned { machines: processed });
        }
        let workers = config.worker_count();
        info!(
            n = config.n_states,
            mode = %config.enumeration,
            machines = total,
            batches = num_batches,
            workers,
            resumed_at = start_batch,
            "starting enumeration sweep"
        );

        let batch_at = |seq: u64| Batch {
            seq,
            start: seq * config.batch_size,
            end: total.min((seq + 1) * config.batch_size),
        };

        let mut next_merge = start_batch;
        thread::scope(|scope| -> Result<()> {
            // The channel endpoints live inside the scope closure: any early
            // return drops them before the scope joins, so a worker blocked
            // on a full reply channel or an empty job channel always wakes.
            let (job_tx, job_rx) = bounded::<Batch>(workers);
            let (reply_tx, reply_rx) = bounded::<BatchReply>(workers);
            for _ in 0..workers {
                let jobs = job_rx.clone();
                let replies = reply_tx.clone();
                scope.spawn(move || worker_loop(config, enumeration, jobs, replies));
            }
            drop(job_rx);
            drop(reply_tx);

            let mut next_dispatch = start_batch;
            let mut retries: VecDeque<Batch> = VecDeque::new();
            let mut retried: HashSet<u64> = HashSet::new();
            let mut parked: BTreeMap<u64, OutputFrequency> = BTreeMap::new();
            let mut in_flight = 0usize;
            let mut since_checkpoint = 0u64;

            loop {
                if !self.stop.load(Ordering::Relaxed) {
                    // Top up the job channel without blocking.
                    loop {
                        let batch = if let Some(b) = retries.front() {
                            *b
                        } else if next_dispatch < num_batches {
                            batch_at(next_dispatch)
                        } else {
                            break;
                        };
                        match job_tx.try_send(batch) {
                            Ok(()) => {
                                in_flight += 1;
                                if retries.front().is_some_and(|b| b.seq == batch.seq) {
                                    retries.pop_front();
                                } else {
                                    next_dispatch += 1;
                                }
                            }
                            Err(TrySendError::Full(_)) => break,
                            Err(TrySendError::Disconnected(_)) => {
                                return Err(Error::WorkerPoolShutdown)
                            }
                        }
                    }
                }
                if in_flight == 0 {
                    break;
                }

                let reply = reply_rx.recv().map_err(|_| Error::WorkerPoolShutdown)?;
                in_flight -= 1;
                match reply {
                    BatchReply::Done { seq, local } => {
                        parked.insert(seq, local);
                    }
                    BatchReply::Failed { seq } => {
                        if !retried.insert(seq) {
                            return Err(Error::WorkerFailure { batch: seq });
                        }
                        warn!(batch = seq, "batch failed; re-enqueueing once");
                        retries.push_back(batch_at(seq));
                    }
                }

                // Advance the contiguous merge watermark.
                while let Some(local) = parked.remove(&next_merge) {
                    processed += local.machines;
                    since_checkpoint += local.machines;
                    aggregate.merge(local);
                    next_merge += 1;
                }

                if config.checkpoint_interval > 0 && since_checkpoint >= config.checkpoint_interval
                {
                    self.write_checkpoint(next_merge, processed, &aggregate, false)?;
                    since_checkpoint = 0;
                }
            }
            drop(job_tx);
            Ok(())
        })?;

        let interrupted = self.stop.load(Ordering::Relaxed) && next_merge < num_batches;
        // The exit checkpoint must land even when periodic ones are disabled.
        self.write_checkpoint(next_merge, processed, &aggregate, true)?;
        if interrupted {
            info!(
                merged_batches = next_merge,
                machines = processed,
                "run interrupted; state checkpointed"
            );
            return Ok(RunReport {
                aggregate,
                machines_processed: processed,
                interrupted: true,
            });
        }

        if config.enumeration == EnumerationMode::Reduced && !aggregate.completion_applied {
            if total < enumeration.size() {
                warn!(
                    ran = total,
                    full = enumeration.size(),
                    "completion arithmetic assumes the full reduced enumeration; \
                     counts from this truncated run will not match a raw sweep"
                );
            }
            aggregate.apply_completion(config.n_states)?;
            // Record the applied completion so a resumed run cannot apply
            // it a second time.
            self.write_checkpoint(next_merge, processed, &aggregate, true)?;
        }

        info!(
            machines = processed,
            halting = aggregate.halting_total(),
            non_halting = aggregate.non_halting.total(),
            "enumeration sweep finished"
        );
        Ok(RunReport {
            aggregate,
            machines_processed: processed,
            interrupted: false,
        })
    }

    /// Load and verify the checkpoint, or start fresh.
    fn resume_state(&self) -> Result<(OutputFrequency, u64, u64)> {
        if let Some(store) = &self.store {
            if let Some(checkpoint) = store.load()? {
                checkpoint.verify_compatible(&self.config)?;
                info!(
                    batches = checkpoint.completed_batches,
                    machines = checkpoint.machines_processed,
                    "resuming from checkpoint"
                );
                return Ok((
                    checkpoint.aggregate,
                    checkpoint.completed_batches,
                    checkpoint.machines_processed,
                ));
            }
        }
        Ok((OutputFrequency::default(), 0, 0))
    }

    fn write_checkpoint(
        &self,
        completed_batches: u64,
        processed: u64,
        aggregate: &OutputFrequency,
        must_succeed: bool,
    ) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let checkpoint = Checkpoint::capture(&self.config, completed_batches, processed, aggregate);
        match store.save(&checkpoint) {
            Ok(()) => {
                info!(batches = completed_batches, machines = processed, "checkpoint written");
                Ok(())
            }
            // A missed periodic checkpoint costs re-work on resume, not
            // correctness; the exit checkpoint is load-bearing.
            Err(e) if !must_succeed => {
                warn!(error = %e, "periodic checkpoint skipped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn worker_loop(
    config: &SimulationConfig,
    enumeration: Enumeration,
    jobs: Receiver<Batch>,
    replies: Sender<BatchReply>,
) {
    let mut chain = deciders::standard_chain(config);
    for batch in jobs.iter() {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            process_batch(config, enumeration, batch, &mut chain)
        }));
        let reply = match outcome {
            Ok(Ok(local)) => BatchReply::Done { seq: batch.seq, local },
            Ok(Err(e)) => {
                error!(batch = batch.seq, error = %e, "batch processing failed");
                BatchReply::Failed { seq: batch.seq }
            }
            Err(_) => {
                error!(batch = batch.seq, "batch processing panicked");
                BatchReply::Failed { seq: batch.seq }
            }
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
}

fn process_batch(
    config: &SimulationConfig,
    enumeration: Enumeration,
    batch: Batch,
    chain: &mut [Box<dyn deciders::RuntimeDecider>],
) -> Result<OutputFrequency> {
    let mut local = OutputFrequency::default();
    for index in batch.start..batch.end {
        let machine = Machine::decode(enumeration.code_at(index), config.n_states)?;
        local.record(&deciders::run_with_chain(&machine, config, chain));
    }
    Ok(local)
}
