// src/scheduler.rs

//! Bounded-concurrency reassembly of many packages
//!
//! Jobs run on a dedicated rayon pool whose thread count is the concurrency
//! ceiling, so at most that many are ever running. `reassemble_all` returns
//! only after every job reached a terminal state; one job failing never
//! affects the others.

use crate::archive::WorkspaceRegistry;
use crate::assembler::{JobRunner, Outcome};
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Default number of concurrently running jobs
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Terminal result for one requested package
#[derive(Debug)]
pub struct JobResult {
    pub package: String,
    pub outcome: Outcome,
}

/// Counts over a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Archives written (including incomplete ones)
    pub completed: usize,
    /// Completed archives missing members for lack of permission
    pub incomplete: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Requested names with no installed version
    pub unmatched: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[JobResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match &result.outcome {
                Outcome::Completed { incomplete, .. } => {
                    summary.completed += 1;
                    if *incomplete {
                        summary.incomplete += 1;
                    }
                }
                Outcome::Skipped { .. } => summary.skipped += 1,
                Outcome::Failed(Error::NotInstalled { .. }) => summary.unmatched += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// No job failed and every name matched an installed package
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unmatched == 0
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created ({} incomplete), {} skipped, {} failed, {} not installed",
            self.completed, self.incomplete, self.skipped, self.failed, self.unmatched
        )
    }
}

/// Releases a running slot when the job ends, however it ends
struct RunningSlot<'a> {
    running: &'a AtomicUsize,
}

impl Drop for RunningSlot<'_> {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs one job per package with a concurrency ceiling
pub struct Scheduler<R: JobRunner> {
    runner: R,
    ceiling: usize,
    workspaces: WorkspaceRegistry,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl<R: JobRunner> Scheduler<R> {
    /// `ceiling` below 1 is treated as 1
    pub fn new(runner: R, ceiling: usize, workspaces: WorkspaceRegistry) -> Self {
        Self {
            runner,
            ceiling: ceiling.max(1),
            workspaces,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Highest number of jobs observed running at once
    pub fn peak_running(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn workspaces(&self) -> &WorkspaceRegistry {
        &self.workspaces
    }

    fn admit(&self) -> RunningSlot<'_> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        RunningSlot {
            running: &self.running,
        }
    }

    /// Reassemble every package, blocking until all are terminal
    ///
    /// Duplicate names are run once. Results keep the order of first
    /// appearance in `packages`.
    pub fn reassemble_all(
        &self,
        packages: &[String],
        progress: &dyn ProgressTracker,
    ) -> Result<Vec<JobResult>> {
        let mut seen = HashSet::new();
        let queued: Vec<&String> = packages
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .collect();

        info!(
            "Reassembling {} packages with up to {} concurrent jobs",
            queued.len(),
            self.ceiling
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.ceiling)
            .thread_name(|i| format!("pacrepack-job-{}", i))
            .build()?;

        let results = pool.install(|| {
            queued
                .par_iter()
                .map(|package| {
                    let outcome = {
                        let _slot = self.admit();
                        debug!("Running job for {}", package);
                        self.runner.run(package, progress)
                    };
                    progress.increment(1);
                    JobResult {
                        package: (*package).clone(),
                        outcome,
                    }
                })
                .collect::<Vec<_>>()
        });

        // Every job has dropped its workspace by now; anything left is residue
        let residual = self.workspaces.sweep();
        if residual > 0 {
            debug!("Removed {} residual workspaces", residual);
        }

        Ok(results)
    }
}
