//! Supervision for the coordinator's periodic background loops.
//!
//! A cycle that returns an error is logged and skipped; a cycle that panics
//! is contained by the blocking-task boundary and the loop resumes on the
//! next schedule. The process itself never goes down with a loop.

use std::time::Duration;

use tracing::{debug, error, warn};

use rf_types::MasterError;

/// How a single supervised cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// The cycle returned an error and was skipped.
    Skipped,
    /// The cycle panicked; the panic was contained.
    Panicked,
    Cancelled,
}

/// A named periodic task running a synchronous, possibly long cycle.
pub struct SupervisedTask {
    name: &'static str,
    period: Duration,
}

impl SupervisedTask {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self { name, period }
    }

    /// Run cycles forever, sleeping `period` between them.
    pub async fn run<F>(self, cycle: F)
    where
        F: Fn() -> Result<(), MasterError> + Clone + Send + 'static,
    {
        loop {
            self.run_cycle(&cycle).await;
            tokio::time::sleep(self.period).await;
        }
    }

    /// Run one cycle on the blocking pool and classify its outcome.
    pub async fn run_cycle<F>(&self, cycle: &F) -> CycleOutcome
    where
        F: Fn() -> Result<(), MasterError> + Clone + Send + 'static,
    {
        let work = cycle.clone();
        match tokio::task::spawn_blocking(work).await {
            Ok(Ok(())) => {
                debug!(task = self.name, "cycle complete");
                CycleOutcome::Completed
            }
            Ok(Err(err)) => {
                warn!(task = self.name, error = %err, "cycle failed, skipping");
                CycleOutcome::Skipped
            }
            Err(join_err) if join_err.is_panic() => {
                error!(task = self.name, "cycle panicked, resuming on next schedule");
                CycleOutcome::Panicked
            }
            Err(_) => CycleOutcome::Cancelled,
        }
    }
}
