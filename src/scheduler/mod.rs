//! Polling scheduler
//!
//! The scheduler owns every task of a batch. Each cycle it scans all tasks,
//! claims the eligible ones and spawns a [`TaskRunner`] for each without
//! waiting for it. It then checks whether every task is done and otherwise
//! sleeps for the scan interval. The loop ends when the batch is complete or
//! the cycle limit is reached, whichever comes first; an incomplete batch is
//! reported, not treated as an error.
//!
//! # Example
//!
//! ```no_run
//! use report_poller::config::SchedulerConfig;
//! use report_poller::fetch::HttpReportClient;
//! use report_poller::runner::TaskRunner;
//! use report_poller::scheduler::Scheduler;
//! use report_poller::sink::ResponseStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(tasks: Vec<report_poller::task::TaskHandle>) -> report_poller::Result<()> {
//! let client = HttpReportClient::new("https://api.example.com/reports", Duration::from_secs(30))?;
//! let runner = TaskRunner::new(Arc::new(client), ResponseStore::new("./input"), 10);
//! let scheduler = Scheduler::new(tasks, runner, &SchedulerConfig::default());
//!
//! let report = scheduler.run().await;
//! println!("{} of {} reports delivered", report.succeeded, report.total());
//! # Ok(())
//! # }
//! ```

use crate::config::SchedulerConfig;
use crate::runner::TaskRunner;
use crate::task::{Completion, TaskHandle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Drives a batch of tasks to completion
pub struct Scheduler {
    tasks: Vec<TaskHandle>,
    runner: TaskRunner,
    max_cycles: u32,
    scan_interval: Duration,
    /// Caps concurrently running tasks when `max_in_flight` is configured
    limiter: Option<Arc<Semaphore>>,
}

impl Scheduler {
    /// Create a scheduler for `tasks`
    pub fn new(tasks: Vec<TaskHandle>, runner: TaskRunner, config: &SchedulerConfig) -> Self {
        Self {
            tasks,
            runner,
            max_cycles: config.max_cycles.max(1),
            scan_interval: config.scan_interval,
            limiter: config
                .max_in_flight
                .map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
        }
    }

    /// Tasks of the batch
    pub fn tasks(&self) -> &[TaskHandle] {
        &self.tasks
    }

    /// Run scan cycles until the batch completes or the cycle limit is hit
    pub async fn run(&self) -> BatchReport {
        info!(
            tasks = self.tasks.len(),
            max_cycles = self.max_cycles,
            scan_interval_ms = self.scan_interval.as_millis() as u64,
            "scheduler started"
        );

        let mut cycle = 0;
        let complete = loop {
            cycle += 1;
            let launched = self.scan();
            debug!(cycle, launched, "scan cycle");

            if self.tasks.iter().all(|task| task.is_done()) {
                break true;
            }
            if cycle >= self.max_cycles {
                break false;
            }
            sleep(self.scan_interval).await;
        };

        let report = BatchReport::from_tasks(&self.tasks, cycle, complete);
        if complete {
            info!(
                cycles = report.cycles,
                succeeded = report.succeeded,
                failed = report.failed(),
                "batch complete"
            );
        } else {
            warn!(
                cycles = report.cycles,
                pending = report.pending,
                "cycle limit reached, batch left incomplete"
            );
        }
        report
    }

    /// Launch a runner for every task that can be claimed now
    fn scan(&self) -> usize {
        let now = Instant::now();
        let mut launched = 0;

        for task in &self.tasks {
            if !task.is_eligible(now) {
                continue;
            }

            let permit = match &self.limiter {
                Some(limiter) => match Arc::clone(limiter).try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        debug!("in-flight limit reached, deferring remaining tasks");
                        break;
                    }
                },
                None => None,
            };

            let Some(claim) = task.try_claim(now) else {
                continue;
            };

            let runner = self.runner.clone();
            tokio::spawn(async move {
                let _permit = permit;
                runner.run(claim).await;
            });
            launched += 1;
        }

        launched
    }
}

/// Summary of a finished scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Scan cycles executed
    pub cycles: u32,
    /// Whether every task reached a terminal state
    pub complete: bool,
    /// Reports delivered (HTTP 200)
    pub succeeded: usize,
    /// Tasks ended by another non-retryable status
    pub finished: usize,
    /// Tasks that ran out of attempts
    pub exhausted: usize,
    /// Tasks ended by a transport error
    pub transport_failed: usize,
    /// Tasks ended by a malformed retry response
    pub protocol_violations: usize,
    /// Tasks ended because a response could not be stored
    pub persistence_failed: usize,
    /// Tasks still not done when the scheduler stopped
    pub pending: usize,
}

impl BatchReport {
    /// Tally task completions
    pub fn from_tasks(tasks: &[TaskHandle], cycles: u32, complete: bool) -> Self {
        let mut report = BatchReport {
            cycles,
            complete,
            ..Default::default()
        };
        for task in tasks {
            match task.completion() {
                Some(Completion::Succeeded) => report.succeeded += 1,
                Some(Completion::Finished { .. }) => report.finished += 1,
                Some(Completion::Exhausted) => report.exhausted += 1,
                Some(Completion::TransportFailed) => report.transport_failed += 1,
                Some(Completion::ProtocolViolation) => report.protocol_violations += 1,
                Some(Completion::PersistenceFailed) => report.persistence_failed += 1,
                None => report.pending += 1,
            }
        }
        report
    }

    /// Number of tasks in the batch
    pub fn total(&self) -> usize {
        self.succeeded
            + self.finished
            + self.exhausted
            + self.transport_failed
            + self.protocol_violations
            + self.persistence_failed
            + self.pending
    }

    /// Number of tasks that ended in an error
    pub fn failed(&self) -> usize {
        self.transport_failed + self.protocol_violations + self.persistence_failed
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
