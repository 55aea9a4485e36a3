//! Task runner: one attempt of one task
//!
//! A run consumes the task's [`TaskClaim`] and walks the state machine:
//!
//! ```text
//! claim ─► count attempt ─► over limit? ──yes──► Done(Exhausted)
//!                               │ no
//!                               ▼
//!                             fetch ──error──► Done(TransportFailed)
//!                               │
//!                               ▼
//!                            persist ──error──► Done(PersistenceFailed)
//!                               │
//!                               ▼
//!                            classify ─► Done / retry later / Done(ProtocolViolation)
//! ```
//!
//! Every error is absorbed here and recorded as the task's completion; the
//! scheduler never sees one. The claim is dropped when the run returns, which
//! releases the task for the next scan.

use crate::classify::{Outcome, classify};
use crate::error::Error;
use crate::fetch::ReportFetcher;
use crate::sink::ResponseStore;
use crate::task::{Completion, TaskClaim};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Executes single attempts of report tasks
#[derive(Clone)]
pub struct TaskRunner {
    fetcher: Arc<dyn ReportFetcher>,
    store: ResponseStore,
    max_attempts: u32,
}

impl TaskRunner {
    /// Create a runner
    ///
    /// A task whose attempt counter exceeds `max_attempts` finishes as
    /// [`Completion::Exhausted`] without another request.
    pub fn new(fetcher: Arc<dyn ReportFetcher>, store: ResponseStore, max_attempts: u32) -> Self {
        Self {
            fetcher,
            store,
            max_attempts,
        }
    }

    /// Maximum number of requests per task
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run one attempt of the claimed task
    ///
    /// Returns the completion when the task became terminal, or `None` when it
    /// was rescheduled.
    pub async fn run(&self, claim: TaskClaim) -> Option<Completion> {
        let task = claim.task();
        let login = task.login();

        let attempt = claim.begin_attempt();
        if attempt > self.max_attempts {
            warn!(
                login,
                attempt,
                max_attempts = self.max_attempts,
                "retries exhausted, giving up on report"
            );
            return finish(&claim, Completion::Exhausted);
        }

        info!(login, attempt, "requesting report");

        let response = match self.fetcher.fetch(task.request()).await {
            Ok(response) => response,
            Err(e) => {
                error!(login, attempt, error = %e, "report request failed");
                return finish(&claim, Completion::TransportFailed);
            }
        };

        if let Err(e) = self.store.persist(login, &response).await {
            error!(login, attempt, error = %e, "failed to store report response");
            return finish(&claim, Completion::PersistenceFailed);
        }

        let status = response.status.as_u16();
        match classify(response.status, &response.headers) {
            Outcome::Done => {
                let completion = if status == 200 {
                    Completion::Succeeded
                } else {
                    Completion::Finished { status }
                };
                info!(login, attempt, status, %completion, "report task finished");
                finish(&claim, completion)
            }
            Outcome::RetryAfter(delay) => {
                let Some(at) = Instant::now().checked_add(delay) else {
                    let e = Error::ProtocolViolation {
                        status,
                        reason: format!("retry delay of {}s is out of range", delay.as_secs()),
                    };
                    error!(login, attempt, error = %e, "report API broke its contract");
                    return finish(&claim, Completion::ProtocolViolation);
                };
                claim.retry_at(at);
                info!(
                    login,
                    attempt,
                    status,
                    retry_in_secs = delay.as_secs(),
                    "report not ready, will retry"
                );
                None
            }
            Outcome::Fatal(reason) => {
                let e = Error::ProtocolViolation { status, reason };
                error!(login, attempt, error = %e, "report API broke its contract");
                finish(&claim, Completion::ProtocolViolation)
            }
        }
    }
}

fn finish(claim: &TaskClaim, completion: Completion) -> Option<Completion> {
    claim.finish(completion);
    Some(completion)
}
