//! Report tasks and their ownership protocol
//!
//! A [`ReportTask`] is one login's sequence of report requests. Its request
//! material is fixed at construction; its progress (attempt counter, retry
//! time, completion) may only be changed through a [`TaskClaim`], and at most
//! one claim exists per task at any instant. The scheduler obtains claims with
//! [`ReportTask::try_claim`] and hands them to runners; dropping the claim
//! releases the task, so a runner that returns early or panics still frees it.

use reqwest::header::HeaderMap;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Shared handle to a task; the scheduler and the current runner both hold one
pub type TaskHandle = Arc<ReportTask>;

/// Request material for one login, rendered once from templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, sent verbatim
    pub body: String,
}

/// How a task reached its terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The API delivered the report (HTTP 200)
    Succeeded,
    /// The API answered with a non-retryable status other than 200
    Finished {
        /// Status code of the final response
        status: u16,
    },
    /// The attempt limit was exceeded before a terminal response arrived
    Exhausted,
    /// Connecting, sending or reading the response failed
    TransportFailed,
    /// A retryable response lacked a usable `Retryin` header
    ProtocolViolation,
    /// The response could not be written to the result store
    PersistenceFailed,
}

impl Completion {
    /// Whether this completion counts as a failure for logging purposes
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Completion::TransportFailed
                | Completion::ProtocolViolation
                | Completion::PersistenceFailed
        )
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Succeeded => write!(f, "succeeded"),
            Completion::Finished { status } => write!(f, "finished with status {}", status),
            Completion::Exhausted => write!(f, "retries exhausted"),
            Completion::TransportFailed => write!(f, "transport failed"),
            Completion::ProtocolViolation => write!(f, "protocol violation"),
            Completion::PersistenceFailed => write!(f, "persistence failed"),
        }
    }
}

/// One login's report-fetch task
#[derive(Debug)]
pub struct ReportTask {
    login: String,
    request: ReportRequest,
    attempt: AtomicU32,
    next_eligible_at: Mutex<Instant>,
    in_flight: AtomicBool,
    completion: OnceLock<Completion>,
}

impl ReportTask {
    /// Create a task that is eligible immediately
    pub fn new(login: impl Into<String>, request: ReportRequest) -> Self {
        let now = Instant::now();
        let start = now.checked_sub(Duration::from_secs(1)).unwrap_or(now);
        Self {
            login: login.into(),
            request,
            attempt: AtomicU32::new(0),
            next_eligible_at: Mutex::new(start),
            in_flight: AtomicBool::new(false),
            completion: OnceLock::new(),
        }
    }

    /// Create a shared handle to a new task
    pub fn handle(login: impl Into<String>, request: ReportRequest) -> TaskHandle {
        Arc::new(Self::new(login, request))
    }

    /// Client login this task fetches reports for
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Request material sent on every attempt
    pub fn request(&self) -> &ReportRequest {
        &self.request
    }

    /// Number of attempts started so far
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    /// Earliest instant the task may be attempted again
    pub fn next_eligible_at(&self) -> Instant {
        *self
            .next_eligible_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a runner currently owns the task
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether the task reached a terminal state
    pub fn is_done(&self) -> bool {
        self.completion.get().is_some()
    }

    /// How the task finished, if it has
    pub fn completion(&self) -> Option<Completion> {
        self.completion.get().copied()
    }

    /// Whether the task could be claimed at `now`
    pub fn is_eligible(&self, now: Instant) -> bool {
        !self.is_done() && !self.is_in_flight() && self.next_eligible_at() <= now
    }

    /// Take exclusive ownership of an eligible task
    ///
    /// Returns `None` when the task is done, not yet due, or owned by another
    /// runner. The in-flight flag is set with a compare-and-swap, so concurrent
    /// callers cannot both succeed.
    pub fn try_claim(self: &Arc<Self>, now: Instant) -> Option<TaskClaim> {
        if self.is_done() || self.next_eligible_at() > now {
            return None;
        }
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        let claim = TaskClaim {
            task: Arc::clone(self),
        };
        // The previous owner may have finished between the check and the swap.
        if self.is_done() {
            return None;
        }
        Some(claim)
    }
}

/// Exclusive ownership of a task's mutable state
///
/// Dropping the claim clears the in-flight flag.
#[derive(Debug)]
pub struct TaskClaim {
    task: TaskHandle,
}

impl TaskClaim {
    /// The claimed task
    pub fn task(&self) -> &ReportTask {
        &self.task
    }

    /// Count a new attempt and return its number (1-based)
    pub fn begin_attempt(&self) -> u32 {
        self.task.attempt.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Defer the next attempt until `at`
    ///
    /// The retry time only moves forward; an earlier instant is ignored.
    pub fn retry_at(&self, at: Instant) {
        let mut next = self
            .task
            .next_eligible_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if at > *next {
            *next = at;
        }
    }

    /// Mark the task terminal
    ///
    /// Returns `false` if it had already finished; the first completion wins.
    pub fn finish(&self, completion: Completion) -> bool {
        self.task.completion.set(completion).is_ok()
    }
}

impl Drop for TaskClaim {
    fn drop(&mut self) {
        self.task.in_flight.store(false, Ordering::Release);
    }
}
