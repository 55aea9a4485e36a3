use super::*;
use crate::error::Result;
use crate::fetch::{RawResponse, ReportFetcher};
use crate::sink::ResponseStore;
use crate::task::{ReportRequest, ReportTask};
use crate::test_helpers::{ScriptedFetcher, file_count, reply, request};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use std::collections::HashMap;
use std::path::Path;

fn config(max_cycles: u32, scan_interval_ms: u64, max_in_flight: Option<usize>) -> SchedulerConfig {
    SchedulerConfig {
        max_cycles,
        scan_interval: Duration::from_millis(scan_interval_ms),
        max_in_flight,
    }
}

fn tasks(logins: &[&str]) -> Vec<TaskHandle> {
    logins
        .iter()
        .map(|login| {
            let mut req = request();
            req.headers
                .insert("client-login", HeaderValue::from_str(login).unwrap());
            ReportTask::handle(*login, req)
        })
        .collect()
}

fn runner(fetcher: Arc<dyn ReportFetcher>, root: &Path, max_attempts: u32) -> TaskRunner {
    TaskRunner::new(fetcher, ResponseStore::new(root), max_attempts)
}

/// Answers each login with its own fixed reply
struct PerLoginFetcher {
    replies: HashMap<String, (u16, Vec<(&'static str, &'static str)>)>,
}

#[async_trait]
impl ReportFetcher for PerLoginFetcher {
    async fn fetch(&self, request: &ReportRequest) -> Result<RawResponse> {
        let login = request.headers["client-login"].to_str().unwrap();
        let (status, headers) = &self.replies[login];
        reply(*status, headers)
    }
}

#[tokio::test]
async fn all_ok_batch_completes() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::repeating(200, &[]));
    let scheduler = Scheduler::new(
        tasks(&["a", "b", "c"]),
        runner(fetcher.clone(), dir.path(), 10),
        &config(100, 10, None),
    );

    let report = scheduler.run().await;

    assert!(report.complete);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.pending, 0);
    assert_eq!(report.total(), 3);
    assert!(report.cycles <= 3, "took {} cycles", report.cycles);
    assert_eq!(fetcher.calls(), 3);
    for login in ["a", "b", "c"] {
        assert_eq!(file_count(&dir.path().join(login)), 1);
    }
}

#[tokio::test]
async fn empty_batch_completes_in_one_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(Vec::new()));
    let scheduler = Scheduler::new(
        Vec::new(),
        runner(fetcher.clone(), dir.path(), 10),
        &config(100, 10, None),
    );

    let report = scheduler.run().await;

    assert_eq!(report, BatchReport { cycles: 1, complete: true, ..Default::default() });
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn in_flight_task_is_never_relaunched() {
    let dir = tempfile::tempdir().unwrap();
    // The fetch outlasts many scan cycles.
    let fetcher = Arc::new(
        ScriptedFetcher::new(vec![reply(200, &[])]).with_delay(Duration::from_millis(150)),
    );
    let scheduler = Scheduler::new(
        tasks(&["acme"]),
        runner(fetcher.clone(), dir.path(), 10),
        &config(200, 5, None),
    );

    let report = scheduler.run().await;

    assert!(report.complete);
    assert!(report.cycles > 10, "expected many scans, got {}", report.cycles);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(fetcher.max_active(), 1);
}

#[tokio::test]
async fn cycle_limit_stops_incomplete_batch() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::repeating(202, &[("Retryin", "3600")]));
    let scheduler = Scheduler::new(
        tasks(&["acme"]),
        runner(fetcher.clone(), dir.path(), 10),
        &config(5, 10, None),
    );

    let started = std::time::Instant::now();
    let report = scheduler.run().await;

    assert!(!report.complete);
    assert_eq!(report.cycles, 5);
    assert_eq!(report.pending, 1);
    assert_eq!(fetcher.calls(), 1, "task is not due again within the run");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!scheduler.tasks()[0].is_done());
}

#[tokio::test]
async fn mixed_outcomes_are_tallied() {
    let dir = tempfile::tempdir().unwrap();
    let replies = HashMap::from([
        ("ok".to_string(), (200, vec![])),
        ("bad".to_string(), (404, vec![])),
        ("broken".to_string(), (201, vec![("Retryin", "soon")])),
        ("slow".to_string(), (202, vec![("Retryin", "3600")])),
    ]);
    let fetcher = Arc::new(PerLoginFetcher { replies });
    let scheduler = Scheduler::new(
        tasks(&["ok", "bad", "broken", "slow"]),
        runner(fetcher, dir.path(), 10),
        &config(10, 10, None),
    );

    let report = scheduler.run().await;

    assert!(!report.complete);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.finished, 1);
    assert_eq!(report.protocol_violations, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.total(), 4);
}

#[tokio::test]
async fn in_flight_limit_caps_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher =
        Arc::new(ScriptedFetcher::repeating(200, &[]).with_delay(Duration::from_millis(50)));
    let scheduler = Scheduler::new(
        tasks(&["a", "b", "c", "d"]),
        runner(fetcher.clone(), dir.path(), 10),
        &config(500, 5, Some(2)),
    );

    let report = scheduler.run().await;

    assert!(report.complete);
    assert_eq!(report.succeeded, 4);
    assert_eq!(fetcher.calls(), 4);
    assert!(fetcher.max_active() <= 2, "max active {}", fetcher.max_active());
}

#[tokio::test]
async fn unbounded_scan_launches_every_due_task() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher =
        Arc::new(ScriptedFetcher::repeating(200, &[]).with_delay(Duration::from_millis(100)));
    let scheduler = Scheduler::new(
        tasks(&["a", "b", "c", "d"]),
        runner(fetcher.clone(), dir.path(), 10),
        &config(500, 5, None),
    );

    let report = scheduler.run().await;

    assert!(report.complete);
    assert_eq!(fetcher.max_active(), 4);
}

#[test]
fn report_counts_pending_tasks() {
    let handles = tasks(&["a", "b", "c"]);
    let claim = handles[0].try_claim(tokio::time::Instant::now()).unwrap();
    claim.finish(Completion::Exhausted);
    let claim = handles[1].try_claim(tokio::time::Instant::now()).unwrap();
    claim.finish(Completion::TransportFailed);

    let report = BatchReport::from_tasks(&handles, 7, false);

    assert_eq!(report.cycles, 7);
    assert_eq!(report.exhausted, 1);
    assert_eq!(report.transport_failed, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(report.failed(), 1);
}
