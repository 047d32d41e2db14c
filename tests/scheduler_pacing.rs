use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

use repowatch::fleet::SweepMode;
use repowatch::repo::GitOp;
use repowatch_test_utils::builders::Harness;
use repowatch_test_utils::{init_tracing, Scripted, ScriptedRunner};

/// Every git call takes `per_op` on the tokio clock.
fn slow_runner(per_op: Duration) -> ScriptedRunner {
    let runner = ScriptedRunner::new();
    for op in GitOp::ALL {
        let answer = match op {
            GitOp::CountAhead | GitOp::CountBehind => Scripted::ok("0"),
            _ => Scripted::ok(""),
        };
        runner.set(op, Scripted::delayed(per_op, answer));
    }
    runner
}

fn fetch_offsets(runner: &ScriptedRunner, t0: Instant) -> Vec<u64> {
    runner
        .calls()
        .iter()
        .filter(|c| c.op == Some(GitOp::FetchAll))
        .map(|c| (c.at - t0).as_secs())
        .collect()
}

fn fetch_dirs(runner: &ScriptedRunner) -> Vec<PathBuf> {
    runner
        .calls()
        .iter()
        .filter(|c| c.op == Some(GitOp::FetchAll))
        .map(|c| c.dir.clone())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn short_sweeps_start_one_interval_apart() {
    init_tracing();
    let runner = slow_runner(Duration::from_secs(5));
    let h = Harness::new(runner.clone());
    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/repos/a"]);

    let t0 = Instant::now();
    let handle = tokio::spawn(fleet.scheduler(SweepMode::Forever).run());
    tokio::time::sleep(Duration::from_secs(130)).await;
    h.shutdown.cancel();
    let sweeps = handle.await.unwrap();

    // Each sweep takes 20s; the next one starts 60s after the previous start.
    assert_eq!(fetch_offsets(&runner, t0), vec![0, 60, 120]);
    assert_eq!(sweeps, 3);
}

#[tokio::test(start_paused = true)]
async fn overrunning_sweeps_start_back_to_back() {
    let runner = slow_runner(Duration::from_secs(5));
    let h = Harness::new(runner.clone());
    let fleet = h.fleet(Duration::from_secs(10));
    fleet.seed(["/repos/a"]);

    let t0 = Instant::now();
    let handle = tokio::spawn(fleet.scheduler(SweepMode::Forever).run());
    tokio::time::sleep(Duration::from_secs(45)).await;
    h.shutdown.cancel();
    handle.await.unwrap();

    // 20s sweeps against a 10s interval: no sleeping, no catch-up burst.
    assert_eq!(fetch_offsets(&runner, t0), vec![0, 20, 40]);
}

#[tokio::test(start_paused = true)]
async fn sweep_visits_repositories_sequentially_in_order() {
    let runner = slow_runner(Duration::from_millis(10));
    let h = Harness::new(runner.clone());
    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/r/charlie", "/r/Alpha", "/r/bravo"]);

    let sweeps = fleet.scheduler(SweepMode::Once).run().await;

    assert_eq!(sweeps, 1);
    assert_eq!(
        fetch_dirs(&runner),
        vec![
            PathBuf::from("/r/Alpha"),
            PathBuf::from("/r/bravo"),
            PathBuf::from("/r/charlie")
        ]
    );
    assert_eq!(runner.max_concurrency(), 1);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let runner = ScriptedRunner::new();
    let h = Harness::new(runner.clone());
    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/repos/a"]);

    h.shutdown.cancel();
    let sweeps = fleet.scheduler(SweepMode::Forever).run().await;

    assert_eq!(sweeps, 0);
    assert!(runner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_between_repositories() {
    let runner = ScriptedRunner::new();
    runner.set(
        GitOp::FetchAll,
        Scripted::delayed(Duration::from_secs(3), Scripted::ok("")),
    );
    runner.diverge("/r/a", 0, 1);
    let h = Harness::new(runner.clone());
    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/r/a", "/r/b", "/r/c"]);

    let scheduler = fleet.scheduler(SweepMode::Forever);
    let report_handle = tokio::spawn(async move { scheduler.sweep().await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.shutdown.cancel();
    let report = report_handle.await.unwrap();

    assert!(report.interrupted);
    assert_eq!(report.refreshed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(fetch_dirs(&runner), vec![PathBuf::from("/r/a")]);

    // The refresh in flight at shutdown ran every step.
    let a = fleet.tracker(Path::new("/r/a")).unwrap().snapshot();
    assert_eq!(a.error_text, None);
    assert_eq!(a.commits_behind, 1);
    assert_eq!(runner.call_count(GitOp::CountBehind), 1);
    assert_eq!(runner.call_count(GitOp::StatusList), 1);
}

#[tokio::test(start_paused = true)]
async fn removed_repository_is_skipped_mid_sweep() {
    let runner = slow_runner(Duration::from_secs(5));
    let h = Harness::new(runner.clone());
    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/r/a", "/r/b", "/r/c"]);

    let scheduler = fleet.scheduler(SweepMode::Once);
    let handle = tokio::spawn(scheduler.run());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(fleet.remove(Path::new("/r/b")).await);
    handle.await.unwrap();

    assert_eq!(
        fetch_dirs(&runner),
        vec![PathBuf::from("/r/a"), PathBuf::from("/r/c")]
    );
}

#[tokio::test(start_paused = true)]
async fn failures_do_not_stop_the_sweep() {
    let runner = ScriptedRunner::new();
    runner.set_for("/r/a", GitOp::FetchAll, Scripted::fail("could not resolve host"));
    runner.diverge("/r/b", 0, 1);
    let h = Harness::new(runner.clone());
    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/r/a", "/r/b"]);

    let report = fleet.scheduler(SweepMode::Once).sweep().await;

    assert_eq!(report.refreshed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.needs_attention, 1);
    assert!(!report.interrupted);
}
