use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use repowatch::engine::{MonitorEvent, Runtime};
use repowatch::notify::Notifier;
use repowatch::repo::AttentionEdge;
use repowatch_test_utils::builders::Harness;
use repowatch_test_utils::{init_tracing, with_timeout, ScriptedRunner};

/// Records notifier calls so tests can assert on them after the runtime exits.
#[derive(Clone, Default)]
struct RecordingNotifier {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&mut self, path: &Path, ahead: u32, behind: u32) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("show {} ahead={ahead} behind={behind}", path.display()));
    }

    fn withdraw(&mut self, path: &Path) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("withdraw {}", path.display()));
    }
}

#[tokio::test]
async fn notifier_sees_one_show_and_one_withdraw() {
    init_tracing();
    let runner = ScriptedRunner::new();
    let mut h = Harness::new(runner.clone());
    let notifier = RecordingNotifier::default();

    let events_rx = std::mem::replace(&mut h.events_rx, tokio::sync::mpsc::channel(1).1);
    let runtime = tokio::spawn(Runtime::new(events_rx, notifier.clone()).run());

    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/r/a"]);
    let tracker = fleet.tracker(Path::new("/r/a")).unwrap();

    tracker.refresh(true, true).await;
    runner.diverge("/r/a", 0, 2);
    tracker.refresh(true, true).await;
    tracker.refresh(true, true).await;
    runner.diverge("/r/a", 0, 0);
    tracker.refresh(true, true).await;
    tracker.refresh(true, true).await;

    h.events_tx.send(MonitorEvent::ShutdownRequested).await.unwrap();
    with_timeout(runtime).await.unwrap().unwrap();

    assert_eq!(
        notifier.calls(),
        vec!["show /r/a ahead=0 behind=2", "withdraw /r/a"]
    );
}

#[tokio::test]
async fn removal_retracts_an_outstanding_notification() {
    let runner = ScriptedRunner::new();
    runner.diverge("/r/a", 1, 0);
    let mut h = Harness::new(runner.clone());
    let notifier = RecordingNotifier::default();

    let events_rx = std::mem::replace(&mut h.events_rx, tokio::sync::mpsc::channel(1).1);
    let runtime = tokio::spawn(Runtime::new(events_rx, notifier.clone()).run());

    let fleet = h.fleet(Duration::from_secs(60));
    fleet.seed(["/r/a", "/r/b"]);
    fleet.refresh_now(Path::new("/r/b"), true).await;
    fleet
        .tracker(Path::new("/r/a"))
        .unwrap()
        .refresh(true, true)
        .await;

    fleet.remove(Path::new("/r/a")).await;
    // Withdrawing a path that never showed anything is a no-op.
    fleet.remove(Path::new("/r/b")).await;

    h.events_tx.send(MonitorEvent::ShutdownRequested).await.unwrap();
    with_timeout(runtime).await.unwrap().unwrap();

    assert_eq!(
        notifier.calls(),
        vec!["show /r/a ahead=1 behind=0", "withdraw /r/a"]
    );
}

#[tokio::test]
async fn runtime_exits_when_all_senders_are_gone() {
    let (tx, rx) = tokio::sync::mpsc::channel(4);
    let notifier = RecordingNotifier::default();
    let runtime = tokio::spawn(Runtime::new(rx, notifier.clone()).run());

    tx.send(MonitorEvent::RepositoryRemoved {
        path: PathBuf::from("/r/a"),
    })
    .await
    .unwrap();
    drop(tx);

    with_timeout(runtime).await.unwrap().unwrap();
    assert!(notifier.calls().is_empty());
}

#[tokio::test]
async fn removed_paths_are_ignored_until_added_again() {
    let (tx, rx) = mpsc::channel(16);
    let notifier = RecordingNotifier::default();
    let runtime = tokio::spawn(Runtime::new(rx, notifier.clone()).run());

    let path = PathBuf::from("/r/a");
    let show = |behind| {
        MonitorEvent::Attention(AttentionEdge::Show {
            path: PathBuf::from("/r/a"),
            ahead: 0,
            behind,
        })
    };

    tx.send(show(1)).await.unwrap();
    tx.send(MonitorEvent::RepositoryRemoved { path: path.clone() })
        .await
        .unwrap();
    tx.send(show(2)).await.unwrap();
    tx.send(MonitorEvent::RepositoryAdded { path: path.clone() })
        .await
        .unwrap();
    tx.send(show(3)).await.unwrap();
    tx.send(MonitorEvent::ShutdownRequested).await.unwrap();
    with_timeout(runtime).await.unwrap().unwrap();

    assert_eq!(
        notifier.calls(),
        vec![
            "show /r/a ahead=0 behind=1",
            "withdraw /r/a",
            "show /r/a ahead=0 behind=3"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn completion_racing_removal_cannot_raise_a_notification() {
    let runner = ScriptedRunner::new();
    runner.diverge("/r/a", 0, 2);
    let mut h = Harness::new(runner.clone());
    let (tx, rx) = mpsc::channel(1);
    h.events_tx = tx;
    let notifier = RecordingNotifier::default();

    let fleet = Arc::new(h.fleet(Duration::from_secs(60)));
    fleet.seed(["/r/a"]);
    let tracker = fleet.tracker(Path::new("/r/a")).unwrap();

    // The busy snapshot fills the channel; the completion is left waiting.
    let t = tracker.clone();
    let pending = tokio::spawn(async move { t.refresh(true, true).await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(tracker.snapshot().needs_attention());

    let f = Arc::clone(&fleet);
    let removal = tokio::spawn(async move { f.remove(Path::new("/r/a")).await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    let runtime = tokio::spawn(Runtime::new(rx, notifier.clone()).run());
    assert!(removal.await.unwrap());
    let outcome = pending.await.unwrap();
    h.events_tx.send(MonitorEvent::ShutdownRequested).await.unwrap();
    with_timeout(runtime).await.unwrap().unwrap();

    assert_eq!(outcome.edge, None);
    assert!(fleet.paths().is_empty());
    assert!(notifier.calls().is_empty(), "{:?}", notifier.calls());
}
