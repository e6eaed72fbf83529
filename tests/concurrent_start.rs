//! Integration tests for overlapping calls against one track key
//!
//! A start claims its key when issued. Anything that replaces the claim
//! before decoding finishes (a newer start, stop, teardown) wins, and the
//! older start must never leave an audible graph behind.

mod helpers;

use ambient_mixer::{AudioSessionManager, Error, TrackState};
use helpers::{init_tracing, quick_asset, slow_asset, FakeBackend, Probe};
use std::sync::Arc;
use tokio::task::JoinSet;

fn initialized() -> (AudioSessionManager<FakeBackend>, Probe) {
    init_tracing();
    let (backend, probe) = FakeBackend::new();
    let manager = AudioSessionManager::new(backend);
    manager.initialize().unwrap();
    (manager, probe)
}

/// Yield until `key` shows an in-flight start
async fn until_loading(manager: &AudioSessionManager<FakeBackend>, key: &str) {
    while manager.state(key).unwrap() != TrackState::Loading {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_overlapping_starts_leave_one_session() {
    let (manager, probe) = initialized();
    let a = slow_asset("rain-a");
    let b = slow_asset("rain-b");

    let (first, second) = tokio::join!(
        manager.start("rain", &a, 0.5),
        manager.start("rain", &b, 0.7),
    );

    let (winner, loser) = match (first, second) {
        (Ok(id), Err(e)) | (Err(e), Ok(id)) => (id, e),
        other => panic!("expected exactly one winner, got {:?}", other),
    };
    assert!(matches!(loser, Error::StartCancelled(ref key) if key == "rain"));

    assert_eq!(manager.statuses().unwrap().len(), 1);
    assert_eq!(manager.session_id("rain").unwrap(), Some(winner));
    // The losing start never wired an audible graph
    assert_eq!(probe.live(), 1);
    assert_eq!(probe.nodes().len(), 1);
}

#[tokio::test]
async fn test_second_start_replaces_playing_session() {
    let (manager, probe) = initialized();
    manager.start("birds", &quick_asset("birds-1"), 0.5).await.unwrap();
    let second = manager.start("birds", &quick_asset("birds-2"), 0.5).await.unwrap();

    assert_eq!(manager.session_id("birds").unwrap(), Some(second));
    let nodes = probe.nodes();
    assert_eq!(nodes.len(), 2);
    assert!(nodes[0].state() != helpers::NodeState::Playing);
    assert_eq!(probe.live(), 1);
    assert_eq!(nodes[1].asset, b"ok:birds-2".to_vec());
}

#[tokio::test]
async fn test_stop_cancels_pending_start() {
    let (manager, probe) = initialized();
    let asset = slow_asset("street");

    let (started, stopped) = tokio::join!(manager.start("street", &asset, 0.5), async {
        until_loading(&manager, "street").await;
        manager.stop("street")
    });

    stopped.unwrap();
    assert!(matches!(started, Err(Error::StartCancelled(_))));
    assert_eq!(manager.state("street").unwrap(), TrackState::Stopped);
    assert!(probe.nodes().is_empty());
}

#[tokio::test]
async fn test_volume_set_while_loading_is_applied() {
    let (manager, _probe) = initialized();
    let asset = slow_asset("leaves");

    let (started, adjusted) = tokio::join!(manager.start("leaves", &asset, 0.5), async {
        until_loading(&manager, "leaves").await;
        manager.set_volume("leaves", 0.9)
    });

    adjusted.unwrap();
    started.unwrap();
    assert_eq!(manager.gain("leaves").unwrap(), Some(0.9));
}

#[tokio::test]
async fn test_teardown_during_load_rejects_start() {
    let (manager, probe) = initialized();
    let asset = slow_asset("rain");

    let (started, torn) = tokio::join!(manager.start("rain", &asset, 0.5), async {
        until_loading(&manager, "rain").await;
        manager.teardown()
    });

    torn.unwrap();
    assert!(matches!(started, Err(Error::TornDown)));
    assert!(probe.nodes().is_empty());
    assert_eq!(probe.closed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_tracks_start_in_parallel() {
    let (manager, probe) = initialized();
    let manager = Arc::new(manager);

    let mut join_set = JoinSet::new();
    for key in ["birds", "rain", "leaves", "street"] {
        let manager = Arc::clone(&manager);
        join_set.spawn(async move {
            let asset = slow_asset(key);
            manager.start(key, &asset, 0.5).await
        });
    }

    while let Some(result) = join_set.join_next().await {
        result.unwrap().unwrap();
    }

    let statuses = manager.statuses().unwrap();
    let keys: Vec<&str> = statuses.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["birds", "leaves", "rain", "street"]);
    assert!(statuses.iter().all(|s| s.state == TrackState::Playing));
    assert_eq!(probe.live(), 4);
}
