//! Stop, restart and concurrent control while callbacks are in flight

use std::time::Duration as StdDuration;

use crate::Harness;
use beacon_core::{BeaconConfig, Step, TxOutcome, TxState, Wake};
use tokio::time::sleep;

fn config() -> BeaconConfig {
    BeaconConfig::new(20, 500).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_element() {
    let harness = Harness::start(config());
    harness.tx.start("ooo");

    // Middle of the first dah (500..680)
    sleep(StdDuration::from_millis(600)).await;
    assert!(harness.output.is_on());
    assert_eq!(harness.tx.current_state(), TxState::EmitElement);

    harness.tx.stop();
    let stopped_at = tokio::time::Instant::now();
    harness.wait_idle().await;

    // Torn down by the in-flight callback at the end of the element
    assert!(stopped_at.elapsed() <= StdDuration::from_millis(3 * 60));
    assert!(!harness.output.is_on());
    assert!(!harness.tx.is_transmitting());
    assert_eq!(harness.tx.last_outcome(), Some(TxOutcome::Stopped));

    // Nothing more is keyed afterwards
    sleep(StdDuration::from_secs(5)).await;
    assert_eq!(harness.output.timeline().key_downs(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_pause() {
    let harness = Harness::start(config());
    harness.tx.start("sos");
    sleep(StdDuration::from_millis(100)).await;
    harness.tx.stop();

    harness.wait_idle().await;
    assert_eq!(harness.output.timeline().key_downs(), 0);
    assert_eq!(harness.tx.last_outcome(), Some(TxOutcome::Stopped));
}

#[tokio::test(start_paused = true)]
async fn test_start_while_requested_is_noop() {
    let harness = Harness::start(config());
    assert!(harness.tx.start("e"));
    assert!(!harness.tx.start("sos"));

    sleep(StdDuration::from_millis(520)).await;
    assert!(harness.tx.is_transmitting());
    assert!(!harness.tx.start("sos"));

    harness.wait_idle().await;
    assert_eq!(harness.output.timeline().to_morse_string(beacon_core::Duration::from_millis(60)), ".");
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let harness = Harness::start(config());
    harness.tx.start("mmm");
    sleep(StdDuration::from_millis(550)).await;
    harness.tx.stop();
    // Still requested until the in-flight callback lands
    assert!(!harness.tx.start("e"));

    harness.wait_idle().await;
    assert!(harness.tx.start("e"));
    harness.wait_idle().await;

    assert_eq!(harness.tx.last_outcome(), Some(TxOutcome::Completed));
    assert_eq!(harness.output.timeline().keyed_durations(), [180, 60]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_wake_after_restart_is_ignored() {
    let harness = Harness::start(config());
    harness.tx.start("e");
    harness.wait_idle().await;

    harness.tx.start("e");
    let before = harness.output.events_ms().len();
    // Tokens of the first session, delivered late from another task
    let tx = harness.tx.clone();
    tokio::spawn(async move {
        tx.fire(Wake::new(1, Step::PreTxPause));
        tx.fire(Wake::new(1, Step::ElementEnd));
    })
    .await
    .unwrap();

    assert_eq!(harness.output.events_ms().len(), before);
    assert_eq!(harness.tx.current_state(), TxState::PreTxPause);
    harness.wait_idle().await;
    assert_eq!(harness.output.timeline().key_downs(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_idle_does_not_block_next_start() {
    let harness = Harness::start(config());
    harness.tx.stop();
    assert!(!harness.tx.is_requested());

    assert!(harness.tx.start("e"));
    harness.wait_idle().await;
    assert_eq!(harness.tx.last_outcome(), Some(TxOutcome::Completed));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_starts_accept_one() {
    let harness = Harness::start(config());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let tx = harness.tx.clone();
        handles.push(tokio::spawn(async move { tx.start("e") }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
    harness.wait_idle().await;
    assert_eq!(harness.output.timeline().key_downs(), 1);
}
