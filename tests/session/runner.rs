use super::arm_harness::{ScriptedController, responsive_profile};

use gesture_arm::link::SimulatedArm;
use gesture_arm::pose::{JsonLinesPoseSource, LANDMARK_COUNT, PoseRecord, pose_slot};
use gesture_arm::session::{ControlLoop, OperatorSignal, SessionState, run_session, spawn_capture};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::mpsc;

fn record(x: f64, confidence: f64) -> String {
    let mut landmarks = [[0.5, 0.5, 0.0]; LANDMARK_COUNT];
    landmarks[0] = [x, 0.5, 0.0];
    landmarks[9] = [x, 0.3, 0.0];
    serde_json::to_string(&PoseRecord {
        landmarks,
        confidence,
    })
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn replayed_poses_drive_the_simulated_arm_until_eof() {
    let profile = responsive_profile(|c| c.session.tick_ms = 5);
    let arm = SimulatedArm::new();
    let control = ControlLoop::new(profile, Box::new(arm.connector()));

    let input = (0..6)
        .map(|_| record(0.8, 0.95))
        .collect::<Vec<_>>()
        .join("\n");
    let source = JsonLinesPoseSource::new(
        "replay",
        Cursor::new(input.into_bytes()),
        Some(Duration::from_millis(15)),
    );

    let (publisher, slot) = pose_slot();
    let (tx, rx) = mpsc::channel(8);
    let capture = spawn_capture(Box::new(source), publisher, tx);

    let summary = tokio::time::timeout(Duration::from_secs(5), run_session(control, slot, rx))
        .await
        .expect("session ends at end of input")
        .unwrap();
    capture.await.unwrap();

    assert_eq!(summary.final_state, Some(SessionState::Idle));
    assert!(summary.commands_sent >= 5, "{summary:?}");
    assert!(arm.writes().contains(&(0, 180)));
    // Quit parks the arm.
    assert_eq!(arm.angles(), [90, 90, 90, 0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn low_confidence_replay_never_moves_the_arm() {
    let profile = responsive_profile(|c| c.session.tick_ms = 5);
    let controller = ScriptedController::new();
    let control = ControlLoop::new(profile, controller.connector());

    let input = (0..4)
        .map(|_| record(0.8, 0.2))
        .collect::<Vec<_>>()
        .join("\n");
    let source = JsonLinesPoseSource::new(
        "dim",
        Cursor::new(input.into_bytes()),
        Some(Duration::from_millis(15)),
    );
    let (publisher, slot) = pose_slot();
    let (tx, rx) = mpsc::channel(8);
    spawn_capture(Box::new(source), publisher, tx);

    let summary = run_session(control, slot, rx).await.unwrap();
    assert!(summary.held_ticks >= 1, "{summary:?}");
    // Calibration rest plus the rest sent on quit; nothing pose-driven.
    assert_eq!(controller.commands().len(), 8);
    assert_eq!(summary.commands_sent, 8);
    assert!(controller.commands().iter().all(|c| c.angle == 90 || c.angle == 0));
}

#[tokio::test(flavor = "multi_thread")]
async fn operator_signals_are_applied_in_order() {
    let profile = responsive_profile(|c| c.session.tick_ms = 5);
    let controller = ScriptedController::new();
    let control = ControlLoop::new(profile, controller.connector());
    let (_publisher, slot) = pose_slot();
    let (tx, rx) = mpsc::channel(8);

    let session = tokio::spawn(run_session(control, slot, rx));
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(OperatorSignal::EmergencyStop).await.unwrap();
    tx.send(OperatorSignal::Reset).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(OperatorSignal::Quit).await.unwrap();

    let summary = session.await.unwrap().unwrap();
    assert_eq!(summary.final_state, Some(SessionState::Idle));
    // calibrate, stop, recalibrate, quit: four rounds of rest.
    assert_eq!(controller.commands().len(), 16);
    assert_eq!(summary.commands_sent, 16);
}

#[tokio::test(flavor = "multi_thread")]
async fn capture_stops_once_the_session_is_gone() {
    let input = (0..1000)
        .map(|_| record(0.5, 0.9))
        .collect::<Vec<_>>()
        .join("\n");
    let source = JsonLinesPoseSource::new(
        "long",
        Cursor::new(input.into_bytes()),
        Some(Duration::from_millis(50)),
    );
    let (publisher, slot) = pose_slot();
    drop(slot);
    let (tx, mut rx) = mpsc::channel(1);

    let capture = spawn_capture(Box::new(source), publisher, tx);
    tokio::time::timeout(Duration::from_secs(2), capture)
        .await
        .expect("capture returns without draining the source")
        .unwrap();
    assert!(rx.recv().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_every_sender_ends_the_session() {
    let profile = responsive_profile(|_| {});
    let controller = ScriptedController::new();
    let control = ControlLoop::new(profile, controller.connector());
    let (_publisher, slot) = pose_slot();
    let (tx, rx) = mpsc::channel::<OperatorSignal>(1);
    drop(tx);

    let summary = tokio::time::timeout(Duration::from_secs(2), run_session(control, slot, rx))
        .await
        .expect("session ends")
        .unwrap();
    assert_eq!(summary.final_state, Some(SessionState::Idle));
}
