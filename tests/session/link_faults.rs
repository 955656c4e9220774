use super::arm_harness::{ScriptedController, pose_at, responsive_profile};

use gesture_arm::joints::JointId;
use gesture_arm::link::LinkState;
use gesture_arm::protocol::Command;
use gesture_arm::session::{ControlLoop, SessionState};
use std::time::{Duration, Instant};

fn active(controller: &ScriptedController) -> ControlLoop {
    let mut control = ControlLoop::new(responsive_profile(|_| {}), controller.connector());
    control.start();
    assert_eq!(control.tick(None, Instant::now()).state, SessionState::Active);
    controller.clear();
    control
}

#[test]
fn silent_controller_never_becomes_active() {
    let controller = ScriptedController::new();
    controller.set_silent(true);
    let mut control = ControlLoop::new(responsive_profile(|_| {}), controller.connector());
    control.start();

    let report = control.tick(None, Instant::now());
    assert_eq!(report.state, SessionState::Fault);
    assert_eq!(control.link_state(), LinkState::Faulted);
    assert!(controller.commands().is_empty());
}

#[test]
fn exhausted_reconnects_fault_the_session() {
    let controller = ScriptedController::new();
    let mut control = active(&controller);
    let t0 = Instant::now();

    controller.unplug();
    let report = control.tick(Some(&pose_at(0.8, 0.9)), t0);
    assert!(report.sent.is_empty());
    assert_eq!(report.state, SessionState::Active);
    assert_eq!(control.link_state(), LinkState::Faulted);

    // Backoff has not elapsed yet: no attempt, no failure counted.
    assert_eq!(control.tick(None, t0).state, SessionState::Active);
    assert_eq!(controller.opens(), 1);

    for attempt in 1..=3_u64 {
        let now = t0 + Duration::from_secs(10 * attempt);
        let state = control.tick(None, now).state;
        let expected = if attempt < 3 {
            SessionState::Active
        } else {
            SessionState::Fault
        };
        assert_eq!(state, expected, "after attempt {attempt}");
    }

    controller.plug_in();
    let later = t0 + Duration::from_secs(60);
    assert_eq!(control.tick(None, later).state, SessionState::Calibrating);
    assert_eq!(control.tick(None, later).state, SessionState::Active);
    assert_eq!(controller.commands().len(), 4);
}

#[test]
fn reconnect_while_active_recalibrates_then_ramps() {
    let controller = ScriptedController::new();
    let mut control = ControlLoop::new(
        responsive_profile(|c| c.motion.max_delta_per_tick = 10.0),
        controller.connector(),
    );
    control.start();
    let t0 = Instant::now();
    control.tick(None, t0);
    for _ in 0..9 {
        control.tick(Some(&pose_at(0.8, 0.9)), t0);
    }
    assert!(controller
        .commands()
        .contains(&Command::new(JointId::Shoulder, 180)));

    controller.unplug();
    control.tick(Some(&pose_at(0.2, 0.9)), t0 + Duration::from_millis(33));
    assert_eq!(control.link_state(), LinkState::Faulted);
    controller.clear();

    controller.plug_in();
    let later = t0 + Duration::from_secs(5);
    let report = control.tick(None, later);
    assert_eq!(report.state, SessionState::Active);
    assert_eq!(control.link_state(), LinkState::Ready);
    assert_eq!(
        report.sent,
        vec![
            Command::new(JointId::Shoulder, 90),
            Command::new(JointId::Elbow, 90),
            Command::new(JointId::Wrist, 90),
            Command::new(JointId::Hand, 0),
        ]
    );
    assert_eq!(controller.opens(), 2);

    // The rebooted board sits at rest; pose control resumes one step at a time.
    let report = control.tick(Some(&pose_at(0.2, 0.9)), later);
    assert!(report.sent.contains(&Command::new(JointId::Shoulder, 80)));
}
