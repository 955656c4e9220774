use super::arm_harness::{ScriptedController, pose_at, responsive_profile};

use gesture_arm::joints::JointId;
use gesture_arm::protocol::Command;
use gesture_arm::session::{ControlLoop, OperatorSignal, SessionState};
use std::time::{Duration, Instant};

fn rest_commands() -> Vec<Command> {
    vec![
        Command::new(JointId::Shoulder, 90),
        Command::new(JointId::Elbow, 90),
        Command::new(JointId::Wrist, 90),
        Command::new(JointId::Hand, 0),
    ]
}

fn active(controller: &ScriptedController) -> ControlLoop {
    let mut control = ControlLoop::new(responsive_profile(|_| {}), controller.connector());
    control.start();
    assert_eq!(control.tick(None, Instant::now()).state, SessionState::Active);
    assert_eq!(controller.commands(), rest_commands());
    controller.clear();
    control
}

#[test]
fn emergency_stop_sends_one_rest_per_joint_then_holds() {
    let controller = ScriptedController::new();
    let mut control = active(&controller);
    let t0 = Instant::now();

    control.tick(Some(&pose_at(0.8, 0.95)), t0);
    assert_eq!(
        controller.commands(),
        vec![Command::new(JointId::Shoulder, 180)]
    );
    controller.clear();

    assert!(control
        .handle_signal(OperatorSignal::EmergencyStop, t0)
        .is_continue());
    assert_eq!(control.state(), SessionState::EmergencyStop);
    assert_eq!(controller.commands(), rest_commands());

    // Poses and repeated stops change nothing while stopped.
    for i in 1..=5 {
        let now = t0 + Duration::from_millis(33 * i);
        let report = control.tick(Some(&pose_at(0.2, 0.99)), now);
        assert!(report.sent.is_empty());
        assert_eq!(report.state, SessionState::EmergencyStop);
    }
    control.handle_signal(OperatorSignal::EmergencyStop, t0);
    assert_eq!(controller.commands(), rest_commands());
}

#[test]
fn reset_after_emergency_stop_resumes_pose_control() {
    let controller = ScriptedController::new();
    let mut control = active(&controller);
    let t0 = Instant::now();

    control.handle_signal(OperatorSignal::EmergencyStop, t0);
    control.handle_signal(OperatorSignal::Reset, t0);
    assert_eq!(control.state(), SessionState::Calibrating);
    controller.clear();

    assert_eq!(control.tick(None, t0).state, SessionState::Active);
    assert_eq!(controller.commands(), rest_commands());
    controller.clear();

    control.tick(Some(&pose_at(0.2, 0.95)), t0);
    assert_eq!(controller.commands(), vec![Command::new(JointId::Shoulder, 0)]);
}

#[test]
fn quit_parks_then_releases_the_port() {
    let controller = ScriptedController::new();
    let mut control = active(&controller);
    control.tick(Some(&pose_at(0.8, 0.95)), Instant::now());
    controller.clear();

    assert!(control
        .handle_signal(OperatorSignal::Quit, Instant::now())
        .is_break());
    assert_eq!(controller.commands(), rest_commands());
    assert_eq!(control.state(), SessionState::Idle);
}
