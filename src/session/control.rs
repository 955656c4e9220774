use super::{OperatorSignal, SessionState};
use crate::diagnostics;
use crate::error::LinkError;
use crate::joints::{CalibrationProfile, JointId, JointMap};
use crate::link::{ActuatorLink, Connector, LinkState};
use crate::motion::MotionFilter;
use crate::pose::{HoldReason, MapOutcome, PoseMapper, PoseSample};
use crate::protocol::Command;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Session state after the tick.
    pub state: SessionState,
    /// Commands handed to the link, in send order.
    pub sent: Vec<Command>,
    /// Set when a pose arrived but was not trusted.
    pub hold: Option<HoldReason>,
}

impl TickReport {
    fn new(state: SessionState) -> Self {
        Self {
            state,
            sent: Vec::new(),
            hold: None,
        }
    }
}

/// The per-tick pipeline: pose → mapper → filter → link.
///
/// Owns the link and the filter outright. Every method blocks for at most
/// one bounded serial operation per command, plus the ready timeout when a
/// connection attempt is due.
#[derive(Debug)]
pub struct ControlLoop {
    profile: Arc<CalibrationProfile>,
    mapper: PoseMapper,
    filter: MotionFilter,
    link: ActuatorLink,
    state: SessionState,
    reconnect_failures: u32,
    commands_sent: u64,
}

impl ControlLoop {
    pub fn new(profile: Arc<CalibrationProfile>, connector: Box<dyn Connector>) -> Self {
        let mapper = PoseMapper::new(profile.mapper.clone());
        let filter = MotionFilter::new(Arc::clone(&profile));
        let link = ActuatorLink::new(profile.link.clone(), connector);
        Self {
            profile,
            mapper,
            filter,
            link,
            state: SessionState::Idle,
            reconnect_failures: 0,
            commands_sent: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn filter(&self) -> &MotionFilter {
        &self.filter
    }

    pub fn profile(&self) -> &Arc<CalibrationProfile> {
        &self.profile
    }

    /// Commands delivered since construction, ticks and operator signals alike.
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Leave `Idle`. The connection itself happens on the next tick.
    pub fn start(&mut self) {
        if self.state == SessionState::Idle {
            self.transition(SessionState::Calibrating);
        }
    }

    /// Run one control tick with the newest pose, if one arrived.
    pub fn tick(&mut self, pose: Option<&PoseSample>, now: Instant) -> TickReport {
        let mut report = TickReport::new(self.state);
        match self.state {
            SessionState::Idle | SessionState::EmergencyStop => {}
            SessionState::Calibrating => self.calibrate(now, &mut report),
            SessionState::Active => self.drive(pose, now, &mut report),
            SessionState::Fault => self.recover(now),
        }
        report.state = self.state;
        report
    }

    /// Apply an operator signal. `Break` means the session is over and the
    /// link has been released.
    pub fn handle_signal(&mut self, signal: OperatorSignal, now: Instant) -> ControlFlow<()> {
        tracing::info!(?signal, state = %self.state, "operator signal");
        match signal {
            OperatorSignal::EmergencyStop => {
                if self.state != SessionState::EmergencyStop {
                    if self.link.is_ready() {
                        self.send_rest(now, &mut Vec::new());
                    } else {
                        tracing::warn!(link = %self.link.state(), "emergency stop without a ready link; holding");
                    }
                    self.transition(SessionState::EmergencyStop);
                }
                ControlFlow::Continue(())
            }
            OperatorSignal::Reset => {
                self.reconnect_failures = 0;
                self.transition(SessionState::Calibrating);
                ControlFlow::Continue(())
            }
            OperatorSignal::Quit => {
                if self.link.is_ready() {
                    self.send_rest(now, &mut Vec::new());
                }
                self.link.close();
                self.transition(SessionState::Idle);
                ControlFlow::Break(())
            }
        }
    }

    fn calibrate(&mut self, now: Instant, report: &mut TickReport) {
        if !self.link.is_ready() {
            let attempt = match self.link.state() {
                LinkState::Disconnected => self.link.connect(),
                _ => self.link.reconnect(now),
            };
            match attempt {
                Ok(()) => {}
                Err(LinkError::BackoffPending { .. }) => return,
                Err(error) => {
                    tracing::error!(%error, "calibration could not reach the controller");
                    self.transition(SessionState::Fault);
                    return;
                }
            }
        }

        if self.send_rest(now, &mut report.sent) {
            self.reconnect_failures = 0;
            self.transition(SessionState::Active);
        } else {
            self.transition(SessionState::Fault);
        }
    }

    fn drive(&mut self, pose: Option<&PoseSample>, now: Instant, report: &mut TickReport) {
        if !self.link.is_ready() {
            self.retry_link(now, report);
            return;
        }

        let Some(pose) = pose else {
            self.keep_alive(now, report);
            return;
        };

        let targets = match self.mapper.map(pose) {
            MapOutcome::Update(targets) => targets,
            MapOutcome::NoUpdate(reason) => {
                tracing::debug!(?reason, "holding last output");
                report.hold = Some(reason);
                return;
            }
        };

        for joint in JointId::ALL {
            let out = self.filter.filter(joint, targets[joint], now);
            if out.should_send && !self.send_angle(joint, out.safe_angle, &mut report.sent) {
                break;
            }
        }
    }

    fn keep_alive(&mut self, now: Instant, report: &mut TickReport) {
        let Some(interval) = self.profile.session.keep_alive else {
            return;
        };
        for joint in JointId::ALL {
            if let Some(angle) = self.filter.keep_alive_due(joint, now, interval)
                && !self.send_angle(joint, angle, &mut report.sent)
            {
                break;
            }
        }
    }

    /// Active but the link dropped: bounded reconnects, then `Fault`.
    ///
    /// Opening the port reboots the controller to its boot angles, so a
    /// restored link is recalibrated to rest and the filter ramps from there.
    fn retry_link(&mut self, now: Instant, report: &mut TickReport) {
        match self.link.reconnect(now) {
            Ok(()) => {
                tracing::info!("link restored; recalibrating");
                self.transition(SessionState::Calibrating);
                self.calibrate(now, report);
            }
            Err(LinkError::BackoffPending { .. }) => {}
            Err(error) => {
                self.reconnect_failures += 1;
                let limit = self.profile.link.max_reconnect_attempts;
                tracing::warn!(%error, attempt = self.reconnect_failures, limit, "reconnect failed");
                if self.reconnect_failures >= limit {
                    self.transition(SessionState::Fault);
                }
            }
        }
    }

    fn recover(&mut self, now: Instant) {
        match self.link.reconnect(now) {
            Ok(()) => self.transition(SessionState::Calibrating),
            Err(LinkError::BackoffPending { .. }) => {}
            Err(error) => tracing::debug!(%error, "controller still unreachable"),
        }
    }

    /// Command every joint to rest and record it in the filter. False if the
    /// link failed part way.
    fn send_rest(&mut self, now: Instant, sent: &mut Vec<Command>) -> bool {
        let rest = JointMap::from_fn(|joint| self.profile.rest_angle(joint));
        let delivered = self.send_all(&rest, sent);
        if delivered {
            self.filter.settle_at_rest(now);
        }
        delivered
    }

    fn send_all(&mut self, angles: &JointMap<f64>, sent: &mut Vec<Command>) -> bool {
        JointId::ALL
            .into_iter()
            .all(|joint| self.send_angle(joint, angles[joint], sent))
    }

    /// Returns false only when the link can no longer carry commands.
    fn send_angle(&mut self, joint: JointId, angle: f64, sent: &mut Vec<Command>) -> bool {
        let command = Command::bounded(joint, angle, self.profile.limits(joint));
        match self.link.send(&command) {
            Ok(_) => {
                self.commands_sent += 1;
                sent.push(command);
                true
            }
            Err(LinkError::Encode(error)) => {
                tracing::error!(%joint, %error, "refusing to send out-of-range command");
                true
            }
            Err(error) => {
                tracing::warn!(%joint, %error, "command not delivered");
                false
            }
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        diagnostics::board().session_state(to);
        tracing::info!(%from, %to, "session state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::link::SimulatedArm;
    use crate::pose::{LANDMARK_COUNT, Landmark};
    use std::time::Duration;

    fn profile() -> Arc<CalibrationProfile> {
        let mut config = Config::default();
        config.link.ready_timeout_ms = 200;
        config.motion.smoothing = 1.0;
        config.motion.max_delta_per_tick = 180.0;
        Arc::new(CalibrationProfile::from_config(&config).unwrap())
    }

    fn pose_at(x: f64, confidence: f64) -> PoseSample {
        let mut landmarks = [Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        landmarks[0] = Landmark::new(x, 0.5, 0.0);
        landmarks[9] = Landmark::new(x, 0.3, 0.0);
        PoseSample::new(landmarks, confidence, Instant::now())
    }

    fn active_loop(arm: &SimulatedArm) -> ControlLoop {
        let mut control = ControlLoop::new(profile(), Box::new(arm.connector()));
        control.start();
        let report = control.tick(None, Instant::now());
        assert_eq!(report.state, SessionState::Active);
        assert_eq!(report.sent.len(), 4);
        control
    }

    #[test]
    fn calibration_moves_every_joint_to_rest() {
        let arm = SimulatedArm::new();
        let control = active_loop(&arm);
        assert_eq!(control.link_state(), LinkState::Ready);
        assert_eq!(arm.angles(), [90, 90, 90, 0]);
    }

    #[test]
    fn pose_drives_shoulder() {
        let arm = SimulatedArm::new();
        let mut control = active_loop(&arm);
        let report = control.tick(Some(&pose_at(0.8, 0.9)), Instant::now());
        assert!(report.sent.contains(&Command::new(JointId::Shoulder, 180)));
        assert_eq!(arm.angles()[0], 180);
    }

    #[test]
    fn low_confidence_holds_previous_output() {
        let arm = SimulatedArm::new();
        let mut control = active_loop(&arm);
        control.tick(Some(&pose_at(0.8, 0.9)), Instant::now());
        let before = JointMap::from_fn(|j| control.filter().last_output(j));

        let report = control.tick(Some(&pose_at(0.2, 0.1)), Instant::now());
        assert!(matches!(report.hold, Some(HoldReason::LowConfidence { .. })));
        assert!(report.sent.is_empty());
        for joint in JointId::ALL {
            assert!((control.filter().last_output(joint) - before[joint]).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn initial_connect_failure_faults_then_recovers() {
        let arm = SimulatedArm::new();
        arm.unplug();
        let mut control = ControlLoop::new(profile(), Box::new(arm.connector()));
        control.start();
        assert_eq!(control.tick(None, Instant::now()).state, SessionState::Fault);

        arm.plug_in();
        let later = Instant::now() + Duration::from_secs(10);
        assert_eq!(control.tick(None, later).state, SessionState::Calibrating);
        assert_eq!(control.tick(None, later).state, SessionState::Active);
    }

    #[test]
    fn reset_from_emergency_stop_recalibrates() {
        let arm = SimulatedArm::new();
        let mut control = active_loop(&arm);
        let now = Instant::now();
        assert!(control.handle_signal(OperatorSignal::EmergencyStop, now).is_continue());
        assert!(control.tick(Some(&pose_at(0.8, 0.9)), now).sent.is_empty());

        assert!(control.handle_signal(OperatorSignal::Reset, now).is_continue());
        assert_eq!(control.state(), SessionState::Calibrating);
        assert_eq!(control.tick(None, now).state, SessionState::Active);
    }

    #[test]
    fn quit_parks_arm_and_closes_link() {
        let arm = SimulatedArm::new();
        let mut control = active_loop(&arm);
        control.tick(Some(&pose_at(0.8, 0.9)), Instant::now());

        assert!(control.handle_signal(OperatorSignal::Quit, Instant::now()).is_break());
        assert_eq!(arm.angles(), [90, 90, 90, 0]);
        assert_eq!(control.link_state(), LinkState::Disconnected);
    }

    #[test]
    fn reconnect_ramps_from_rest_instead_of_jumping() {
        let mut config = Config::default();
        config.link.ready_timeout_ms = 200;
        config.motion.smoothing = 1.0;
        config.motion.max_delta_per_tick = 10.0;
        let profile = Arc::new(CalibrationProfile::from_config(&config).unwrap());
        let arm = SimulatedArm::new();
        let mut control = ControlLoop::new(profile, Box::new(arm.connector()));
        control.start();
        let t0 = Instant::now();
        control.tick(None, t0);
        for _ in 0..12 {
            control.tick(Some(&pose_at(0.8, 0.9)), t0);
        }
        assert_eq!(arm.angles()[0], 180);

        arm.unplug();
        control.tick(Some(&pose_at(0.2, 0.9)), t0);
        arm.plug_in();
        let booted_at = arm.writes().len();

        let later = t0 + Duration::from_secs(5);
        let report = control.tick(None, later);
        assert_eq!(report.state, SessionState::Active);
        assert_eq!(report.sent.len(), 4);
        for _ in 0..4 {
            control.tick(Some(&pose_at(0.2, 0.9)), later);
        }

        let shoulder: Vec<u8> = arm.writes()[booted_at..]
            .iter()
            .filter(|(channel, _)| *channel == 0)
            .map(|(_, angle)| *angle)
            .collect();
        assert_eq!(shoulder.first(), Some(&90));
        for pair in shoulder.windows(2) {
            assert!(pair[0].abs_diff(pair[1]) <= 10, "shoulder jumped: {shoulder:?}");
        }
        assert!(shoulder.len() > 3, "{shoulder:?}");
    }

    #[test]
    fn signal_traffic_is_counted() {
        let arm = SimulatedArm::new();
        let mut control = active_loop(&arm);
        assert_eq!(control.commands_sent(), 4);
        control.handle_signal(OperatorSignal::EmergencyStop, Instant::now());
        assert_eq!(control.commands_sent(), 8);
        control.handle_signal(OperatorSignal::Quit, Instant::now());
        assert_eq!(control.commands_sent(), 12);
    }

    #[test]
    fn keep_alive_resends_quiet_joints() {
        let mut config = Config::default();
        config.link.ready_timeout_ms = 200;
        config.session.keep_alive_ms = 100;
        let profile = Arc::new(CalibrationProfile::from_config(&config).unwrap());
        let arm = SimulatedArm::new();
        let mut control = ControlLoop::new(profile, Box::new(arm.connector()));
        control.start();
        let start = Instant::now();
        control.tick(None, start);

        assert!(control.tick(None, start + Duration::from_millis(50)).sent.is_empty());
        let report = control.tick(None, start + Duration::from_millis(150));
        assert_eq!(report.sent.len(), 4);
    }
}
