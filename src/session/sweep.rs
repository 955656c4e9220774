use crate::error::LinkError;
use crate::joints::{CalibrationProfile, JointId};
use crate::link::ActuatorLink;
use crate::protocol::Command;
use std::time::Duration;

/// Positions visited by each joint, clamped to its limits before sending.
pub const SWEEP_ANGLES: [f64; 5] = [0.0, 45.0, 90.0, 135.0, 180.0];

/// Wiring check: walk each joint through [`SWEEP_ANGLES`] in turn, pausing
/// after every move, then park everything at rest and close the link.
///
/// Blocking. Returns the commands in the order they were sent.
pub fn run_sweep(
    link: &mut ActuatorLink,
    profile: &CalibrationProfile,
    pause: Duration,
) -> Result<Vec<Command>, LinkError> {
    let result = sweep(link, profile, pause);
    link.close();
    result
}

fn sweep(
    link: &mut ActuatorLink,
    profile: &CalibrationProfile,
    pause: Duration,
) -> Result<Vec<Command>, LinkError> {
    link.connect()?;
    let mut sent = Vec::new();

    for joint in JointId::ALL {
        tracing::info!(%joint, pin = profile.limits(joint).pin, "sweeping");
        for angle in SWEEP_ANGLES {
            let command = Command::bounded(joint, angle, profile.limits(joint));
            link.send(&command)?;
            sent.push(command);
            std::thread::sleep(pause);
        }
    }

    for joint in JointId::ALL {
        let command = Command::bounded(joint, profile.rest_angle(joint), profile.limits(joint));
        link.send(&command)?;
        sent.push(command);
    }
    tracing::info!(commands = sent.len(), "sweep complete; joints at rest");
    Ok(sent)
}
