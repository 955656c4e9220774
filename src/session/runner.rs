use super::{ControlLoop, OperatorSignal, SessionState};
use crate::diagnostics;
use crate::pose::{PosePublisher, PoseSlot, PoseSource};
use anyhow::Result;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, block_in_place};
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub ticks: u64,
    pub commands_sent: u64,
    pub held_ticks: u64,
    pub final_state: Option<SessionState>,
}

/// Drive `control` until a `Quit` arrives or every signal sender is gone.
///
/// Signals win over a due tick, so quit and reset are seen within one tick
/// interval. Control calls block on serial I/O and run under
/// `block_in_place`; this needs the multi-threaded runtime.
pub async fn run_session(
    mut control: ControlLoop,
    mut poses: PoseSlot,
    mut signals: mpsc::Receiver<OperatorSignal>,
) -> Result<SessionSummary> {
    let mut ticker = tokio::time::interval(control.profile().session.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut summary = SessionSummary::default();
    control.start();
    tracing::info!(tick = ?control.profile().session.tick_interval, "session started");

    loop {
        tokio::select! {
            biased;

            signal = signals.recv() => {
                let signal = signal.unwrap_or(OperatorSignal::Quit);
                let flow = block_in_place(|| control.handle_signal(signal, Instant::now()));
                if flow.is_break() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let pose = poses.take_latest();
                let report = block_in_place(|| control.tick(pose.as_ref(), Instant::now()));
                summary.ticks += 1;
                if report.hold.is_some() {
                    summary.held_ticks += 1;
                }
            }
        }
    }

    summary.commands_sent = control.commands_sent();
    summary.final_state = Some(control.state());
    tracing::info!(
        ticks = summary.ticks,
        commands = summary.commands_sent,
        held = summary.held_ticks,
        "session ended"
    );
    Ok(summary)
}

/// Pull samples from `source` into the latest-pose slot. Ends the session
/// with `Quit` when the source is exhausted or fails, and stops reading once
/// the session is gone.
pub fn spawn_capture(
    mut source: Box<dyn PoseSource>,
    publisher: PosePublisher,
    signals: mpsc::Sender<OperatorSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let status = diagnostics::board();
        let mut frames: u64 = 0;
        loop {
            if publisher.is_closed() {
                tracing::debug!(source = source.name(), frames, "session gone; capture stopped");
                status.capture_finished(frames);
                return;
            }
            match source.next_sample().await {
                Ok(Some(sample)) => {
                    frames += 1;
                    publisher.publish(sample);
                    status.capture_progress(frames);
                }
                Ok(None) => {
                    tracing::info!(source = source.name(), frames, "pose source exhausted");
                    status.capture_finished(frames);
                    break;
                }
                Err(error) => {
                    tracing::error!(source = source.name(), %error, "pose source failed");
                    status.capture_failed(frames, &error);
                    break;
                }
            }
        }
        // The session may already be gone; nothing left to notify then.
        let _ = signals.send(OperatorSignal::Quit).await;
    })
}
