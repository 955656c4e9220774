//! Single-slot "latest pose" handoff between the capture task and the
//! control loop. Publishing overwrites whatever the consumer has not taken
//! yet; a stale sample is preferable to a backlog.

use super::PoseSample;
use tokio::sync::watch;

pub fn pose_slot() -> (PosePublisher, PoseSlot) {
    let (tx, rx) = watch::channel(None);
    (PosePublisher { tx }, PoseSlot { rx })
}

#[derive(Debug, Clone)]
pub struct PosePublisher {
    tx: watch::Sender<Option<PoseSample>>,
}

impl PosePublisher {
    /// Replace the slot contents. Never blocks, even if nobody is reading.
    pub fn publish(&self, sample: PoseSample) {
        self.tx.send_replace(Some(sample));
    }

    /// True once the consuming session has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct PoseSlot {
    rx: watch::Receiver<Option<PoseSample>>,
}

impl PoseSlot {
    /// Take the newest unseen sample, if any. Each sample is handed out once.
    pub fn take_latest(&mut self) -> Option<PoseSample> {
        // Works after the publisher is dropped too; the last value stays readable.
        let latest = self.rx.borrow_and_update();
        if latest.has_changed() {
            latest.clone()
        } else {
            None
        }
    }
}
