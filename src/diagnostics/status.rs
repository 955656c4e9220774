use crate::link::LinkState;
use crate::session::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct LinkStatus {
    pub state: LinkState,
    pub since: DateTime<Utc>,
    pub last_ready: Option<DateTime<Utc>>,
    /// Cleared once the link is ready again.
    pub last_error: Option<String>,
    pub reconnect_attempts: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub since: DateTime<Utc>,
    pub faults: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    /// No pose source has reported yet.
    Waiting,
    Streaming,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub frames: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub pid: u32,
    pub uptime_seconds: u64,
    pub link: LinkStatus,
    pub session: SessionStatus,
    pub capture: CaptureStatus,
}

#[derive(Debug, Clone)]
struct Board {
    link: LinkStatus,
    session: SessionStatus,
    capture: CaptureStatus,
}

/// What the link, the session and the pose capture last reported.
///
/// Writers never block the control loop for longer than a field update, and a
/// poisoned lock is recovered rather than dropping reports.
#[derive(Debug)]
pub struct StatusBoard {
    started_at: Instant,
    board: RwLock<Board>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: Instant::now(),
            board: RwLock::new(Board {
                link: LinkStatus {
                    state: LinkState::Disconnected,
                    since: now,
                    last_ready: None,
                    last_error: None,
                    reconnect_attempts: 0,
                },
                session: SessionStatus {
                    state: SessionState::Idle,
                    since: now,
                    faults: 0,
                },
                capture: CaptureStatus {
                    state: CaptureState::Waiting,
                    frames: 0,
                    last_error: None,
                },
            }),
        }
    }

    fn update(&self, edit: impl FnOnce(&mut Board)) {
        let mut board = self
            .board
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        edit(&mut board);
    }

    pub fn link_state(&self, state: LinkState) {
        let now = Utc::now();
        self.update(|board| {
            board.link.state = state;
            board.link.since = now;
            if state == LinkState::Ready {
                board.link.last_ready = Some(now);
                board.link.last_error = None;
            }
        });
    }

    #[allow(clippy::needless_pass_by_value)]
    pub fn link_error(&self, error: impl Display) {
        let error = error.to_string();
        self.update(|board| board.link.last_error = Some(error));
    }

    pub fn link_reconnect(&self) {
        self.update(|board| {
            board.link.reconnect_attempts = board.link.reconnect_attempts.saturating_add(1);
        });
    }

    pub fn session_state(&self, state: SessionState) {
        let now = Utc::now();
        self.update(|board| {
            if state == SessionState::Fault && board.session.state != SessionState::Fault {
                board.session.faults += 1;
            }
            board.session.state = state;
            board.session.since = now;
        });
    }

    pub fn capture_progress(&self, frames: u64) {
        self.update(|board| {
            board.capture.state = CaptureState::Streaming;
            board.capture.frames = frames;
        });
    }

    pub fn capture_finished(&self, frames: u64) {
        self.update(|board| {
            board.capture.state = CaptureState::Finished;
            board.capture.frames = frames;
        });
    }

    #[allow(clippy::needless_pass_by_value)]
    pub fn capture_failed(&self, frames: u64, error: impl Display) {
        let error = error.to_string();
        self.update(|board| {
            board.capture.state = CaptureState::Failed;
            board.capture.frames = frames;
            board.capture.last_error = Some(error);
        });
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let board = self
            .board
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        StatusSnapshot {
            pid: std::process::id(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            link: board.link,
            session: board.session,
            capture: board.capture,
        }
    }
}

static BOARD: OnceLock<StatusBoard> = OnceLock::new();

/// The process-wide board the running arm reports into.
pub fn board() -> &'static StatusBoard {
    BOARD.get_or_init(StatusBoard::new)
}

pub fn snapshot_json() -> serde_json::Value {
    serde_json::to_value(board().snapshot()).unwrap_or_else(|_| {
        serde_json::json!({
            "status": "error",
            "message": "failed to serialize status snapshot"
        })
    })
}
