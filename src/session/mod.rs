//! One control run: connect, drive the arm from poses, stop.
//!
//! ```text
//! Idle ──start──▶ Calibrating ──rest sent──▶ Active
//!                   ▲      │                   │ reconnects exhausted
//!                   │      ▼                   ▼
//!                   │    Fault ◀───────────────┘
//!                   └──reconnect──┘
//! any ──EmergencyStop──▶ EmergencyStop ──Reset──▶ Calibrating
//! any ──Quit──▶ (rest, close, exit)
//! ```

mod control;
mod runner;
mod status_file;
mod sweep;

pub use control::{ControlLoop, TickReport};
pub use runner::{SessionSummary, run_session, spawn_capture};
pub use status_file::spawn_status_writer;
pub use sweep::{SWEEP_ANGLES, run_sweep};

use serde::Serialize;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Calibrating,
    Active,
    Fault,
    EmergencyStop,
}

/// Out-of-band operator input, observed by the control loop within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OperatorSignal {
    /// Park every joint once and ignore poses until `Reset`.
    EmergencyStop,
    Reset,
    /// Best-effort park, release the link, end the session.
    Quit,
}

impl OperatorSignal {
    /// Single-key shortcuts accepted on the operator console.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'e' => Some(Self::EmergencyStop),
            'r' => Some(Self::Reset),
            'q' => Some(Self::Quit),
            _ => None,
        }
    }
}
