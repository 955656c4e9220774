//! Process-wide arm status, readable at any time without touching the
//! control loop.

pub mod status;

pub use status::{
    CaptureState, CaptureStatus, LinkStatus, SessionStatus, StatusBoard, StatusSnapshot, board,
    snapshot_json,
};
