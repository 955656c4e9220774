#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod joints;
pub mod link;
pub mod motion;
pub mod pose;
pub mod protocol;
pub mod session;

pub use config::Config;
pub use error::{ConfigError, DecodeError, EncodeError, LinkError};
pub use joints::{CalibrationProfile, JointId, JointLimits, JointMap};
pub use link::{ActuatorLink, LinkState};
pub use session::{ControlLoop, OperatorSignal, SessionState};
