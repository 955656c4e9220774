//! Host ↔ firmware wire protocol: `S<channel>,<angle>\n`, ASCII, no per-command
//! acknowledgement.

mod codec;
pub mod firmware;

pub use codec::{Command, LineBuffer, MAX_LINE_LEN, READY_LINE, decode, encode, is_ready_line};
pub use firmware::{FirmwareInterpreter, ServoBank};

/// Serial speed the firmware is built for.
pub const DEFAULT_BAUD: u32 = 9600;
