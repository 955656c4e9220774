//! In-process stand-in for the microcontroller, used by `--dry-run` and tests.
//! Opening a port "resets the board" the way a real USB serial open does: the
//! firmware boots, parks every servo and prints its readiness line.

use super::transport::{Connector, Transport};
use crate::joints::CalibrationProfile;
use crate::protocol::firmware::DEFAULT_PINS;
use crate::protocol::{FirmwareInterpreter, ServoBank};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct ServoState {
    pins: [Option<u8>; 4],
    angles: [u8; 4],
    writes: Vec<(u8, u8)>,
}

/// Servo bank whose state outlives individual connections.
#[derive(Debug, Clone, Default)]
pub struct SimulatedServos {
    inner: Arc<Mutex<ServoState>>,
}

impl SimulatedServos {
    fn lock(&self) -> MutexGuard<'_, ServoState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ServoBank for SimulatedServos {
    fn attach(&mut self, channel: u8, pin: u8) {
        if let Some(slot) = self.lock().pins.get_mut(usize::from(channel)) {
            *slot = Some(pin);
        }
    }

    fn write(&mut self, channel: u8, angle: u8) {
        let mut state = self.lock();
        if let Some(slot) = state.angles.get_mut(usize::from(channel)) {
            *slot = angle;
        }
        state.writes.push((channel, angle));
    }
}

/// Handle for steering and inspecting the simulated board.
#[derive(Debug, Clone)]
pub struct SimulatedArm {
    servos: SimulatedServos,
    wiring: [u8; 4],
    unplugged: Arc<AtomicBool>,
    mute: Arc<AtomicBool>,
    opens: Arc<AtomicU32>,
}

impl SimulatedArm {
    /// Board wired to the stock pins.
    pub fn new() -> Self {
        Self::with_pins(DEFAULT_PINS)
    }

    pub fn with_pins(wiring: [u8; 4]) -> Self {
        Self {
            servos: SimulatedServos::default(),
            wiring,
            unplugged: Arc::default(),
            mute: Arc::default(),
            opens: Arc::default(),
        }
    }

    /// Board wired the way `profile` says the real arm is.
    pub fn for_profile(profile: &CalibrationProfile) -> Self {
        Self::with_pins(profile.pins())
    }

    pub fn connector(&self) -> SimulatedConnector {
        SimulatedConnector { arm: self.clone() }
    }

    /// Opens fail and writes on open transports return `BrokenPipe`.
    pub fn unplug(&self) {
        self.unplugged.store(true, Ordering::SeqCst);
    }

    pub fn plug_in(&self) {
        self.unplugged.store(false, Ordering::SeqCst);
    }

    /// Boot without printing the readiness line (wrong sketch, wrong baud).
    pub fn set_mute(&self, mute: bool) {
        self.mute.store(mute, Ordering::SeqCst);
    }

    pub fn angles(&self) -> [u8; 4] {
        self.servos.lock().angles
    }

    pub fn pins(&self) -> [Option<u8>; 4] {
        self.servos.lock().pins
    }

    /// Every servo write so far, boot positions included.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.servos.lock().writes.clone()
    }

    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    fn is_unplugged(&self) -> bool {
        self.unplugged.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    arm: SimulatedArm,
}

impl Connector for SimulatedConnector {
    fn open(&mut self, port: &str, _baud: u32) -> io::Result<Box<dyn Transport>> {
        if self.arm.is_unplugged() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{port}: no such device"),
            ));
        }
        self.arm.opens.fetch_add(1, Ordering::SeqCst);

        let mut firmware = FirmwareInterpreter::with_pins(self.arm.servos.clone(), self.arm.wiring);
        let ready = firmware.boot();
        let outbound = if self.arm.mute.load(Ordering::SeqCst) {
            VecDeque::new()
        } else {
            VecDeque::from(ready)
        };
        Ok(Box::new(SimulatedTransport {
            firmware,
            outbound,
            arm: self.arm.clone(),
        }))
    }
}

struct SimulatedTransport {
    firmware: FirmwareInterpreter<SimulatedServos>,
    outbound: VecDeque<u8>,
    arm: SimulatedArm,
}

impl Read for SimulatedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outbound.is_empty() {
            return Err(io::ErrorKind::TimedOut.into());
        }
        let n = buf.len().min(self.outbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.arm.is_unplugged() {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.firmware.feed(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.arm.is_unplugged() {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        Ok(())
    }
}
