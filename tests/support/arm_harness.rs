#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use gesture_arm::config::Config;
use gesture_arm::joints::CalibrationProfile;
use gesture_arm::link::{Connector, Transport};
use gesture_arm::pose::{LANDMARK_COUNT, Landmark, PoseSample, landmark};
use gesture_arm::protocol::{Command, decode};

#[derive(Debug)]
struct Script {
    written: Vec<u8>,
    opens: u32,
    unplugged: bool,
    silent: bool,
}

/// Controller double that records raw bytes instead of moving servos.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedController {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script {
                written: Vec::new(),
                opens: 0,
                unplugged: false,
                silent: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connector(&self) -> Box<dyn Connector> {
        Box::new(ScriptedConnector {
            controller: self.clone(),
        })
    }

    pub fn unplug(&self) {
        self.lock().unplugged = true;
    }

    pub fn plug_in(&self) {
        self.lock().unplugged = false;
    }

    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    pub fn opens(&self) -> u32 {
        self.lock().opens
    }

    /// Every command written so far, decoded strictly.
    pub fn commands(&self) -> Vec<Command> {
        let written = self.lock().written.clone();
        written
            .split_inclusive(|b| *b == b'\n')
            .map(|line| decode(line).expect("host wrote a malformed command"))
            .collect()
    }

    pub fn clear(&self) {
        self.lock().written.clear();
    }
}

struct ScriptedConnector {
    controller: ScriptedController,
}

impl Connector for ScriptedConnector {
    fn open(&mut self, port: &str, _baud: u32) -> io::Result<Box<dyn Transport>> {
        let mut script = self.controller.lock();
        if script.unplugged {
            return Err(io::Error::new(io::ErrorKind::NotFound, port.to_string()));
        }
        script.opens += 1;
        let pending = if script.silent {
            Vec::new()
        } else {
            b"Arduino ready\r\n".to_vec()
        };
        Ok(Box::new(ScriptedTransport {
            controller: self.controller.clone(),
            pending,
        }))
    }
}

struct ScriptedTransport {
    controller: ScriptedController,
    pending: Vec<u8>,
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return Err(io::ErrorKind::TimedOut.into());
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut script = self.controller.lock();
        if script.unplugged {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        script.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Fast, unsmoothed profile so one pose moves a joint all the way.
pub fn responsive_profile(edit: impl FnOnce(&mut Config)) -> Arc<CalibrationProfile> {
    let mut config = Config::default();
    config.link.ready_timeout_ms = 200;
    config.motion.smoothing = 1.0;
    config.motion.max_delta_per_tick = 180.0;
    edit(&mut config);
    Arc::new(CalibrationProfile::from_config(&config).expect("valid test profile"))
}

/// Upright open-ish hand with the wrist at horizontal position `x`.
pub fn pose_at(x: f64, confidence: f64) -> PoseSample {
    let mut landmarks = [Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
    landmarks[landmark::WRIST] = Landmark::new(x, 0.5, 0.0);
    landmarks[landmark::MIDDLE_MCP] = Landmark::new(x, 0.3, 0.0);
    PoseSample::new(landmarks, confidence, Instant::now())
}
