//! Connection lifecycle for the serial link to the servo controller.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ready line──▶ Ready
//!       ▲                        │                       │
//!       │ close                  ▼ timeout / I/O error   │ write error
//!       └──────────────────── Faulted ◀──────────────────┘
//!                                │ reconnect (after backoff)
//!                                ▼
//!                           Connecting
//! ```
//!
//! The link never retries on its own; the session decides when to call
//! [`ActuatorLink::reconnect`].

mod backoff;
mod simulated;
mod transport;

pub use backoff::ReconnectBackoff;
pub use simulated::{SimulatedArm, SimulatedConnector, SimulatedServos};
pub use transport::{Connector, SerialConnector, Transport};

use crate::diagnostics;
use crate::error::LinkError;
use crate::joints::LinkParams;
use crate::protocol::{self, Command, LineBuffer};
use serde::Serialize;
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use strum::Display;

/// How long to pause between empty reads while waiting for the ready line.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Ready,
    Faulted,
}

/// Bytes handed to the transport. Not an acknowledgement that a servo moved;
/// the firmware never replies per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub bytes_written: usize,
}

pub struct ActuatorLink {
    params: LinkParams,
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    state: LinkState,
    backoff: ReconnectBackoff,
    lines: LineBuffer,
}

impl std::fmt::Debug for ActuatorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorLink")
            .field("port", &self.params.port)
            .field("state", &self.state)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl ActuatorLink {
    pub fn new(params: LinkParams, connector: Box<dyn Connector>) -> Self {
        let backoff = ReconnectBackoff::new(params.backoff_initial, params.backoff_max);
        Self {
            params,
            connector,
            transport: None,
            state: LinkState::Disconnected,
            backoff,
            lines: LineBuffer::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready
    }

    pub fn port(&self) -> &str {
        &self.params.port
    }

    /// Consecutive failed connection attempts since the link was last ready.
    pub fn failed_attempts(&self) -> u32 {
        self.backoff.failures()
    }

    /// Open the transport and wait for the firmware's readiness line.
    ///
    /// Blocks for at most the configured ready timeout. Any failure leaves
    /// the link `Faulted`; it is never reported `Ready` without the line.
    pub fn connect(&mut self) -> Result<(), LinkError> {
        if self.state == LinkState::Ready {
            return Ok(());
        }
        self.transport = None;
        self.transition(LinkState::Connecting);

        match self.open_and_handshake() {
            Ok(transport) => {
                self.transport = Some(transport);
                self.backoff.reset();
                self.transition(LinkState::Ready);
                tracing::info!(port = %self.params.port, baud = self.params.baud, "actuator link ready");
                Ok(())
            }
            Err(error) => {
                self.backoff.record_failure(Instant::now());
                self.fault(&error);
                Err(error)
            }
        }
    }

    /// Try to leave `Faulted` (or `Disconnected`). Does not sleep: if the
    /// backoff delay since the last failure has not elapsed, returns
    /// [`LinkError::BackoffPending`] without touching the port.
    pub fn reconnect(&mut self, now: Instant) -> Result<(), LinkError> {
        if self.state == LinkState::Ready {
            return Ok(());
        }
        if let Err(retry_in) = self.backoff.check(now) {
            return Err(LinkError::BackoffPending { retry_in });
        }
        diagnostics::board().link_reconnect();
        tracing::info!(
            port = %self.params.port,
            attempt = self.backoff.failures() + 1,
            "reconnecting actuator link"
        );
        self.connect()
    }

    /// Write one command. No retry: on failure the link is `Faulted` and the
    /// caller owns the recovery policy.
    pub fn send(&mut self, command: &Command) -> Result<Ack, LinkError> {
        if self.state != LinkState::Ready {
            return Err(LinkError::NotReady(self.state));
        }
        let bytes = protocol::encode(command)?;
        let Some(transport) = self.transport.as_mut() else {
            let error = LinkError::NotReady(self.state);
            self.fault(&error);
            return Err(error);
        };

        match transport.write_all(&bytes).and_then(|()| transport.flush()) {
            Ok(()) => {
                tracing::trace!(%command, "sent");
                Ok(Ack {
                    bytes_written: bytes.len(),
                })
            }
            Err(source) => {
                let error = LinkError::Io(source);
                self.backoff.record_failure(Instant::now());
                self.fault(&error);
                Err(error)
            }
        }
    }

    /// Release the transport. Safe to call in any state, any number of times.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take()
            && let Err(error) = transport.flush()
        {
            tracing::debug!(%error, "flush on close failed");
        }
        self.backoff.reset();
        self.lines.clear();
        if self.state != LinkState::Disconnected {
            self.transition(LinkState::Disconnected);
        }
    }

    fn open_and_handshake(&mut self) -> Result<Box<dyn Transport>, LinkError> {
        let port = self.params.port.clone();
        let mut transport = self
            .connector
            .open(&port, self.params.baud)
            .map_err(|source| LinkError::Open {
                port: port.clone(),
                source,
            })?;

        self.lines.clear();
        let started = Instant::now();
        let deadline = started + self.params.ready_timeout;
        let mut buf = [0_u8; 64];
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(LinkError::ReadyTimeout {
                    port,
                    waited: now - started,
                });
            }
            match transport.read(&mut buf) {
                Ok(n) if n > 0 => {
                    for line in self.lines.push(&buf[..n]) {
                        if protocol::is_ready_line(&line) {
                            return Ok(transport);
                        }
                        tracing::debug!(line = line.trim_end(), "ignoring pre-ready output");
                    }
                }
                Ok(_) => std::thread::sleep(READY_POLL_INTERVAL.min(deadline - now)),
                Err(error) if transport::is_idle_read(&error) => {
                    std::thread::sleep(READY_POLL_INTERVAL.min(deadline - now));
                }
                Err(error) => return Err(LinkError::Io(error)),
            }
        }
    }

    fn fault(&mut self, error: &LinkError) {
        self.transport = None;
        self.lines.clear();
        self.transition(LinkState::Faulted);
        diagnostics::board().link_error(error);
        tracing::warn!(port = %self.params.port, %error, "actuator link faulted");
    }

    fn transition(&mut self, to: LinkState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        diagnostics::board().link_state(to);
        tracing::info!(%from, %to, "link state");
    }
}
