use std::io::{self, Read, Write};
use std::time::Duration;

/// Byte stream to the firmware. Reads should honour a short timeout and
/// report it as `TimedOut` or `WouldBlock`.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> Transport for T {}

/// Opens transports. The link owns exactly one connector and at most one open
/// transport at a time.
pub trait Connector: Send {
    fn open(&mut self, port: &str, baud: u32) -> io::Result<Box<dyn Transport>>;
}

/// USB serial via the `serialport` crate.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    io_timeout: Duration,
}

impl SerialConnector {
    pub fn new(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }
}

impl Connector for SerialConnector {
    fn open(&mut self, port: &str, baud: u32) -> io::Result<Box<dyn Transport>> {
        let port = serialport::new(port, baud).timeout(self.io_timeout).open()?;
        Ok(Box::new(port))
    }
}

/// Classify a read error as "nothing arrived yet" rather than a failure.
pub(crate) fn is_idle_read(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
