use crate::types::ConnectionParams;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(&'static str),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid connection parameters: {0}")]
    InvalidParams(String),
}

/// Capability contract the connection controller drives.
///
/// Implementations wrap whatever actually moves the bytes (USB serial,
/// Bluetooth, a test script) behind synchronous calls. `read_frame` must
/// never block the tick; transports that need background I/O buffer frames
/// internally and hand them out one at a time.
pub trait Transport {
    /// Open the link. `Ok(false)` means the transport declined cleanly
    /// (e.g. no device present); `Err` carries a transport-level failure.
    fn connect(&mut self, params: &ConnectionParams) -> Result<bool, TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Poll one buffered frame. `Ok(None)` when nothing has arrived.
    fn read_frame(&mut self) -> Result<Option<String>, TransportError>;

    /// Send a command verbatim. Fire-and-forget; no acknowledgment.
    fn write(&mut self, command: &str) -> Result<(), TransportError>;

    /// Enumerate candidate devices as human-readable descriptions.
    fn list_devices(&mut self) -> Result<Vec<String>, TransportError>;
}

/// Transport for platforms without serial support.
///
/// Stands in for the real adapter so the rest of the driver compiles and
/// runs everywhere; every connect attempt reports the transport as
/// unavailable instead of the feature being compiled out.
pub struct NullTransport;

impl Transport for NullTransport {
    fn connect(&mut self, _params: &ConnectionParams) -> Result<bool, TransportError> {
        Err(TransportError::Unavailable(
            "serial transport not supported on this platform",
        ))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }

    fn write(&mut self, _command: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn list_devices(&mut self) -> Result<Vec<String>, TransportError> {
        Ok(Vec::new())
    }
}
