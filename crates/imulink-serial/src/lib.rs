//! Serial transport adapter backed by the `serialport` crate.
//!
//! The driver core expects a transport whose `read_frame` never blocks the
//! tick. Serial reads do block, so this adapter runs them on a reader
//! thread: it drains the OS buffer, splits the byte stream into lines, and
//! pushes complete frames into a bounded queue that `read_frame` polls
//! without blocking. Open and write use the crate's bounded timeouts, so no
//! call here can stall the host indefinitely.

pub mod framing;

use framing::LineAssembler;
use imulink_driver::{ConnectionParams, Parity, StopBits, Transport, TransportError};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How many complete frames the reader thread may buffer ahead of the tick.
const FRAME_QUEUE_DEPTH: usize = 64;
/// Reader-thread poll timeout; also bounds shutdown latency.
const READ_TIMEOUT: Duration = Duration::from_millis(50);
/// Timeout for outgoing commands.
const WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

struct ReaderHandle {
    frames: Receiver<String>,
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Transport over a local serial port.
pub struct SerialTransport {
    /// Explicit port path (`/dev/ttyUSB0`, `COM3`). `None` means the first
    /// enumerated port, matching the plug-in-and-go behavior of the device.
    port_name: Option<String>,
    writer: Option<Box<dyn SerialPort>>,
    reader: Option<ReaderHandle>,
}

impl SerialTransport {
    pub fn new(port_name: Option<String>) -> Self {
        Self {
            port_name,
            writer: None,
            reader: None,
        }
    }

    fn resolve_port(&self) -> Result<String, TransportError> {
        if let Some(name) = &self.port_name {
            return Ok(name.clone());
        }
        let ports =
            serialport::available_ports().map_err(|e| TransportError::Io(e.to_string()))?;
        ports
            .first()
            .map(|p| p.port_name.clone())
            .ok_or_else(|| TransportError::ConnectionFailed("no serial devices found".into()))
    }

    fn teardown(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.running.store(false, Ordering::Relaxed);
            if reader.thread.join().is_err() {
                warn!("Serial reader thread panicked");
            }
        }
        self.writer = None;
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self, params: &ConnectionParams) -> Result<bool, TransportError> {
        if self.writer.is_some() {
            return Ok(true);
        }
        params.validate()?;

        let path = self.resolve_port()?;
        let mut port = serialport::new(&path, params.baud_rate)
            .data_bits(map_data_bits(params.data_bits)?)
            .stop_bits(map_stop_bits(params.stop_bits)?)
            .parity(map_parity(params.parity))
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| TransportError::ConnectionFailed(format!("{path}: {e}")))?;

        let reader_port = port
            .try_clone()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        port.set_timeout(WRITE_TIMEOUT)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let (frame_tx, frame_rx) = std::sync::mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let thread = std::thread::Builder::new()
            .name("imulink-serial-reader".into())
            .spawn(move || reader_thread(reader_port, frame_tx, thread_running))
            .map_err(|e| TransportError::Io(e.to_string()))?;

        info!(port = %path, baud = params.baud_rate, "Serial port opened");
        self.writer = Some(port);
        self.reader = Some(ReaderHandle {
            frames: frame_rx,
            running,
            thread,
        });
        Ok(true)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if self.writer.is_some() || self.reader.is_some() {
            self.teardown();
            info!("Serial port closed");
        }
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        let polled = match &self.reader {
            Some(reader) => reader.frames.try_recv(),
            None => return Err(TransportError::Io("port not open".into())),
        };

        match polled {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => {
                let alive = self
                    .reader
                    .as_ref()
                    .is_some_and(|r| r.running.load(Ordering::Relaxed));
                if alive {
                    Ok(None)
                } else {
                    // The reader stopped on its own: device unplugged or
                    // the port died underneath it.
                    self.teardown();
                    Err(TransportError::Io("serial reader stopped".into()))
                }
            }
            Err(TryRecvError::Disconnected) => {
                self.teardown();
                Err(TransportError::Io("serial reader stopped".into()))
            }
        }
    }

    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(TransportError::Io("port not open".into()));
        };
        writer
            .write_all(command.as_bytes())
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn list_devices(&mut self) -> Result<Vec<String>, TransportError> {
        let ports =
            serialport::available_ports().map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(ports.iter().map(describe_port).collect())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn reader_thread(
    mut port: Box<dyn SerialPort>,
    frames: SyncSender<String>,
    running: Arc<AtomicBool>,
) {
    debug!("Serial reader thread started");
    let mut assembler = LineAssembler::default();
    let mut buf = [0u8; 1024];

    while running.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                for line in assembler.push(&buf[..n]) {
                    match frames.try_send(line) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            // The tick is falling behind; newer data matters
                            // more than a complete history.
                            debug!("Frame queue full, dropping frame");
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            running.store(false, Ordering::Relaxed);
                            return;
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(%e, "Serial read error, reader exiting");
                running.store(false, Ordering::Relaxed);
                return;
            }
        }
    }
    debug!("Serial reader thread stopped");
}

fn map_data_bits(bits: u8) -> Result<serialport::DataBits, TransportError> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(TransportError::InvalidParams(format!(
            "unsupported data bits: {other}"
        ))),
    }
}

fn map_stop_bits(stop_bits: StopBits) -> Result<serialport::StopBits, TransportError> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(TransportError::InvalidParams(
            "1.5 stop bits not supported by this transport".into(),
        )),
    }
}

fn map_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

/// Human-readable device description, VID/PID included for USB adapters.
fn describe_port(info: &serialport::SerialPortInfo) -> String {
    match &info.port_type {
        serialport::SerialPortType::UsbPort(usb) => format!(
            "{} (VID: {:04X}, PID: {:04X})",
            info.port_name, usb.vid, usb.pid
        ),
        _ => info.port_name.clone(),
    }
}
