use imulink_driver::ConnectionParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Serial port path (`/dev/ttyUSB0`, `COM3`).
    /// `None` means the first enumerated device.
    pub port: Option<String>,
    /// Reconnect automatically while disconnected.
    pub auto_reconnect: bool,
    /// Seconds between reconnect attempts.
    pub reconnect_interval_secs: f32,
    /// Host tick rate driving the poll loop (Hz).
    pub tick_rate_hz: u32,
    /// Serial link settings, applied on the next connect.
    pub connection: ConnectionParams,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            port: None,
            auto_reconnect: true,
            reconnect_interval_secs: 3.0,
            tick_rate_hz: 120,
            connection: ConnectionParams::default(),
        }
    }
}
