use crate::transport::TransportError;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Serial link settings.
///
/// Immutable once handed to `connect`; changing them while connected takes
/// effect on the next connect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Baud rate (must be positive).
    pub baud_rate: u32,
    /// Data bits per character (5-8).
    pub data_bits: u8,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl ConnectionParams {
    /// Check the numeric ranges before handing the params to a transport.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.baud_rate == 0 {
            return Err(TransportError::InvalidParams(
                "baud rate must be positive".into(),
            ));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(TransportError::InvalidParams(format!(
                "data bits must be 5..=8, got {}",
                self.data_bits
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Connection lifecycle state. Single source of truth; connect attempts
/// return synchronously, so no intermediate "connecting" state is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// One decoded IMU reading.
///
/// The current wire format only carries orientation; the vector fields exist
/// for devices that also stream raw sensor data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Device orientation quaternion. Passed through as decoded, never
    /// normalized; malformed input can yield a non-unit quaternion.
    pub orientation: Quat,
    /// Linear acceleration (m/s^2).
    pub acceleration: Option<Vec3>,
    /// Angular velocity (rad/s).
    pub gyroscope: Option<Vec3>,
    /// Magnetic field (uT).
    pub magnetometer: Option<Vec3>,
    /// Host-relative time in seconds, non-decreasing within a session.
    pub timestamp: f32,
}
