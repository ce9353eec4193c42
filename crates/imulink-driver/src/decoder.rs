//! Wire-format decoding for the IMU's ASCII telemetry.
//!
//! The device streams one line per sample: whitespace-separated tokens where
//! the markers `W:` `X:` `Y:` `Z:` each label the next token as one
//! quaternion component. Markers may arrive in any order or be missing;
//! missing or unparseable values are soft conditions, not decode failures.

use crate::types::ImuSample;
use glam::{Quat, Vec3};
use thiserror::Error;

/// Hard decode failure. Missing or unparseable fields default to zero
/// instead; this only covers input that yields no tokens to scan at all,
/// which a line-framed transport never delivers in practice.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty frame")]
    EmptyFrame,
}

/// Decode one telemetry line into a sample stamped with `timestamp`
/// (host-relative seconds, supplied by the caller's session clock).
///
/// Each marker independently sets its component; duplicates mean the last
/// successful parse wins, and a marker whose value fails to parse leaves the
/// component at its prior value. The wire field `w` is the scalar part. The
/// quaternion is passed through as decoded and never normalized.
pub fn decode_frame(raw: &str, timestamp: f32) -> Result<ImuSample, DecodeError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(DecodeError::EmptyFrame);
    }

    let (mut w, mut x, mut y, mut z) = (0.0f32, 0.0, 0.0, 0.0);

    // A trailing marker with no following token falls off the window scan.
    for pair in tokens.windows(2) {
        let slot = match pair[0] {
            "W:" => &mut w,
            "X:" => &mut x,
            "Y:" => &mut y,
            "Z:" => &mut z,
            _ => continue,
        };
        if let Ok(value) = pair[1].parse::<f32>() {
            *slot = value;
        }
    }

    Ok(ImuSample {
        orientation: Quat::from_xyzw(x, y, z, w),
        acceleration: None,
        gyroscope: None,
        magnetometer: None,
        timestamp,
    })
}

/// Parse a comma-separated `x,y,z` triple.
///
/// Reserved for a second wire format variant. Anything other than exactly
/// three tokens yields the zero vector; unparseable components default to 0.
pub fn parse_vector3(csv: &str) -> Vec3 {
    let parts: Vec<&str> = csv.split(',').collect();
    if parts.len() != 3 {
        tracing::warn!(input = csv, "Invalid vector3 format");
        return Vec3::ZERO;
    }
    Vec3::new(
        component(parts[0]),
        component(parts[1]),
        component(parts[2]),
    )
}

/// Parse a comma-separated `w,x,y,z` quaternion.
///
/// Reserved for a second wire format variant. Anything other than exactly
/// four tokens yields the identity; unparseable components default to 0.
pub fn parse_quaternion(csv: &str) -> Quat {
    let parts: Vec<&str> = csv.split(',').collect();
    if parts.len() != 4 {
        tracing::warn!(input = csv, "Invalid quaternion format");
        return Quat::IDENTITY;
    }
    // CSV order is scalar-first; storage order is (x, y, z, w).
    Quat::from_xyzw(
        component(parts[1]),
        component(parts[2]),
        component(parts[3]),
        component(parts[0]),
    )
}

fn component(token: &str) -> f32 {
    token.trim().parse().unwrap_or(0.0)
}
