//! Fixed-point conversions for the sensor wire format.
//!
//! Every physical quantity travels as a 16-bit little-endian integer with a
//! fixed scale: angles use 359.9/65536 degrees per step, field strength uses
//! 750/65536 micro-tesla per step.

use crate::constants::{ANGLE_SCALE, FIELD_SCALE};

pub fn decode_angle(bytes: [u8; 2], signed: bool) -> f64 {
    let raw = if signed {
        i16::from_le_bytes(bytes) as f64
    } else {
        u16::from_le_bytes(bytes) as f64
    };

    raw * ANGLE_SCALE
}

pub fn decode_field(bytes: [u8; 2]) -> f64 {
    i16::from_le_bytes(bytes) as f64 * FIELD_SCALE
}

/// Nearest wire value for `degrees`. Out of range angles saturate.
pub fn encode_angle(degrees: f64, signed: bool) -> [u8; 2] {
    let raw = (degrees / ANGLE_SCALE).round();

    // float to int casts saturate
    if signed {
        (raw as i16).to_le_bytes()
    } else {
        (raw as u16).to_le_bytes()
    }
}

/// Nearest wire value for `micro_tesla`. Out of range values saturate.
pub fn encode_field(micro_tesla: f64) -> [u8; 2] {
    ((micro_tesla / FIELD_SCALE).round() as i16).to_le_bytes()
}
