//! Shared low-level helpers.

pub mod io;

pub use io::{push_le, read_le, read_le_at, write_le_at, CilIO};

use crate::Result;

/// Appends `value` as an ECMA-335 compressed unsigned integer (II.23.2).
///
/// - `0x00..=0x7F` is written as one byte
/// - `0x80..=0x3FFF` is written as two bytes with the high bits `10`
/// - `0x4000..=0x1FFF_FFFF` is written as four bytes with the high bits `110`
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for values above `0x1FFF_FFFF`, which have no
/// compressed representation.
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    match value {
        0..=0x7F => buffer.push(value as u8),
        0x80..=0x3FFF => {
            buffer.push(((value >> 8) as u8) | 0x80);
            buffer.push(value as u8);
        }
        0x4000..=0x1FFF_FFFF => {
            buffer.push(((value >> 24) as u8) | 0xC0);
            buffer.push((value >> 16) as u8);
            buffer.push((value >> 8) as u8);
            buffer.push(value as u8);
        }
        _ => {
            return Err(malformed_error!(
                "Value 0x{:08X} cannot be stored as a compressed integer",
                value
            ))
        }
    }

    Ok(())
}

/// Appends `value` as an ECMA-335 compressed signed integer (II.23.2).
///
/// The value is rotated so the sign bit becomes the least significant bit, then stored in one,
/// two or four bytes like [`write_compressed_uint`].
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for values outside the 29-bit signed range.
pub fn write_compressed_int(value: i32, buffer: &mut Vec<u8>) -> Result<()> {
    const B6: i32 = (1 << 6) - 1;
    const B13: i32 = (1 << 13) - 1;
    const B28: i32 = (1 << 28) - 1;

    let sign_mask = value >> 31;
    if (value & !B6) == (sign_mask & !B6) {
        let rotated = ((value & B6) << 1) | (sign_mask & 1);
        buffer.push(rotated as u8);
    } else if (value & !B13) == (sign_mask & !B13) {
        let rotated = (((value & B13) << 1) | (sign_mask & 1)) as u32 | 0x8000;
        buffer.extend_from_slice(&(rotated as u16).to_be_bytes());
    } else if (value & !B28) == (sign_mask & !B28) {
        let rotated = (((value & B28) << 1) | (sign_mask & 1)) as u32 | 0xC000_0000;
        buffer.extend_from_slice(&rotated.to_be_bytes());
    } else {
        return Err(malformed_error!(
            "Value {} cannot be stored as a compressed signed integer",
            value
        ));
    }

    Ok(())
}

/// Converts a length or count to `u32`.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] when the value exceeds `u32::MAX`.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| malformed_error!("Value {} exceeds u32 range", value))
}
