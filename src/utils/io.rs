//! Little-endian primitive I/O shared by the code buffer, the serializer and the method body
//! parser.
//!
//! All multi-byte values in a CIL method body are stored little-endian (ECMA-335 II.25.4).
//! [`CilIO`] abstracts over the primitive types that appear in instruction operands and
//! section headers so that readers and writers can be generic over the value width.

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive types that can be converted to and from little-endian byte arrays.
///
/// Implemented for the integer and floating-point widths used by CIL operands.
///
/// # Thread Safety
///
/// All implementations are pure conversions without shared state.
pub trait CilIO: Sized + Copy {
    /// Fixed-size byte array holding the encoded value.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte array in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte array in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the
/// offset by the number of bytes read.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(OutOfBounds);
    };

    *offset += type_len;

    Ok(T::from_le_bytes(read))
}

/// Safely writes `value` in little-endian byte order at `offset`, advancing the offset by the
/// number of bytes written.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into the buffer.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..*offset + type_len].copy_from_slice(value.to_le_bytes().as_ref());
    *offset += type_len;

    Ok(())
}

/// Appends `value` in little-endian byte order to a growable buffer.
pub fn push_le<T: CilIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_le_values() -> Result<()> {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF];

        assert_eq!(read_le::<u8>(&data)?, 0x01);
        assert_eq!(read_le::<u16>(&data)?, 0x0201);
        assert_eq!(read_le::<u32>(&data)?, 0x0403_0201);

        let mut offset = 4;
        assert_eq!(read_le_at::<i8>(&data, &mut offset)?, -1);
        assert_eq!(offset, 5);

        Ok(())
    }

    #[test]
    fn read_le_out_of_bounds() {
        let data = [0x01, 0x02];
        assert!(matches!(read_le::<u32>(&data), Err(OutOfBounds)));

        let mut offset = 2;
        assert!(matches!(read_le_at::<u8>(&data, &mut offset), Err(OutOfBounds)));
        assert_eq!(offset, 2);
    }

    #[test]
    fn write_le_values() -> Result<()> {
        let mut data = [0u8; 6];
        let mut offset = 0;

        write_le_at(&mut data, &mut offset, 0x1234_u16)?;
        write_le_at(&mut data, &mut offset, -2_i32)?;
        assert_eq!(data, [0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert!(write_le_at(&mut data, &mut offset, 1_u8).is_err());

        Ok(())
    }

    #[test]
    fn push_le_floats() {
        let mut buffer = Vec::new();
        push_le(&mut buffer, 1.0_f32);
        push_le(&mut buffer, 0x0102_u16);
        assert_eq!(buffer, vec![0x00, 0x00, 0x80, 0x3F, 0x02, 0x01]);
    }
}
