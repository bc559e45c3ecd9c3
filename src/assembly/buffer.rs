//! The growable code buffer a method body is assembled into.

use crate::{
    utils::{push_le, to_u32, write_le_at, CilIO},
    Result,
};

/// Smallest capacity a [`CodeBuffer`] starts with.
pub const MIN_CODE_CAPACITY: usize = 16;

/// Append-only byte buffer holding the code of one method body.
///
/// The write position is always the end of the buffer, so [`CodeBuffer::offset`] is the logical
/// code length. Capacity doubles whenever an append does not fit. Bytes are only ever
/// overwritten in place by backpatching.
///
/// # Examples
///
/// ```rust
/// use cilemit::assembly::CodeBuffer;
///
/// let mut buffer = CodeBuffer::new(4);
/// assert!(buffer.capacity() >= 16);
///
/// buffer.write_u8(0x2A);
/// assert_eq!(buffer.offset()?, 1);
/// assert_eq!(buffer.as_slice(), &[0x2A]);
/// # Ok::<(), cilemit::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    data: Vec<u8>,
}

impl CodeBuffer {
    /// Creates an empty buffer with room for at least `capacity_hint` bytes.
    #[must_use]
    pub fn new(capacity_hint: usize) -> Self {
        CodeBuffer {
            data: Vec::with_capacity(capacity_hint.max(MIN_CODE_CAPACITY)),
        }
    }

    /// Current write offset, which equals the code length.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] once the code outgrows the 32-bit offset space.
    pub fn offset(&self) -> Result<u32> {
        to_u32(self.data.len())
    }

    /// Number of bytes written
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing has been written yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes currently reserved
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Appends a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.grow_for(1);
        self.data.push(value);
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.grow_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    pub(crate) fn write_le<T: CilIO>(&mut self, value: T) {
        self.grow_for(std::mem::size_of::<T>());
        push_le(&mut self.data, value);
    }

    /// Overwrites four bytes at `offset` with `value` (little-endian).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the four bytes are not all written yet.
    pub fn patch_i32(&mut self, offset: u32, value: i32) -> Result<()> {
        let mut cursor = offset as usize;
        write_le_at(&mut self.data, &mut cursor, value)
    }

    /// The bytes written so far
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn opcode_sink(&mut self, additional: usize) -> &mut Vec<u8> {
        self.grow_for(additional);
        &mut self.data
    }

    fn grow_for(&mut self, additional: usize) {
        let required = self.data.len() + additional;
        if required > self.data.capacity() {
            let target = (self.data.capacity() * 2).max(required);
            self.data.reserve_exact(target - self.data.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_floor_and_doubling() {
        let mut buffer = CodeBuffer::new(0);
        let initial = buffer.capacity();
        assert!(initial >= MIN_CODE_CAPACITY);

        buffer.write_bytes(&vec![0u8; initial]);
        buffer.write_u8(1);
        assert!(buffer.capacity() >= initial * 2);
        assert_eq!(buffer.len(), initial + 1);
    }

    #[test]
    fn patch_in_place() -> Result<()> {
        let mut buffer = CodeBuffer::new(16);
        buffer.write_u8(0x38);
        buffer.write_le(0_i32);
        buffer.patch_i32(1, -5)?;
        assert_eq!(buffer.as_slice(), &[0x38, 0xFB, 0xFF, 0xFF, 0xFF]);

        assert!(buffer.patch_i32(2, 0).is_err());
        Ok(())
    }
}
