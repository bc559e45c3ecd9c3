//! Parsing of serialized CIL method bodies.
//!
//! Decodes the tiny or fat method header and the exception handling sections that follow the
//! code (ECMA-335 II.25.4). The assembler uses this to read back what the serializer produced;
//! it is also useful for inspecting bodies produced elsewhere.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::metadata::method::MethodBody;
//!
//! // Tiny header for two bytes of code: ldc.i4.1, ret
//! let data = [(2 << 2) | 0x02, 0x17, 0x2A];
//! let body = MethodBody::from(&data)?;
//!
//! assert!(!body.is_fat);
//! assert_eq!(body.size_code, 2);
//! assert_eq!(body.code(&data)?, &[0x17, 0x2A]);
//! # Ok::<(), cilemit::Error>(())
//! ```
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Method Header Format

use crate::{
    metadata::method::{ExceptionHandler, ExceptionHandlerFlags, MethodBodyFlags, SectionFlags},
    utils::{read_le, read_le_at},
    Error::OutOfBounds,
    Result,
};

/// Describes one method that has been compiled to CIL bytecode.
///
/// Header information, code size, stack requirements, local variable signature and exception
/// handling regions of a serialized body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Size of the method (length of all instructions, not counting the header) in bytes
    pub size_code: usize,
    /// Size of the method header in bytes
    pub size_header: usize,
    /// `MetaData` token for a signature describing the layout of the local variables for the method. 0 == no local variables
    pub local_var_sig_token: u32,
    /// Maximum number of items on the operand stack
    pub max_stack: usize,
    /// Flag, indicating the type of the method header
    pub is_fat: bool,
    /// Flag, indicating to call default constructor on all local variables
    pub is_init_local: bool,
    /// Flag, indicating if this method does have exception handlers
    pub is_exception_data: bool,
    /// Flag, indicating that at least one exception section used the fat layout
    pub is_fat_exception_data: bool,
    /// A list of exception handlers this method has
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Create a `MethodBody` object from a sequence of bytes.
    ///
    /// # Arguments
    /// * `data` - The byte slice from which this object shall be created
    ///
    /// # Errors
    /// Returns an error if the data is empty, out of bounds, or malformed.
    pub fn from(data: &[u8]) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(malformed_error!("Provided data for body parsing is empty"));
        }

        let first_byte = read_le::<u8>(data)?;
        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_00000011_u8)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = (first_byte >> 2) as usize;
                if size_code + 1 > data.len() {
                    return Err(OutOfBounds);
                }

                Ok(MethodBody {
                    size_code,
                    size_header: 1,
                    local_var_sig_token: 0,
                    max_stack: 8,
                    is_fat: false,
                    is_init_local: false,
                    is_exception_data: false,
                    is_fat_exception_data: false,
                    exception_handlers: Vec::new(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                if data.len() < 12 {
                    return Err(OutOfBounds);
                }

                let first_duo = read_le::<u16>(data)?;

                let size_header = (first_duo >> 12) * 4;
                let size_code = read_le::<u32>(&data[4..])?;
                if data.len() < (size_code as usize + size_header as usize) {
                    return Err(OutOfBounds);
                }

                let local_var_sig_token = read_le::<u32>(&data[8..])?;
                let flags_header =
                    MethodBodyFlags::from_bits_truncate(first_duo & 0b_0000111111111111_u16);
                let max_stack = read_le::<u16>(&data[2..])? as usize;

                let is_init_local = flags_header.contains(MethodBodyFlags::INIT_LOCALS);

                // Exception Handling -> II.25.4.6
                // The extra sections currently can only contain exception handling data
                let mut exception_handlers = Vec::new();
                let mut is_fat_exception_data = false;
                if flags_header.contains(MethodBodyFlags::MORE_SECTS) {
                    // Sections start at the next 4-byte boundary after the code
                    let mut cursor = size_header as usize + size_code as usize;
                    cursor = (cursor + 3) & !3;

                    while data.len() > (cursor + 4) {
                        let section_flags =
                            SectionFlags::from_bits_truncate(read_le::<u8>(&data[cursor..])?);
                        if !section_flags.contains(SectionFlags::EHTABLE) {
                            break;
                        }

                        if section_flags.contains(SectionFlags::FAT_FORMAT) {
                            is_fat_exception_data = true;

                            let section_size = read_le::<u32>(&data[cursor..])? >> 8;
                            if section_size < 4 || data.len() < (cursor + section_size as usize) {
                                return Err(OutOfBounds);
                            }

                            cursor += 4;
                            for _ in 0..(section_size - 4) / 24 {
                                let flags = read_le_at::<u32>(data, &mut cursor)?;
                                exception_handlers.push(ExceptionHandler {
                                    // Flags only use the low bits of the widened field
                                    #[allow(clippy::cast_possible_truncation)]
                                    flags: ExceptionHandlerFlags::from_bits_truncate(flags as u16),
                                    try_offset: read_le_at::<u32>(data, &mut cursor)?,
                                    try_length: read_le_at::<u32>(data, &mut cursor)?,
                                    handler_offset: read_le_at::<u32>(data, &mut cursor)?,
                                    handler_length: read_le_at::<u32>(data, &mut cursor)?,
                                    filter_offset: read_le_at::<u32>(data, &mut cursor)?,
                                });
                            }
                        } else {
                            let section_size = u32::from(read_le::<u8>(&data[cursor + 1..])?);
                            if section_size < 4 || data.len() < (cursor + section_size as usize) {
                                return Err(OutOfBounds);
                            }

                            cursor += 4;
                            for _ in 0..(section_size - 4) / 12 {
                                exception_handlers.push(ExceptionHandler {
                                    flags: ExceptionHandlerFlags::from_bits_truncate(
                                        read_le_at::<u16>(data, &mut cursor)?,
                                    ),
                                    try_offset: u32::from(read_le_at::<u16>(data, &mut cursor)?),
                                    try_length: u32::from(read_le_at::<u8>(data, &mut cursor)?),
                                    handler_offset: u32::from(read_le_at::<u16>(
                                        data,
                                        &mut cursor,
                                    )?),
                                    handler_length: u32::from(read_le_at::<u8>(data, &mut cursor)?),
                                    filter_offset: read_le_at::<u32>(data, &mut cursor)?,
                                });
                            }
                        }

                        if !section_flags.contains(SectionFlags::MORE_SECTS) {
                            break;
                        }
                    }
                }

                Ok(MethodBody {
                    size_code: size_code as usize,
                    size_header: size_header as usize,
                    local_var_sig_token,
                    max_stack,
                    is_fat: true,
                    is_init_local,
                    is_exception_data: !exception_handlers.is_empty(),
                    is_fat_exception_data,
                    exception_handlers,
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Get the full size of this method
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_code + self.size_header
    }

    /// Returns the code bytes of this body within `data`, the buffer it was parsed from.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the body.
    pub fn code<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.size_header..self.size()).ok_or(OutOfBounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny() -> Result<()> {
        let data = [(3 << 2) | 0x02, 0x00, 0x00, 0x2A];
        let body = MethodBody::from(&data)?;

        assert!(!body.is_fat);
        assert!(!body.is_exception_data);
        assert!(!body.is_init_local);
        assert_eq!(body.max_stack, 8);
        assert_eq!(body.size_code, 3);
        assert_eq!(body.size_header, 1);
        assert_eq!(body.size(), 4);
        assert_eq!(body.local_var_sig_token, 0);
        assert_eq!(body.code(&data)?, &[0x00, 0x00, 0x2A]);

        Ok(())
    }

    #[test]
    fn tiny_truncated() {
        let data = [(3 << 2) | 0x02, 0x00];
        assert!(MethodBody::from(&data).is_err());
    }

    #[test]
    fn fat() -> Result<()> {
        let data = [
            0x13, 0x30, 0x05, 0x00, 0x02, 0x00, 0x00, 0x00, 0x59, 0x00, 0x00, 0x11, 0x00, 0x2A,
        ];
        let body = MethodBody::from(&data)?;

        assert!(body.is_fat);
        assert!(!body.is_exception_data);
        assert!(body.is_init_local);
        assert_eq!(body.max_stack, 5);
        assert_eq!(body.size_code, 2);
        assert_eq!(body.size_header, 12);
        assert_eq!(body.size(), 14);
        assert_eq!(body.local_var_sig_token, 0x1100_0059);

        Ok(())
    }

    #[test]
    fn fat_compact_exceptions() -> Result<()> {
        let mut data = vec![
            0x1B, 0x30, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        // try { nop; leave.s } finally { nop; endfinally } ret
        data.extend_from_slice(&[0x00, 0xDE, 0x03, 0x00, 0xDC, 0x2A, 0x00, 0x00]);
        data.extend_from_slice(&[0x01, 0x10, 0x00, 0x00]);
        data.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x02, 0, 0, 0, 0]);

        let body = MethodBody::from(&data)?;
        assert!(body.is_exception_data);
        assert!(!body.is_fat_exception_data);
        assert_eq!(body.exception_handlers.len(), 1);

        let handler = &body.exception_handlers[0];
        assert!(handler.flags.contains(ExceptionHandlerFlags::FINALLY));
        assert_eq!(handler.try_offset, 0);
        assert_eq!(handler.try_length, 3);
        assert_eq!(handler.handler_offset, 3);
        assert_eq!(handler.handler_length, 2);
        assert_eq!(handler.filter_offset, 0);

        Ok(())
    }

    #[test]
    fn fat_wide_exceptions() -> Result<()> {
        let mut data = vec![
            0x0B, 0x30, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x2A]);
        data.extend_from_slice(&[0x41, 0x1C, 0x00, 0x00]);
        for value in [0_u32, 0, 1, 1, 2, 0x0100_0003] {
            data.extend_from_slice(&value.to_le_bytes());
        }

        let body = MethodBody::from(&data)?;
        assert!(body.is_fat_exception_data);
        assert!(!body.is_init_local);
        assert_eq!(body.exception_handlers.len(), 1);
        assert_eq!(body.exception_handlers[0].handler_length, 2);
        assert_eq!(
            body.exception_handlers[0].class_token().map(|t| t.value()),
            Some(0x0100_0003)
        );

        Ok(())
    }

    #[test]
    fn invalid_format() {
        assert!(MethodBody::from(&[]).is_err());
        assert!(MethodBody::from(&[0x01, 0x00]).is_err());
    }
}
