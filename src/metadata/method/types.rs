//! Method body header and section flags (ECMA-335 II.25.4).
//!
//! # Key Types
//! - [`MethodBodyFlags`]: flags of the tiny and fat method headers
//! - [`SectionFlags`]: flags of the extra data sections following the code

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags that a method body can have
    pub struct MethodBodyFlags: u16 {
        /// Tiny method header format
        const TINY_FORMAT = 0x2;
        /// Fat method header format
        const FAT_FORMAT = 0x3;
        /// Flag of the fat method header, showing that there are more data sections appended to the header
        const MORE_SECTS = 0x8;
        /// Flag to indicate that this method should call the default constructor on all local variables
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags that a method body section can have
    pub struct SectionFlags: u8 {
        /// Indicates that this section contains exception handling data
        const EHTABLE = 0x1;
        /// Reserved, shall be 0
        const OPT_ILTABLE = 0x2;
        /// Indicates that the data section format is fat
        const FAT_FORMAT = 0x40;
        /// Indicates that the data section is followed by another one
        const MORE_SECTS = 0x80;
    }
}

/// Size of the fat header in 4-byte units, stored in the high nibble of its second byte.
pub const FAT_HEADER_SIZE_DWORDS: u16 = 3;

/// Largest code size a tiny header can describe (exclusive bound).
pub const TINY_CODE_SIZE_LIMIT: usize = 0x40;

/// Largest `max_stack` a tiny header implies.
pub const TINY_MAX_STACK: u32 = 2;
