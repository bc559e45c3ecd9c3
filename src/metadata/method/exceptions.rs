//! Exception handler records as they appear in the exception section of a method body.
//!
//! The serializer produces these records from closed exception regions and the method body
//! parser reads them back, so both directions share one representation.

use bitflags::bitflags;

use crate::metadata::token::Token;

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    ///
    /// These flags determine how the exception handler processes exceptions and
    /// control flow within try/catch/finally blocks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause.
        ///
        /// The last field of the record contains the metadata token of the exception type
        /// that this handler catches.
        const EXCEPTION = 0x0000;

        /// An exception filter and handler clause.
        ///
        /// The last field of the record contains the offset of the filter expression, which
        /// runs before the handler to decide whether the exception is handled.
        const FILTER = 0x0001;

        /// A finally clause.
        ///
        /// Runs whether or not an exception occurs.
        const FINALLY = 0x0002;

        /// A fault clause.
        ///
        /// Like finally, but only runs when an exception is thrown.
        const FAULT = 0x0004;
    }
}

/// One clause of the exception section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Flags describing the type of exception handler (catch, filter, finally, fault).
    pub flags: ExceptionHandlerFlags,
    /// Offset in bytes of try block from start of method body.
    pub try_offset: u32,
    /// Length in bytes of the try block.
    pub try_length: u32,
    /// Location of the handler for this try block.
    pub handler_offset: u32,
    /// Size of the handler code in bytes.
    pub handler_length: u32,
    /// Class token for typed clauses, filter offset for filter clauses, zero otherwise.
    pub filter_offset: u32,
}

impl ExceptionHandler {
    /// Returns the caught exception type of a typed clause.
    #[must_use]
    pub fn class_token(&self) -> Option<Token> {
        if self.flags.is_empty() && self.filter_offset != 0 {
            Some(Token::new(self.filter_offset))
        } else {
            None
        }
    }

    /// Returns true if every offset and length fits the compact record layout.
    #[must_use]
    pub fn fits_compact(&self) -> bool {
        self.try_offset <= 0xFFFF
            && self.try_length <= 0xFF
            && self.handler_offset <= 0xFFFF
            && self.handler_length <= 0xFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_token_only_for_typed_clauses() {
        let mut handler = ExceptionHandler {
            flags: ExceptionHandlerFlags::EXCEPTION,
            try_offset: 0,
            try_length: 4,
            handler_offset: 4,
            handler_length: 2,
            filter_offset: 0x0100_0003,
        };
        assert_eq!(handler.class_token(), Some(Token::new(0x0100_0003)));

        handler.flags = ExceptionHandlerFlags::FILTER;
        assert_eq!(handler.class_token(), None);
    }

    #[test]
    fn compact_limits() {
        let handler = ExceptionHandler {
            flags: ExceptionHandlerFlags::FINALLY,
            try_offset: 0xFFFF,
            try_length: 0xFF,
            handler_offset: 0xFFFF,
            handler_length: 0xFF,
            filter_offset: 0,
        };
        assert!(handler.fits_compact());

        let wide = ExceptionHandler {
            try_length: 0x100,
            ..handler
        };
        assert!(!wide.fits_compact());
    }
}
