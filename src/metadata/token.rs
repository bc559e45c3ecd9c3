use std::fmt;
use std::hash::{Hash, Hasher};

/// Table identifiers that appear in the high byte of tokens embedded in method bodies.
#[allow(missing_docs)]
#[allow(non_snake_case)]
pub mod TABLE {
    pub const TYPE_REF: u8 = 0x01;
    pub const TYPE_DEF: u8 = 0x02;
    pub const FIELD: u8 = 0x04;
    pub const METHOD_DEF: u8 = 0x06;
    pub const MEMBER_REF: u8 = 0x0A;
    pub const STAND_ALONE_SIG: u8 = 0x11;
    pub const TYPE_SPEC: u8 = 0x1B;
    pub const METHOD_SPEC: u8 = 0x2B;
    pub const USER_STRING: u8 = 0x70;
}

/// A metadata token representing a reference to a metadata table entry.
///
/// Tokens in .NET metadata consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the table type
/// - The low 24 bits (bits 0-23) indicate the row index within that table
///
/// User string tokens (table `0x70`) carry a heap offset instead of a row index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table identifier and a row (or heap offset)
    ///
    /// The row is truncated to 24 bits.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parts() {
        let token = Token::new(0x0600_0001);
        assert_eq!(token.value(), 0x0600_0001);
        assert_eq!(token.table(), TABLE::METHOD_DEF);
        assert_eq!(token.row(), 1);

        let token = Token(0x06FF_FFFF);
        assert_eq!(token.row(), 0x00FF_FFFF);
    }

    #[test]
    fn test_token_from_parts() {
        let token = Token::from_parts(TABLE::STAND_ALONE_SIG, 3);
        assert_eq!(token.value(), 0x1100_0003);

        let token = Token::from_parts(TABLE::USER_STRING, 0x0100_0001);
        assert_eq!(token.value(), 0x7000_0001);
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token(0).is_null());
        assert!(Token::default().is_null());
        assert!(!Token(0x0600_0001).is_null());
    }

    #[test]
    fn test_token_conversion() {
        let token: Token = 0x0A00_0010_u32.into();
        let back: u32 = token.into();
        assert_eq!(back, 0x0A00_0010);
    }

    #[test]
    fn test_token_formatting() {
        let token = Token(0x0600_0001);
        assert_eq!(format!("{}", token), "0x06000001");

        let debug_str = format!("{:?}", token);
        assert!(debug_str.contains("Token(0x06000001"));
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }
}
