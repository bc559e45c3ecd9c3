//! Method body format types.
//!
//! The binary layout the serializer writes and the [`MethodBody`] parser reads back: header
//! flags, section flags and exception handler records (ECMA-335 II.25.4).
//!
//! # Key Components
//!
//! - [`MethodBody`] - parsed header and exception table of a serialized body
//! - [`ExceptionHandler`] / [`ExceptionHandlerFlags`] - one exception clause record
//! - [`MethodBodyFlags`] / [`SectionFlags`] - header and data section flags

mod body;
mod exceptions;
mod types;

pub use body::MethodBody;
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};
pub use types::*;
