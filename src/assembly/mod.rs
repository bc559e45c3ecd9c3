//! CIL instruction emission.
//!
//! This module holds everything needed to turn a sequence of instruction requests into the raw
//! code bytes of a method body:
//!
//! - [`opcodes`] - the ECMA-335 opcode catalogue with stack behaviour and operand kinds
//! - [`InstructionEncoder`] - single-pass emission with stack tracking and operand validation
//! - [`LabelTable`] - forward and backward branch targets with backpatching
//! - [`TokenFixups`] - offsets of provisional metadata tokens in the code
//! - [`CodeBuffer`] - the growable code byte buffer
//!
//! Most users go through [`crate::builder::MethodBodyBuilder`], which adds locals, exception
//! regions and serialization on top of the encoder.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::assembly::{opcodes, OpCode};
//!
//! assert_eq!(OpCode::from_mnemonic("ldc.i4.s"), Some(opcodes::LDC_I4_S));
//! assert_eq!(opcodes::BR.short_form(), Some(opcodes::BR_S));
//! ```

mod buffer;
mod encoder;
mod fixups;
mod instruction;
mod labels;
pub mod opcodes;
mod stack;

pub use buffer::{CodeBuffer, MIN_CODE_CAPACITY};
pub use encoder::{InstructionEncoder, UnmanagedCallingConvention};
pub use fixups::{TokenFixup, TokenFixups};
pub use instruction::{FlowType, OperandType, StackPop, StackPush};
pub use labels::{BranchRef, Label, LabelTable};
pub use opcodes::OpCode;
pub use stack::StackDepth;
