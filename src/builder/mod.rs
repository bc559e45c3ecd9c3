//! Method body construction.
//!
//! [`MethodBodyBuilder`] is the entry point: it emits instructions through the
//! [`crate::assembly::InstructionEncoder`], declares locals, manages structured exception
//! regions and serializes the finished body into a [`SerializedMethodBody`].
//!
//! # Key Types
//! - [`MethodBodyBuilder`] - builds one method body
//! - [`AssemblerConfig`] / [`StackPolicy`] - builder configuration
//! - [`LocalBuilder`] - a declared local variable
//! - [`ExceptionRegion`] / [`ExceptionClause`] / [`ClauseKind`] - closed exception regions
//! - [`SerializedMethodBody`] - header, code, exception section and token fixups

mod config;
mod locals;
mod method_body;
mod regions;
mod serializer;

pub use config::{AssemblerConfig, StackPolicy};
pub use locals::LocalBuilder;
pub use method_body::MethodBodyBuilder;
pub use regions::{ClauseKind, ExceptionClause, ExceptionRegion};
pub use serializer::SerializedMethodBody;
