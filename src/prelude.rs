//! # cilemit Prelude
//!
//! The most commonly used types for building method bodies. Import with
//! `use cilemit::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilemit operations
pub use crate::Error;

/// The result type used throughout cilemit
pub use crate::Result;

// ================================================================================================
// Method Body Construction
// ================================================================================================

/// Builder, configuration and serialized output
pub use crate::builder::{
    AssemblerConfig, ClauseKind, LocalBuilder, MethodBodyBuilder, SerializedMethodBody,
    StackPolicy,
};

// ================================================================================================
// Instructions
// ================================================================================================

/// The opcode catalogue
pub use crate::assembly::opcodes;

/// Instruction descriptors, labels and calling conventions
pub use crate::assembly::{Label, OpCode, OperandType, UnmanagedCallingConvention};

// ================================================================================================
// Metadata
// ================================================================================================

/// Tokens and table ids
pub use crate::metadata::token::{Token, TABLE};

/// The metadata store collaborator
pub use crate::metadata::store::{InMemoryMetadataStore, ItemHandle, MetadataStore, MethodRef};

/// Signature types
pub use crate::metadata::signatures::{SignatureMethod, SignatureParameter, TypeSignature};

/// Parser for serialized method bodies
pub use crate::metadata::method::{ExceptionHandler, ExceptionHandlerFlags, MethodBody};
