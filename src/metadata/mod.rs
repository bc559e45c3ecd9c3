//! # Key Components
//!
//! - [`token`] - metadata table row references embedded in CIL operands
//! - [`store`] - the [`store::MetadataStore`] collaborator that hands out and finalizes tokens
//! - [`signatures`] - signature types and the blob encoder
//! - [`method`] - method body header and exception section formats

/// Method body format types and the serialized body parser
pub mod method;
/// Signature types and encoding
pub mod signatures;
/// The metadata store interface and an in-memory implementation
pub mod store;
/// Metadata tokens
pub mod token;
