//! Signature types and the signature blob encoder.
//!
//! Signatures describe the shape of methods, fields, properties and local variable lists in the
//! binary form stored in the `#Blob` heap (ECMA-335 II.23.2). The assembler encodes local
//! variable lists for the fat method header and stand-alone call-site signatures for `calli`
//! and vararg calls; the resulting blobs are interned by the
//! [`crate::metadata::store::MetadataStore`], which hands back the token to embed.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::metadata::signatures::{
//!     encode_local_var_signature, SignatureLocalVariable, SignatureLocalVariables, TypeSignature,
//! };
//!
//! let locals = SignatureLocalVariables {
//!     locals: vec![SignatureLocalVariable {
//!         base: TypeSignature::I4,
//!         ..Default::default()
//!     }],
//! };
//! assert_eq!(encode_local_var_signature(&locals)?, vec![0x07, 0x01, 0x08]);
//! # Ok::<(), cilemit::Error>(())
//! ```

mod encoders;
mod types;

pub use encoders::*;
pub use types::*;
