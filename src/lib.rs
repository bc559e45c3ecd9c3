// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # cilemit
//!
//! A single-pass assembler for CIL (Common Intermediate Language) method bodies. `cilemit` builds
//! the binary body of one method instruction by instruction, tracks the evaluation stack depth,
//! resolves forward and backward branches through a backpatch protocol, manages nested
//! `try`/`catch`/`filter`/`finally`/`fault` regions, and serializes everything into the exact
//! ECMA-335 method body layout (tiny or fat header, compact or wide exception table).
//!
//! Tokens for externally defined items (types, methods, fields) are obtained from a
//! [`metadata::store::MetadataStore`] that is passed explicitly into every operation that needs
//! one. Tokens that are not yet final are recorded in fixup ledgers and handed back to the store
//! once the body is finalized.
//!
//! ## Quick Start
//!
//! ```rust
//! use cilemit::prelude::*;
//!
//! let store = InMemoryMetadataStore::new();
//! let mut body = MethodBodyBuilder::new(64);
//!
//! body.emit_ldc_i4(1)?;
//! body.emit_ldc_i4(2)?;
//! body.emit(opcodes::ADD)?;
//! body.emit(opcodes::RET)?;
//!
//! let serialized = body.serialize(&store)?;
//! assert_eq!(serialized.max_stack, 2);
//! assert_eq!(serialized.header, vec![(4 << 2) | 0x02]);
//! # Ok::<(), cilemit::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - the opcode catalogue, the code buffer, stack tracking, labels, token fixups
//!   and the [`assembly::InstructionEncoder`]
//! - [`builder`] - the [`builder::MethodBodyBuilder`] with locals and exception regions, its
//!   configuration and the method body serializer
//! - [`metadata`] - tokens, the metadata store collaborator, the signature encoder and method
//!   body format types including a parser for serialized bodies
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Thread Safety
//!
//! A [`builder::MethodBodyBuilder`] is owned by a single caller. Many builders may run in
//! parallel against one shared store; the store is `Send + Sync` and synchronizes internally.

#[macro_use]
pub(crate) mod error;

pub(crate) mod utils;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Opcode catalogue and the low-level instruction emitter.
///
/// Everything needed to append instructions to a code buffer lives here: the static
/// [`assembly::opcodes`] table, operand and stack behaviour classes, the growable
/// [`assembly::CodeBuffer`], stack depth tracking, the label table with its backpatch
/// protocol and the token fixup ledger.
pub mod assembly;

/// Method body construction and serialization.
///
/// The [`builder::MethodBodyBuilder`] wraps an [`assembly::InstructionEncoder`] with local
/// declarations and the exception region state machine, and produces a
/// [`builder::SerializedMethodBody`].
pub mod builder;

/// Metadata collaborators and binary formats.
///
/// Contains [`metadata::token::Token`], the [`metadata::store::MetadataStore`] trait with an
/// in-memory implementation, the signature encoder and the method body format types.
pub mod metadata;

/// `cilemit` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use cilemit::{Result, assembly::CodeBuffer};
///
/// fn emit_nop(buffer: &mut CodeBuffer) -> Result<()> {
///     buffer.write_u8(0x00);
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `cilemit` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the
/// individual categories.
pub use error::Error;
