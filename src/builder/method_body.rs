//! The method body builder.
//!
//! [`MethodBodyBuilder`] ties the instruction encoder, the local variable table and the
//! exception region arena of one method together and serializes the result. Every operation
//! that embeds a metadata token takes the shared [`MetadataStore`] explicitly.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::prelude::*;
//!
//! let store = InMemoryMetadataStore::new();
//! let exception = store.declare(TABLE::TYPE_REF);
//!
//! let mut body = MethodBodyBuilder::new(32);
//! let result = body.declare_local(TypeSignature::I4)?;
//!
//! body.begin_exception_block()?;
//! body.emit_ldc_i4(10)?;
//! body.emit_local(opcodes::STLOC, &result)?;
//! body.begin_catch(Some(exception))?;
//! body.emit(opcodes::POP)?;
//! body.end_exception_block()?;
//! body.emit_local(opcodes::LDLOC, &result)?;
//! body.emit(opcodes::RET)?;
//!
//! let mut serialized = body.serialize(&store)?;
//! assert!(!serialized.is_tiny());
//! assert_eq!(serialized.exception_fixups.len(), 1);
//!
//! store.seal();
//! serialized.finalize(&store)?;
//! assert!(!serialized.has_pending_fixups());
//! # Ok::<(), cilemit::Error>(())
//! ```

use crate::{
    assembly::{opcodes, InstructionEncoder, Label, OpCode, UnmanagedCallingConvention},
    builder::{
        locals::{LocalBuilder, LocalTable},
        regions::{ClauseKind, ExceptionRegion, ExceptionRegions},
        serializer::{serialize_body, SerializedMethodBody},
        AssemblerConfig,
    },
    metadata::{
        signatures::{SignatureMethod, TypeSignature},
        store::{ItemHandle, MetadataStore, MethodRef},
    },
    Result,
};

/// Builds the body of one method.
///
/// Owned by a single caller for the whole build. Bodies of different methods may be built on
/// different threads against the same store.
#[derive(Debug, Clone)]
pub struct MethodBodyBuilder {
    config: AssemblerConfig,
    encoder: InstructionEncoder,
    locals: LocalTable,
    regions: ExceptionRegions,
}

impl MethodBodyBuilder {
    /// Starts a method body with the default configuration and a code size hint.
    #[must_use]
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_config(AssemblerConfig::with_capacity(initial_capacity))
    }

    /// Starts a method body with the given configuration.
    #[must_use]
    pub fn with_config(config: AssemblerConfig) -> Self {
        MethodBodyBuilder {
            config,
            encoder: InstructionEncoder::new(config.initial_capacity, config.stack_policy),
            locals: LocalTable::new(),
            regions: ExceptionRegions::new(),
        }
    }

    /// The configuration of this builder
    #[must_use]
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// The underlying instruction encoder
    #[must_use]
    pub fn encoder(&self) -> &InstructionEncoder {
        &self.encoder
    }

    /// Current code offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] once the code exceeds the 32-bit offset space.
    pub fn offset(&self) -> Result<u32> {
        self.encoder.offset()
    }

    /// The code emitted so far
    #[must_use]
    pub fn code(&self) -> &[u8] {
        self.encoder.code()
    }

    /// Stack depth at the current position
    #[must_use]
    pub fn current_stack(&self) -> u32 {
        self.encoder.current_stack()
    }

    /// Deepest stack depth reached so far
    #[must_use]
    pub fn max_stack(&self) -> u32 {
        self.encoder.max_stack()
    }

    // ============================================================================================
    // Instructions
    // ============================================================================================

    /// Emits an instruction without operand. See [`InstructionEncoder::emit`].
    ///
    /// # Errors
    /// Returns an operand error if `op` needs an operand.
    pub fn emit(&mut self, op: OpCode) -> Result<()> {
        self.encoder.emit(op)
    }

    /// Emits an instruction with an integer immediate. See [`InstructionEncoder::emit_int`].
    ///
    /// # Errors
    /// Returns [`crate::Error::ImmediateOutOfRange`] if `value` does not fit.
    pub fn emit_int(&mut self, op: OpCode, value: i64) -> Result<()> {
        self.encoder.emit_int(op, value)
    }

    /// Emits `ldc.r4`.
    ///
    /// # Errors
    /// Returns an operand error if `op` does not take a `float32`.
    pub fn emit_f32(&mut self, op: OpCode, value: f32) -> Result<()> {
        self.encoder.emit_f32(op, value)
    }

    /// Emits `ldc.r8`.
    ///
    /// # Errors
    /// Returns an operand error if `op` does not take a `float64`.
    pub fn emit_f64(&mut self, op: OpCode, value: f64) -> Result<()> {
        self.encoder.emit_f64(op, value)
    }

    /// Loads an `int32` constant with the shortest encoding.
    ///
    /// # Errors
    /// Returns [`crate::Error::StackUnderflow`] never in practice.
    pub fn emit_ldc_i4(&mut self, value: i32) -> Result<()> {
        self.encoder.emit_ldc_i4(value)
    }

    /// Emits an argument access narrowed to the shortest form.
    ///
    /// # Errors
    /// See [`InstructionEncoder::emit_argument`].
    pub fn emit_argument(&mut self, op: OpCode, index: u32) -> Result<()> {
        self.encoder.emit_argument(op, index)
    }

    /// Emits a local access by raw index, narrowed to the shortest form.
    ///
    /// # Errors
    /// See [`InstructionEncoder::emit_local_index`].
    pub fn emit_local_index(&mut self, op: OpCode, index: u32) -> Result<()> {
        self.encoder.emit_local_index(op, index)
    }

    // ============================================================================================
    // Labels
    // ============================================================================================

    /// Allocates a new branch target.
    pub fn define_label(&mut self) -> Label {
        self.encoder.define_label()
    }

    /// Marks `label` at the current offset and patches branches waiting for it.
    ///
    /// # Errors
    /// Returns [`crate::Error::LabelAlreadyMarked`] when called twice for one label.
    pub fn mark_label(&mut self, label: Label) -> Result<()> {
        self.encoder.mark_label(label)
    }

    /// Emits a branch to `label`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidBranch`] if `op` is not a branch.
    pub fn emit_branch(&mut self, op: OpCode, label: Label) -> Result<()> {
        self.encoder.emit_branch(op, label)
    }

    /// Emits a `switch` over `labels`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidBranch`] for an empty table.
    pub fn emit_switch(&mut self, labels: &[Label]) -> Result<()> {
        self.encoder.emit_switch(labels)
    }

    // ============================================================================================
    // Metadata operands
    // ============================================================================================

    /// Emits `ldstr`.
    ///
    /// # Errors
    /// Returns the store's error.
    pub fn emit_string(&mut self, store: &dyn MetadataStore, value: &str) -> Result<()> {
        self.encoder.emit_string(store, value)
    }

    /// Emits a field instruction.
    ///
    /// # Errors
    /// Returns an operand error or [`crate::Error::UnresolvedToken`].
    pub fn emit_field(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        field: ItemHandle,
    ) -> Result<()> {
        self.encoder.emit_field(store, op, field)
    }

    /// Emits a type instruction.
    ///
    /// # Errors
    /// Returns an operand error or [`crate::Error::UnresolvedToken`].
    pub fn emit_type(&mut self, store: &dyn MetadataStore, op: OpCode, ty: ItemHandle) -> Result<()> {
        self.encoder.emit_type(store, op, ty)
    }

    /// Emits `ldtoken`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] for an unknown handle.
    pub fn emit_token(&mut self, store: &dyn MetadataStore, item: ItemHandle) -> Result<()> {
        self.encoder.emit_token(store, item)
    }

    /// Emits a call-family instruction with the stack effect of the callee signature.
    ///
    /// # Errors
    /// Returns an operand error or [`crate::Error::UnresolvedToken`].
    pub fn emit_method(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        method: &MethodRef,
    ) -> Result<()> {
        self.encoder.emit_method(store, op, method)
    }

    /// Emits a vararg call passing `optional` extra arguments.
    ///
    /// # Errors
    /// See [`InstructionEncoder::emit_call_varargs`].
    pub fn emit_call_varargs(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        method: &MethodRef,
        optional: &[TypeSignature],
    ) -> Result<()> {
        self.encoder.emit_call_varargs(store, op, method, optional)
    }

    /// Emits `calli` through a managed stand-alone signature.
    ///
    /// # Errors
    /// See [`InstructionEncoder::emit_calli`].
    pub fn emit_calli(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        signature: &SignatureMethod,
    ) -> Result<()> {
        self.encoder.emit_calli(store, op, signature)
    }

    /// Emits `calli` through an unmanaged function pointer.
    ///
    /// # Errors
    /// See [`InstructionEncoder::emit_calli`].
    pub fn emit_calli_unmanaged(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        convention: UnmanagedCallingConvention,
        return_type: TypeSignature,
        params: Vec<TypeSignature>,
    ) -> Result<()> {
        self.encoder
            .emit_calli_unmanaged(store, op, convention, return_type, params)
    }

    /// Constructs an exception with `ctor` and throws it.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] for an unknown constructor.
    pub fn throw_exception(&mut self, store: &dyn MetadataStore, ctor: &MethodRef) -> Result<()> {
        self.encoder.emit_method(store, opcodes::NEWOBJ, ctor)?;
        self.encoder.emit(opcodes::THROW)
    }

    // ============================================================================================
    // Locals
    // ============================================================================================

    /// Declares a local variable of type `local_type`.
    ///
    /// # Errors
    /// Returns [`crate::Error::LocalIndexOutOfRange`] beyond 65536 locals.
    pub fn declare_local(&mut self, local_type: TypeSignature) -> Result<LocalBuilder> {
        self.locals.declare(local_type, false)
    }

    /// Declares a pinned local variable.
    ///
    /// # Errors
    /// Returns [`crate::Error::LocalIndexOutOfRange`] beyond 65536 locals.
    pub fn declare_pinned_local(&mut self, local_type: TypeSignature) -> Result<LocalBuilder> {
        self.locals.declare(local_type, true)
    }

    /// Number of declared locals
    #[must_use]
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Emits a `ldloc`, `stloc` or `ldloca` of `local`, narrowed to the shortest form.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidLocal`] for a local of another body and
    /// [`crate::Error::WrongOperandType`] if `op` is not a local variable instruction.
    pub fn emit_local(&mut self, op: OpCode, local: &LocalBuilder) -> Result<()> {
        self.locals.check(local)?;
        self.encoder.emit_local_index(op, local.index())
    }

    // ============================================================================================
    // Exception regions
    // ============================================================================================

    /// Opens a `try` block and returns the label that marks the end of the whole region.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] once the code exceeds the 32-bit offset space.
    pub fn begin_exception_block(&mut self) -> Result<Label> {
        self.regions.begin(&mut self.encoder)
    }

    /// Starts a catch handler for `catch_type` in the innermost region.
    ///
    /// Directly after [`MethodBodyBuilder::begin_filter`], `None` ends the filter expression
    /// with `endfilter` and starts the filter's handler.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoOpenExceptionBlock`], [`crate::Error::ClauseAfterFinally`] or
    /// [`crate::Error::InvalidFilterTransition`] for invalid transitions.
    pub fn begin_catch(&mut self, catch_type: Option<ItemHandle>) -> Result<()> {
        self.regions
            .begin_clause(&mut self.encoder, ClauseKind::Catch, catch_type)
    }

    /// Starts a filter expression in the innermost region.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoOpenExceptionBlock`] or [`crate::Error::ClauseAfterFinally`].
    pub fn begin_filter(&mut self) -> Result<()> {
        self.regions
            .begin_clause(&mut self.encoder, ClauseKind::Filter, None)
    }

    /// Starts the finally handler of the innermost region.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoOpenExceptionBlock`] or [`crate::Error::ClauseAfterFinally`].
    pub fn begin_finally(&mut self) -> Result<()> {
        self.regions
            .begin_clause(&mut self.encoder, ClauseKind::Finally, None)
    }

    /// Starts the fault handler of the innermost region.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoOpenExceptionBlock`] or [`crate::Error::ClauseAfterFinally`].
    pub fn begin_fault(&mut self) -> Result<()> {
        self.regions
            .begin_clause(&mut self.encoder, ClauseKind::Fault, None)
    }

    /// Terminates the last handler and closes the innermost region.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoOpenExceptionBlock`] or [`crate::Error::NoExceptionClauses`].
    pub fn end_exception_block(&mut self) -> Result<()> {
        self.regions.end(&mut self.encoder)
    }

    /// Closed regions in closing order, inner regions first
    #[must_use]
    pub fn exception_regions(&self) -> Vec<ExceptionRegion> {
        self.regions.closed()
    }

    // ============================================================================================
    // Serialization
    // ============================================================================================

    /// Serializes header, code and exception section.
    ///
    /// Does not change the builder; calling it twice yields the same result as long as the
    /// store hands out the same tokens.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnclosedExceptionBlock`] while regions are open,
    /// [`crate::Error::InvalidBranch`] for a branch to a label that was never marked,
    /// [`crate::Error::StackOverflow`] if the max stack exceeds the header field, and the
    /// store's errors.
    pub fn serialize(&self, store: &dyn MetadataStore) -> Result<SerializedMethodBody> {
        serialize_body(
            &self.encoder,
            &self.locals,
            &self.regions,
            &self.config,
            store,
        )
    }
}
