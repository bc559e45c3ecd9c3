//! CIL instruction encoding with stack tracking and label backpatching.
//!
//! The [`InstructionEncoder`] appends instructions to a [`CodeBuffer`] in a single forward
//! pass. For every instruction it updates the [`StackDepth`], writes the opcode, and writes the
//! operand in the width the opcode declares.
//!
//! # Branches
//!
//! A branch to a label that is already marked picks the short form whenever the displacement
//! fits into a signed byte. A branch to an unmarked label always uses the long form with a
//! zero placeholder that [`InstructionEncoder::mark_label`] patches later. Switch entries are
//! measured from the end of the switch table.
//!
//! # Tokens
//!
//! Token operands are resolved through the [`MetadataStore`] passed into each call. Tokens the
//! store reports as not yet final are recorded in the [`TokenFixups`] ledger at their code
//! offset.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::assembly::{opcodes, InstructionEncoder};
//! use cilemit::builder::StackPolicy;
//!
//! let mut encoder = InstructionEncoder::new(16, StackPolicy::Lenient);
//!
//! let end = encoder.define_label();
//! encoder.emit(opcodes::LDARG_0)?;
//! encoder.emit_branch(opcodes::BRFALSE, end)?;
//! encoder.emit_ldc_i4(42)?;
//! encoder.emit(opcodes::POP)?;
//! encoder.mark_label(end)?;
//! encoder.emit(opcodes::RET)?;
//!
//! // brfalse was emitted before `end` was marked, so it keeps the long form
//! assert_eq!(
//!     encoder.code(),
//!     &[0x02, 0x39, 0x03, 0x00, 0x00, 0x00, 0x1F, 0x2A, 0x26, 0x2A]
//! );
//! assert_eq!(encoder.max_stack(), 1);
//! # Ok::<(), cilemit::Error>(())
//! ```

use log::trace;

use crate::{
    assembly::{
        buffer::CodeBuffer,
        fixups::TokenFixups,
        instruction::OperandType,
        labels::{BranchRef, Label, LabelTable},
        opcodes::{self, OpCode},
        stack::StackDepth,
    },
    builder::StackPolicy,
    metadata::{
        signatures::{encode_method_signature, SignatureMethod, SignatureParameter, TypeSignature},
        store::{ItemHandle, MetadataStore, MethodRef},
    },
    utils::to_u32,
    Error, Result,
};

const LOAD_LOCAL: [OpCode; 4] = [
    opcodes::LDLOC_0,
    opcodes::LDLOC_1,
    opcodes::LDLOC_2,
    opcodes::LDLOC_3,
];
const STORE_LOCAL: [OpCode; 4] = [
    opcodes::STLOC_0,
    opcodes::STLOC_1,
    opcodes::STLOC_2,
    opcodes::STLOC_3,
];
const LOAD_ARGUMENT: [OpCode; 4] = [
    opcodes::LDARG_0,
    opcodes::LDARG_1,
    opcodes::LDARG_2,
    opcodes::LDARG_3,
];

/// Native calling conventions for `calli` through an unmanaged function pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmanagedCallingConvention {
    /// Caller cleans the stack (`cdecl`)
    Cdecl,
    /// Callee cleans the stack (`stdcall`)
    StdCall,
    /// `this` passed in a register (`thiscall`)
    ThisCall,
    /// Leading arguments passed in registers (`fastcall`)
    FastCall,
}

/// Single-pass CIL instruction encoder.
///
/// Owns the code buffer, stack tracker, label table and code fixup ledger of one method body.
/// Not shared between threads; build independent bodies with independent encoders.
#[derive(Debug, Clone)]
pub struct InstructionEncoder {
    buffer: CodeBuffer,
    stack: StackDepth,
    labels: LabelTable,
    fixups: TokenFixups,
}

impl InstructionEncoder {
    /// Create a new instruction encoder.
    ///
    /// # Arguments
    /// * `capacity_hint` - Expected code size in bytes
    /// * `policy` - Reaction to stack underflow
    #[must_use]
    pub fn new(capacity_hint: usize, policy: StackPolicy) -> Self {
        Self {
            buffer: CodeBuffer::new(capacity_hint),
            stack: StackDepth::new(policy),
            labels: LabelTable::new(),
            fixups: TokenFixups::new(),
        }
    }

    /// Current code offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] once the code exceeds the 32-bit offset space.
    pub fn offset(&self) -> Result<u32> {
        self.buffer.offset()
    }

    /// The code emitted so far
    #[must_use]
    pub fn code(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Stack depth at the current position
    #[must_use]
    pub fn current_stack(&self) -> u32 {
        self.stack.current()
    }

    /// Deepest stack depth reached so far
    #[must_use]
    pub fn max_stack(&self) -> u32 {
        self.stack.max()
    }

    /// Token placeholders in the code
    #[must_use]
    pub fn fixups(&self) -> &TokenFixups {
        &self.fixups
    }

    /// The label table
    #[must_use]
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub(crate) fn reset_stack(&mut self, depth: u32) {
        self.stack.reset(depth);
    }

    /// Updates the stack and writes the opcode bytes.
    fn begin(&mut self, op: OpCode, pops: u32, pushes: u32) -> Result<()> {
        let offset = self.buffer.offset()?;
        self.stack.apply(pops, pushes, offset)?;
        op.write_to(self.buffer.opcode_sink(op.size()));
        Ok(())
    }

    /// Stack effect from the catalogue alone; `ret` pops whatever is left.
    fn stack_effect(&self, op: OpCode) -> (u32, u32) {
        (
            op.pop.count().unwrap_or(self.stack.current()),
            op.push.count().unwrap_or(0),
        )
    }

    /// Stack effect of a call-family instruction given the callee signature.
    fn call_effect(op: OpCode, signature: &SignatureMethod) -> Result<(u32, u32)> {
        let pops = match op.pop.count() {
            Some(pops) => pops,
            None => {
                let mut pops = to_u32(signature.params.len() + signature.varargs.len())?;
                if signature.has_this && !signature.explicit_this && op != opcodes::NEWOBJ {
                    pops += 1;
                }
                pops
            }
        };
        let pushes = op
            .push
            .count()
            .unwrap_or(u32::from(signature.returns_value()));

        Ok((pops, pushes))
    }

    fn expect_operand(op: OpCode, accepted: &[OperandType]) -> Result<()> {
        if accepted.contains(&op.operand) {
            Ok(())
        } else if op.operand == OperandType::None {
            Err(Error::UnexpectedOperand(op.name))
        } else {
            Err(Error::WrongOperandType {
                mnemonic: op.name,
                expected: format!("{:?}", op.operand),
            })
        }
    }

    /// Emit an instruction without operand.
    ///
    /// # Errors
    /// Returns [`Error::WrongOperandType`] if the opcode requires an operand and
    /// [`Error::StackUnderflow`] under the strict stack policy.
    pub fn emit(&mut self, op: OpCode) -> Result<()> {
        if op.operand != OperandType::None {
            return Err(Error::WrongOperandType {
                mnemonic: op.name,
                expected: format!("{:?}", op.operand),
            });
        }

        let (pops, pushes) = self.stack_effect(op);
        self.begin(op, pops, pushes)
    }

    /// Emit an instruction with an integer operand (`Int8`, `UInt8`, `Int32`, `Int64`, or a raw
    /// `ShortVar`/`Var` index).
    ///
    /// # Errors
    /// Returns [`Error::ImmediateOutOfRange`] if `value` does not fit the operand width, or an
    /// operand error if the opcode takes no integer.
    pub fn emit_int(&mut self, op: OpCode, value: i64) -> Result<()> {
        Self::expect_operand(
            op,
            &[
                OperandType::Int8,
                OperandType::UInt8,
                OperandType::Int32,
                OperandType::Int64,
                OperandType::ShortVar,
                OperandType::Var,
            ],
        )?;

        let fits = match op.operand {
            OperandType::Int8 => i8::try_from(value).is_ok(),
            OperandType::UInt8 | OperandType::ShortVar => u8::try_from(value).is_ok(),
            OperandType::Var => u16::try_from(value).is_ok(),
            OperandType::Int32 => i32::try_from(value).is_ok(),
            _ => true,
        };
        if !fits {
            return Err(Error::ImmediateOutOfRange {
                mnemonic: op.name,
                value,
            });
        }

        let (pops, pushes) = self.stack_effect(op);
        self.begin(op, pops, pushes)?;

        // Range checked above
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        match op.operand {
            OperandType::Int8 => self.buffer.write_le(value as i8),
            OperandType::UInt8 | OperandType::ShortVar => self.buffer.write_le(value as u8),
            OperandType::Var => self.buffer.write_le(value as u16),
            OperandType::Int32 => self.buffer.write_le(value as i32),
            _ => self.buffer.write_le(value),
        }
        Ok(())
    }

    /// Emit an instruction with a 32-bit float operand (`ldc.r4`).
    ///
    /// # Errors
    /// Returns an operand error if the opcode does not take a `float32`.
    pub fn emit_f32(&mut self, op: OpCode, value: f32) -> Result<()> {
        Self::expect_operand(op, &[OperandType::Float32])?;
        let (pops, pushes) = self.stack_effect(op);
        self.begin(op, pops, pushes)?;
        self.buffer.write_le(value);
        Ok(())
    }

    /// Emit an instruction with a 64-bit float operand (`ldc.r8`).
    ///
    /// # Errors
    /// Returns an operand error if the opcode does not take a `float64`.
    pub fn emit_f64(&mut self, op: OpCode, value: f64) -> Result<()> {
        Self::expect_operand(op, &[OperandType::Float64])?;
        let (pops, pushes) = self.stack_effect(op);
        self.begin(op, pops, pushes)?;
        self.buffer.write_le(value);
        Ok(())
    }

    /// Emit a `ldc.i4` instruction with optimal encoding.
    ///
    /// Automatically selects the most compact form:
    /// - `ldc.i4.m1` through `ldc.i4.8` for values -1 to 8 (1 byte)
    /// - `ldc.i4.s` for values -128 to 127 (2 bytes)
    /// - `ldc.i4` for all other values (5 bytes)
    ///
    /// # Errors
    /// Returns [`Error::StackUnderflow`] only in theory; loading a constant never pops.
    pub fn emit_ldc_i4(&mut self, value: i32) -> Result<()> {
        match value {
            -1 => self.emit(opcodes::LDC_I4_M1),
            0 => self.emit(opcodes::LDC_I4_0),
            1 => self.emit(opcodes::LDC_I4_1),
            2 => self.emit(opcodes::LDC_I4_2),
            3 => self.emit(opcodes::LDC_I4_3),
            4 => self.emit(opcodes::LDC_I4_4),
            5 => self.emit(opcodes::LDC_I4_5),
            6 => self.emit(opcodes::LDC_I4_6),
            7 => self.emit(opcodes::LDC_I4_7),
            8 => self.emit(opcodes::LDC_I4_8),
            x if (-128..=127).contains(&x) => self.emit_int(opcodes::LDC_I4_S, i64::from(x)),
            x => self.emit_int(opcodes::LDC_I4, i64::from(x)),
        }
    }

    /// Emit a local variable access with mandatory narrowing.
    ///
    /// `op` names the access kind with any member of its family (`ldloc*`, `stloc*`,
    /// `ldloca*`). Indices 0-3 use the dedicated zero-operand opcodes where they exist, indices
    /// below 256 the `.s` form, everything else the two-byte index form.
    ///
    /// # Errors
    /// Returns [`Error::LocalIndexOutOfRange`] for indices above `0xFFFF` and
    /// [`Error::WrongOperandType`] if `op` is not a local variable instruction.
    pub fn emit_local_index(&mut self, op: OpCode, index: u32) -> Result<()> {
        match op.value {
            0x06..=0x09 | 0x11 | 0xFE0C => {
                self.emit_var(Some(&LOAD_LOCAL), opcodes::LDLOC_S, opcodes::LDLOC, index)
            }
            0x0A..=0x0D | 0x13 | 0xFE0E => {
                self.emit_var(Some(&STORE_LOCAL), opcodes::STLOC_S, opcodes::STLOC, index)
            }
            0x12 | 0xFE0D => self.emit_var(None, opcodes::LDLOCA_S, opcodes::LDLOCA, index),
            _ => Err(Error::WrongOperandType {
                mnemonic: op.name,
                expected: "a local variable instruction".to_string(),
            }),
        }
    }

    /// Emit an argument access (`ldarg*`, `ldarga*`, `starg*`) narrowed like locals.
    ///
    /// # Errors
    /// Returns [`Error::LocalIndexOutOfRange`] for indices above `0xFFFF` and
    /// [`Error::WrongOperandType`] if `op` is not an argument instruction.
    pub fn emit_argument(&mut self, op: OpCode, index: u32) -> Result<()> {
        match op.value {
            0x02..=0x05 | 0x0E | 0xFE09 => {
                self.emit_var(Some(&LOAD_ARGUMENT), opcodes::LDARG_S, opcodes::LDARG, index)
            }
            0x0F | 0xFE0A => self.emit_var(None, opcodes::LDARGA_S, opcodes::LDARGA, index),
            0x10 | 0xFE0B => self.emit_var(None, opcodes::STARG_S, opcodes::STARG, index),
            _ => Err(Error::WrongOperandType {
                mnemonic: op.name,
                expected: "an argument instruction".to_string(),
            }),
        }
    }

    fn emit_var(
        &mut self,
        compact: Option<&[OpCode; 4]>,
        short: OpCode,
        long: OpCode,
        index: u32,
    ) -> Result<()> {
        if index > 0xFFFF {
            return Err(Error::LocalIndexOutOfRange(index));
        }

        if let Some(op) = compact.and_then(|ops| ops.get(index as usize)) {
            return self.emit(*op);
        }

        if index <= 0xFF {
            self.emit_int(short, i64::from(index))
        } else {
            self.emit_int(long, i64::from(index))
        }
    }

    /// Allocates a new, unmarked label.
    pub fn define_label(&mut self) -> Label {
        self.labels.define()
    }

    /// Emit a branch instruction to `label`.
    ///
    /// Either form of the branch may be passed (`br` or `br.s`); the encoder picks the form.
    /// Marked labels get the short form if the displacement fits into a signed byte; unmarked
    /// labels always get the long form with a placeholder.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBranch`] if `op` is not a branch and [`Error::InvalidLabel`]
    /// for a label of another body.
    pub fn emit_branch(&mut self, op: OpCode, label: Label) -> Result<()> {
        if !op.is_branch() {
            return Err(Error::InvalidBranch(format!(
                "instruction '{}' is not a branch instruction",
                op.name
            )));
        }

        let target = self.labels.resolved_offset(label)?;
        let long = op.long_form().unwrap_or(op);
        let short = op.short_form().unwrap_or(op);

        let start = self.buffer.offset()?;
        let (pops, pushes) = self.stack_effect(long);
        self.stack.apply(pops, pushes, start)?;
        self.labels.note_height(label, self.stack.current())?;

        match target {
            Some(target) => {
                let short_end = i64::from(start) + short.size() as i64 + 1;
                if let Ok(delta) = i8::try_from(i64::from(target) - short_end) {
                    short.write_to(self.buffer.opcode_sink(2));
                    self.buffer.write_le(delta);
                } else {
                    let long_end = i64::from(start) + long.size() as i64 + 4;
                    let delta = i32::try_from(i64::from(target) - long_end).map_err(|_| {
                        Error::InvalidBranch(format!("displacement to {label} exceeds 32 bits"))
                    })?;
                    long.write_to(self.buffer.opcode_sink(5));
                    self.buffer.write_le(delta);
                }
            }
            None => {
                long.write_to(self.buffer.opcode_sink(5));
                let patch_offset = self.buffer.offset()?;
                self.buffer.write_le(0_i32);
                self.labels.add_ref(
                    label,
                    BranchRef {
                        patch_offset,
                        table_base: None,
                    },
                )?;
                trace!("{} at IL_{:04X} waits for {}", long, start, label);
            }
        }

        Ok(())
    }

    /// Emit a `switch` with one entry per label.
    ///
    /// Entries are relative to the first byte after the table.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBranch`] for an empty label list and [`Error::InvalidLabel`]
    /// for a label of another body.
    pub fn emit_switch(&mut self, labels: &[Label]) -> Result<()> {
        if labels.is_empty() {
            return Err(Error::InvalidBranch(
                "switch must have at least one target".to_string(),
            ));
        }

        let mut targets = Vec::with_capacity(labels.len());
        for label in labels {
            targets.push(self.labels.resolved_offset(*label)?);
        }

        let count = to_u32(labels.len())?;
        let start = self.buffer.offset()?;
        let table_base = count
            .checked_mul(4)
            .and_then(|table| table.checked_add(start + 5))
            .ok_or_else(|| malformed_error!("Switch table exceeds the code offset range"))?;

        self.begin(opcodes::SWITCH, 1, 0)?;
        self.buffer.write_le(count);

        let height = self.stack.current();
        for (label, target) in labels.iter().zip(targets) {
            self.labels.note_height(*label, height)?;
            match target {
                Some(target) => {
                    let delta = i32::try_from(i64::from(target) - i64::from(table_base))
                        .map_err(|_| {
                            Error::InvalidBranch(format!(
                                "displacement to {label} exceeds 32 bits"
                            ))
                        })?;
                    self.buffer.write_le(delta);
                }
                None => {
                    let patch_offset = self.buffer.offset()?;
                    self.buffer.write_le(0_i32);
                    self.labels.add_ref(
                        *label,
                        BranchRef {
                            patch_offset,
                            table_base: Some(table_base),
                        },
                    )?;
                }
            }
        }

        Ok(())
    }

    /// Marks `label` at the current offset and patches every branch waiting for it.
    ///
    /// The stack depth is raised to the deepest height any branch arrived with.
    ///
    /// # Errors
    /// Returns [`Error::LabelAlreadyMarked`] when called twice for one label and
    /// [`Error::InvalidLabel`] for a label of another body.
    pub fn mark_label(&mut self, label: Label) -> Result<()> {
        let offset = self.buffer.offset()?;
        let (height, refs) = self.labels.mark(label, offset)?;
        self.stack.raise_to(height);

        for branch in refs {
            let delta = i32::try_from(i64::from(offset) - i64::from(branch.base()))
                .map_err(|_| Error::InvalidBranch(format!("displacement to {label} exceeds 32 bits")))?;
            self.buffer.patch_i32(branch.patch_offset, delta)?;
            trace!(
                "Patched IL_{:04X} with {} for {} at IL_{:04X}",
                branch.patch_offset,
                delta,
                label,
                offset
            );
        }

        Ok(())
    }

    /// Writes the token of `item` as operand of `op`, recording a fixup if it is provisional.
    fn emit_item(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        item: ItemHandle,
        pops: u32,
        pushes: u32,
    ) -> Result<()> {
        let resolved = store.resolve_token(item)?;

        self.begin(op, pops, pushes)?;
        let operand_offset = self.buffer.offset()?;
        self.buffer.write_le(resolved.token.value());

        if !resolved.is_final {
            self.fixups.register(operand_offset, item);
        }
        Ok(())
    }

    /// Emit `ldstr` with the user string token of `value`.
    ///
    /// # Errors
    /// Returns the store's error if the string cannot be interned.
    pub fn emit_string(&mut self, store: &dyn MetadataStore, value: &str) -> Result<()> {
        let token = store.user_string_token(value)?;
        self.begin(opcodes::LDSTR, 0, 1)?;
        self.buffer.write_le(token.value());
        Ok(())
    }

    /// Emit a field instruction (`ldfld`, `stsfld`, ...).
    ///
    /// # Errors
    /// Returns an operand error if `op` takes no field and [`Error::UnresolvedToken`] for an
    /// unknown handle.
    pub fn emit_field(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        field: ItemHandle,
    ) -> Result<()> {
        Self::expect_operand(op, &[OperandType::Field])?;
        let (pops, pushes) = self.stack_effect(op);
        self.emit_item(store, op, field, pops, pushes)
    }

    /// Emit a type instruction (`box`, `newarr`, `castclass`, ...).
    ///
    /// # Errors
    /// Returns an operand error if `op` takes no type and [`Error::UnresolvedToken`] for an
    /// unknown handle.
    pub fn emit_type(&mut self, store: &dyn MetadataStore, op: OpCode, ty: ItemHandle) -> Result<()> {
        Self::expect_operand(op, &[OperandType::Type])?;
        let (pops, pushes) = self.stack_effect(op);
        self.emit_item(store, op, ty, pops, pushes)
    }

    /// Emit `ldtoken` for a type, method or field.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for an unknown handle.
    pub fn emit_token(&mut self, store: &dyn MetadataStore, item: ItemHandle) -> Result<()> {
        self.emit_item(store, opcodes::LDTOKEN, item, 0, 1)
    }

    /// Emit a method instruction (`call`, `callvirt`, `newobj`, `jmp`, `ldftn`, `ldvirtftn`).
    ///
    /// Variable stack behaviour is taken from the callee signature: its parameters plus `this`
    /// for instance methods (except for `newobj`) are popped, and a non-void return is pushed.
    ///
    /// # Errors
    /// Returns an operand error if `op` takes no method and [`Error::UnresolvedToken`] for an
    /// unknown handle.
    pub fn emit_method(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        method: &MethodRef,
    ) -> Result<()> {
        Self::expect_operand(op, &[OperandType::Method])?;
        let (pops, pushes) = Self::call_effect(op, &method.signature)?;
        self.emit_item(store, op, method.handle, pops, pushes)
    }

    /// Emit a call to a vararg method passing `optional` extra arguments.
    ///
    /// The call-site signature (declared parameters, sentinel, optional parameters) is
    /// registered with the store as a member reference, which becomes the operand. Without
    /// optional arguments this is a plain [`InstructionEncoder::emit_method`].
    ///
    /// # Errors
    /// Returns an operand error if `op` takes no method, or the store's or signature
    /// encoder's error.
    pub fn emit_call_varargs(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        method: &MethodRef,
        optional: &[TypeSignature],
    ) -> Result<()> {
        Self::expect_operand(op, &[OperandType::Method])?;
        if optional.is_empty() {
            return self.emit_method(store, op, method);
        }

        let mut call_site = method.signature.clone();
        call_site.vararg = true;
        call_site.varargs = optional
            .iter()
            .cloned()
            .map(SignatureParameter::from)
            .collect();

        let blob = encode_method_signature(&call_site)?;
        let member = store.vararg_member_ref(method.handle, &blob)?;
        let (pops, pushes) = Self::call_effect(op, &call_site)?;
        self.emit_item(store, op, member, pops, pushes)
    }

    /// Emit `calli` through a stand-alone signature.
    ///
    /// Pops every argument (including `this` and vararg extras) plus the function pointer.
    ///
    /// # Errors
    /// Returns an operand error if `op` takes no signature, or the store's or signature
    /// encoder's error.
    pub fn emit_calli(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        signature: &SignatureMethod,
    ) -> Result<()> {
        Self::expect_operand(op, &[OperandType::Signature])?;

        let blob = encode_method_signature(signature)?;
        let token = store.signature_token(&blob)?;
        let (pops, pushes) = Self::call_effect(op, signature)?;

        self.begin(op, pops + 1, pushes)?;
        self.buffer.write_le(token.value());
        Ok(())
    }

    /// Emit `calli` through an unmanaged function pointer with the given native convention.
    ///
    /// # Errors
    /// Same as [`InstructionEncoder::emit_calli`].
    pub fn emit_calli_unmanaged(
        &mut self,
        store: &dyn MetadataStore,
        op: OpCode,
        convention: UnmanagedCallingConvention,
        return_type: TypeSignature,
        params: Vec<TypeSignature>,
    ) -> Result<()> {
        let mut signature = SignatureMethod::new(return_type, params);
        match convention {
            UnmanagedCallingConvention::Cdecl => signature.cdecl = true,
            UnmanagedCallingConvention::StdCall => signature.stdcall = true,
            UnmanagedCallingConvention::ThisCall => signature.thiscall = true,
            UnmanagedCallingConvention::FastCall => signature.fastcall = true,
        }
        self.emit_calli(store, op, &signature)
    }
}
