//! The CIL opcode catalogue (ECMA-335 Partition III).
//!
//! Every instruction is an [`OpCode`] constant named after its mnemonic (e.g. [`CALL`] for
//! `call`, [`BR_S`] for `br.s`). Two-byte opcodes carry their `0xFE` prefix in the high byte of
//! [`OpCode::value`]. [`ALL`] lists the whole catalogue ordered by value.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::assembly::{opcodes, OpCode, OperandType};
//!
//! assert_eq!(opcodes::CEQ.value, 0xFE01);
//! assert_eq!(opcodes::CEQ.size(), 2);
//! assert_eq!(OpCode::from_mnemonic("ldc.i4.s"), Some(opcodes::LDC_I4_S));
//! assert_eq!(opcodes::BR.short_form(), Some(opcodes::BR_S));
//! assert_eq!(opcodes::LDFLD.operand, OperandType::Field);
//! ```
#![allow(missing_docs)]

use std::{collections::HashMap, fmt, sync::OnceLock};

use crate::assembly::instruction::{FlowType, OperandType, StackPop, StackPush};

/// Descriptor of one CIL instruction.
///
/// Immutable catalogue entry: mnemonic, numeric opcode, operand kind, stack behaviour and
/// control flow class. Compare opcodes by value with `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCode {
    /// Mnemonic as written in IL assembly, e.g. `ldc.i4.s`
    pub name: &'static str,
    /// Opcode value; two-byte opcodes have `0xFE` in the high byte
    pub value: u16,
    /// Kind of the inline operand
    pub operand: OperandType,
    /// Values popped from the evaluation stack
    pub pop: StackPop,
    /// Values pushed onto the evaluation stack
    pub push: StackPush,
    /// Control flow class
    pub flow: FlowType,
}

impl OpCode {
    /// Length of the opcode itself in bytes (1 or 2)
    #[must_use]
    pub const fn size(&self) -> usize {
        if self.value > 0xFF {
            2
        } else {
            1
        }
    }

    /// Length of opcode plus operand, `None` for `switch`
    #[must_use]
    pub const fn encoded_size(&self) -> Option<usize> {
        match self.operand.size() {
            Some(operand) => Some(self.size() + operand),
            None => None,
        }
    }

    /// Returns true for branch instructions with a label operand (not `switch`)
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(
            self.operand,
            OperandType::ShortBranch | OperandType::Branch
        )
    }

    /// Appends the opcode bytes to `buffer`
    pub(crate) fn write_to(&self, buffer: &mut Vec<u8>) {
        let [high, low] = self.value.to_be_bytes();
        if self.value > 0xFF {
            buffer.push(high);
        }
        buffer.push(low);
    }

    /// Looks up an opcode by its numeric value
    #[must_use]
    pub fn from_value(value: u16) -> Option<OpCode> {
        value_lookup().get(&value).copied()
    }

    /// Looks up an opcode by its mnemonic
    #[must_use]
    pub fn from_mnemonic(name: &str) -> Option<OpCode> {
        mnemonic_lookup().get(name).copied()
    }

    /// The one-byte-offset variant of a long branch, e.g. `br` -> `br.s`
    #[must_use]
    pub fn short_form(&self) -> Option<OpCode> {
        match self.value {
            0x38..=0x44 => OpCode::from_value(self.value - 0x0D),
            0xDD => Some(LEAVE_S),
            _ => None,
        }
    }

    /// The four-byte-offset variant of a short branch, e.g. `br.s` -> `br`
    #[must_use]
    pub fn long_form(&self) -> Option<OpCode> {
        match self.value {
            0x2B..=0x37 => OpCode::from_value(self.value + 0x0D),
            0xDE => Some(LEAVE),
            _ => None,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

static MNEMONIC_TO_OPCODE: OnceLock<HashMap<&'static str, OpCode>> = OnceLock::new();
static VALUE_TO_OPCODE: OnceLock<HashMap<u16, OpCode>> = OnceLock::new();

fn mnemonic_lookup() -> &'static HashMap<&'static str, OpCode> {
    MNEMONIC_TO_OPCODE.get_or_init(|| ALL.iter().map(|op| (op.name, *op)).collect())
}

fn value_lookup() -> &'static HashMap<u16, OpCode> {
    VALUE_TO_OPCODE.get_or_init(|| ALL.iter().map(|op| (op.value, *op)).collect())
}

macro_rules! define_opcodes {
    ($($ident:ident = ($name:literal, $value:literal, $operand:ident, $pop:ident, $push:ident, $flow:ident);)*) => {
        $(
            pub const $ident: OpCode = OpCode {
                name: $name,
                value: $value,
                operand: OperandType::$operand,
                pop: StackPop::$pop,
                push: StackPush::$push,
                flow: FlowType::$flow,
            };
        )*

        /// Every opcode of the catalogue, ordered by value
        pub const ALL: &[OpCode] = &[$($ident),*];
    };
}

define_opcodes! {
    // ── Single-byte opcodes (0x00 – 0xE0) ──────────────────────────────────────
    NOP = ("nop", 0x00, None, Pop0, Push0, Sequential);
    BREAK = ("break", 0x01, None, Pop0, Push0, Sequential);
    LDARG_0 = ("ldarg.0", 0x02, None, Pop0, Push1, Sequential);
    LDARG_1 = ("ldarg.1", 0x03, None, Pop0, Push1, Sequential);
    LDARG_2 = ("ldarg.2", 0x04, None, Pop0, Push1, Sequential);
    LDARG_3 = ("ldarg.3", 0x05, None, Pop0, Push1, Sequential);
    LDLOC_0 = ("ldloc.0", 0x06, None, Pop0, Push1, Sequential);
    LDLOC_1 = ("ldloc.1", 0x07, None, Pop0, Push1, Sequential);
    LDLOC_2 = ("ldloc.2", 0x08, None, Pop0, Push1, Sequential);
    LDLOC_3 = ("ldloc.3", 0x09, None, Pop0, Push1, Sequential);
    STLOC_0 = ("stloc.0", 0x0A, None, Pop1, Push0, Sequential);
    STLOC_1 = ("stloc.1", 0x0B, None, Pop1, Push0, Sequential);
    STLOC_2 = ("stloc.2", 0x0C, None, Pop1, Push0, Sequential);
    STLOC_3 = ("stloc.3", 0x0D, None, Pop1, Push0, Sequential);
    LDARG_S = ("ldarg.s", 0x0E, ShortVar, Pop0, Push1, Sequential);
    LDARGA_S = ("ldarga.s", 0x0F, ShortVar, Pop0, Push1, Sequential);
    STARG_S = ("starg.s", 0x10, ShortVar, Pop1, Push0, Sequential);
    LDLOC_S = ("ldloc.s", 0x11, ShortVar, Pop0, Push1, Sequential);
    LDLOCA_S = ("ldloca.s", 0x12, ShortVar, Pop0, Push1, Sequential);
    STLOC_S = ("stloc.s", 0x13, ShortVar, Pop1, Push0, Sequential);
    LDNULL = ("ldnull", 0x14, None, Pop0, Push1, Sequential);
    LDC_I4_M1 = ("ldc.i4.m1", 0x15, None, Pop0, Push1, Sequential);
    LDC_I4_0 = ("ldc.i4.0", 0x16, None, Pop0, Push1, Sequential);
    LDC_I4_1 = ("ldc.i4.1", 0x17, None, Pop0, Push1, Sequential);
    LDC_I4_2 = ("ldc.i4.2", 0x18, None, Pop0, Push1, Sequential);
    LDC_I4_3 = ("ldc.i4.3", 0x19, None, Pop0, Push1, Sequential);
    LDC_I4_4 = ("ldc.i4.4", 0x1A, None, Pop0, Push1, Sequential);
    LDC_I4_5 = ("ldc.i4.5", 0x1B, None, Pop0, Push1, Sequential);
    LDC_I4_6 = ("ldc.i4.6", 0x1C, None, Pop0, Push1, Sequential);
    LDC_I4_7 = ("ldc.i4.7", 0x1D, None, Pop0, Push1, Sequential);
    LDC_I4_8 = ("ldc.i4.8", 0x1E, None, Pop0, Push1, Sequential);
    LDC_I4_S = ("ldc.i4.s", 0x1F, Int8, Pop0, Push1, Sequential);
    LDC_I4 = ("ldc.i4", 0x20, Int32, Pop0, Push1, Sequential);
    LDC_I8 = ("ldc.i8", 0x21, Int64, Pop0, Push1, Sequential);
    LDC_R4 = ("ldc.r4", 0x22, Float32, Pop0, Push1, Sequential);
    LDC_R8 = ("ldc.r8", 0x23, Float64, Pop0, Push1, Sequential);
    DUP = ("dup", 0x25, None, Pop1, Push2, Sequential);
    POP = ("pop", 0x26, None, Pop1, Push0, Sequential);
    JMP = ("jmp", 0x27, Method, Pop0, Push0, Call);
    CALL = ("call", 0x28, Method, Varpop, Varpush, Call);
    CALLI = ("calli", 0x29, Signature, Varpop, Varpush, Call);
    RET = ("ret", 0x2A, None, Varpop, Push0, Return);
    BR_S = ("br.s", 0x2B, ShortBranch, Pop0, Push0, UnconditionalBranch);
    BRFALSE_S = ("brfalse.s", 0x2C, ShortBranch, Pop1, Push0, ConditionalBranch);
    BRTRUE_S = ("brtrue.s", 0x2D, ShortBranch, Pop1, Push0, ConditionalBranch);
    BEQ_S = ("beq.s", 0x2E, ShortBranch, Pop2, Push0, ConditionalBranch);
    BGE_S = ("bge.s", 0x2F, ShortBranch, Pop2, Push0, ConditionalBranch);
    BGT_S = ("bgt.s", 0x30, ShortBranch, Pop2, Push0, ConditionalBranch);
    BLE_S = ("ble.s", 0x31, ShortBranch, Pop2, Push0, ConditionalBranch);
    BLT_S = ("blt.s", 0x32, ShortBranch, Pop2, Push0, ConditionalBranch);
    BNE_UN_S = ("bne.un.s", 0x33, ShortBranch, Pop2, Push0, ConditionalBranch);
    BGE_UN_S = ("bge.un.s", 0x34, ShortBranch, Pop2, Push0, ConditionalBranch);
    BGT_UN_S = ("bgt.un.s", 0x35, ShortBranch, Pop2, Push0, ConditionalBranch);
    BLE_UN_S = ("ble.un.s", 0x36, ShortBranch, Pop2, Push0, ConditionalBranch);
    BLT_UN_S = ("blt.un.s", 0x37, ShortBranch, Pop2, Push0, ConditionalBranch);
    BR = ("br", 0x38, Branch, Pop0, Push0, UnconditionalBranch);
    BRFALSE = ("brfalse", 0x39, Branch, Pop1, Push0, ConditionalBranch);
    BRTRUE = ("brtrue", 0x3A, Branch, Pop1, Push0, ConditionalBranch);
    BEQ = ("beq", 0x3B, Branch, Pop2, Push0, ConditionalBranch);
    BGE = ("bge", 0x3C, Branch, Pop2, Push0, ConditionalBranch);
    BGT = ("bgt", 0x3D, Branch, Pop2, Push0, ConditionalBranch);
    BLE = ("ble", 0x3E, Branch, Pop2, Push0, ConditionalBranch);
    BLT = ("blt", 0x3F, Branch, Pop2, Push0, ConditionalBranch);
    BNE_UN = ("bne.un", 0x40, Branch, Pop2, Push0, ConditionalBranch);
    BGE_UN = ("bge.un", 0x41, Branch, Pop2, Push0, ConditionalBranch);
    BGT_UN = ("bgt.un", 0x42, Branch, Pop2, Push0, ConditionalBranch);
    BLE_UN = ("ble.un", 0x43, Branch, Pop2, Push0, ConditionalBranch);
    BLT_UN = ("blt.un", 0x44, Branch, Pop2, Push0, ConditionalBranch);
    SWITCH = ("switch", 0x45, Switch, Pop1, Push0, ConditionalBranch);
    LDIND_I1 = ("ldind.i1", 0x46, None, Pop1, Push1, Sequential);
    LDIND_U1 = ("ldind.u1", 0x47, None, Pop1, Push1, Sequential);
    LDIND_I2 = ("ldind.i2", 0x48, None, Pop1, Push1, Sequential);
    LDIND_U2 = ("ldind.u2", 0x49, None, Pop1, Push1, Sequential);
    LDIND_I4 = ("ldind.i4", 0x4A, None, Pop1, Push1, Sequential);
    LDIND_U4 = ("ldind.u4", 0x4B, None, Pop1, Push1, Sequential);
    LDIND_I8 = ("ldind.i8", 0x4C, None, Pop1, Push1, Sequential);
    LDIND_I = ("ldind.i", 0x4D, None, Pop1, Push1, Sequential);
    LDIND_R4 = ("ldind.r4", 0x4E, None, Pop1, Push1, Sequential);
    LDIND_R8 = ("ldind.r8", 0x4F, None, Pop1, Push1, Sequential);
    LDIND_REF = ("ldind.ref", 0x50, None, Pop1, Push1, Sequential);
    STIND_REF = ("stind.ref", 0x51, None, Pop2, Push0, Sequential);
    STIND_I1 = ("stind.i1", 0x52, None, Pop2, Push0, Sequential);
    STIND_I2 = ("stind.i2", 0x53, None, Pop2, Push0, Sequential);
    STIND_I4 = ("stind.i4", 0x54, None, Pop2, Push0, Sequential);
    STIND_I8 = ("stind.i8", 0x55, None, Pop2, Push0, Sequential);
    STIND_R4 = ("stind.r4", 0x56, None, Pop2, Push0, Sequential);
    STIND_R8 = ("stind.r8", 0x57, None, Pop2, Push0, Sequential);
    ADD = ("add", 0x58, None, Pop2, Push1, Sequential);
    SUB = ("sub", 0x59, None, Pop2, Push1, Sequential);
    MUL = ("mul", 0x5A, None, Pop2, Push1, Sequential);
    DIV = ("div", 0x5B, None, Pop2, Push1, Sequential);
    DIV_UN = ("div.un", 0x5C, None, Pop2, Push1, Sequential);
    REM = ("rem", 0x5D, None, Pop2, Push1, Sequential);
    REM_UN = ("rem.un", 0x5E, None, Pop2, Push1, Sequential);
    AND = ("and", 0x5F, None, Pop2, Push1, Sequential);
    OR = ("or", 0x60, None, Pop2, Push1, Sequential);
    XOR = ("xor", 0x61, None, Pop2, Push1, Sequential);
    SHL = ("shl", 0x62, None, Pop2, Push1, Sequential);
    SHR = ("shr", 0x63, None, Pop2, Push1, Sequential);
    SHR_UN = ("shr.un", 0x64, None, Pop2, Push1, Sequential);
    NEG = ("neg", 0x65, None, Pop1, Push1, Sequential);
    NOT = ("not", 0x66, None, Pop1, Push1, Sequential);
    CONV_I1 = ("conv.i1", 0x67, None, Pop1, Push1, Sequential);
    CONV_I2 = ("conv.i2", 0x68, None, Pop1, Push1, Sequential);
    CONV_I4 = ("conv.i4", 0x69, None, Pop1, Push1, Sequential);
    CONV_I8 = ("conv.i8", 0x6A, None, Pop1, Push1, Sequential);
    CONV_R4 = ("conv.r4", 0x6B, None, Pop1, Push1, Sequential);
    CONV_R8 = ("conv.r8", 0x6C, None, Pop1, Push1, Sequential);
    CONV_U4 = ("conv.u4", 0x6D, None, Pop1, Push1, Sequential);
    CONV_U8 = ("conv.u8", 0x6E, None, Pop1, Push1, Sequential);
    CALLVIRT = ("callvirt", 0x6F, Method, Varpop, Varpush, Call);
    CPOBJ = ("cpobj", 0x70, Type, Pop2, Push0, Sequential);
    LDOBJ = ("ldobj", 0x71, Type, Pop1, Push1, Sequential);
    LDSTR = ("ldstr", 0x72, String, Pop0, Push1, Sequential);
    NEWOBJ = ("newobj", 0x73, Method, Varpop, Push1, Call);
    CASTCLASS = ("castclass", 0x74, Type, Pop1, Push1, Sequential);
    ISINST = ("isinst", 0x75, Type, Pop1, Push1, Sequential);
    CONV_R_UN = ("conv.r.un", 0x76, None, Pop1, Push1, Sequential);
    UNBOX = ("unbox", 0x79, Type, Pop1, Push1, Sequential);
    THROW = ("throw", 0x7A, None, Pop1, Push0, Throw);
    LDFLD = ("ldfld", 0x7B, Field, Pop1, Push1, Sequential);
    LDFLDA = ("ldflda", 0x7C, Field, Pop1, Push1, Sequential);
    STFLD = ("stfld", 0x7D, Field, Pop2, Push0, Sequential);
    LDSFLD = ("ldsfld", 0x7E, Field, Pop0, Push1, Sequential);
    LDSFLDA = ("ldsflda", 0x7F, Field, Pop0, Push1, Sequential);
    STSFLD = ("stsfld", 0x80, Field, Pop1, Push0, Sequential);
    STOBJ = ("stobj", 0x81, Type, Pop2, Push0, Sequential);
    CONV_OVF_I1_UN = ("conv.ovf.i1.un", 0x82, None, Pop1, Push1, Sequential);
    CONV_OVF_I2_UN = ("conv.ovf.i2.un", 0x83, None, Pop1, Push1, Sequential);
    CONV_OVF_I4_UN = ("conv.ovf.i4.un", 0x84, None, Pop1, Push1, Sequential);
    CONV_OVF_I8_UN = ("conv.ovf.i8.un", 0x85, None, Pop1, Push1, Sequential);
    CONV_OVF_U1_UN = ("conv.ovf.u1.un", 0x86, None, Pop1, Push1, Sequential);
    CONV_OVF_U2_UN = ("conv.ovf.u2.un", 0x87, None, Pop1, Push1, Sequential);
    CONV_OVF_U4_UN = ("conv.ovf.u4.un", 0x88, None, Pop1, Push1, Sequential);
    CONV_OVF_U8_UN = ("conv.ovf.u8.un", 0x89, None, Pop1, Push1, Sequential);
    CONV_OVF_I_UN = ("conv.ovf.i.un", 0x8A, None, Pop1, Push1, Sequential);
    CONV_OVF_U_UN = ("conv.ovf.u.un", 0x8B, None, Pop1, Push1, Sequential);
    BOX = ("box", 0x8C, Type, Pop1, Push1, Sequential);
    NEWARR = ("newarr", 0x8D, Type, Pop1, Push1, Sequential);
    LDLEN = ("ldlen", 0x8E, None, Pop1, Push1, Sequential);
    LDELEMA = ("ldelema", 0x8F, Type, Pop2, Push1, Sequential);
    LDELEM_I1 = ("ldelem.i1", 0x90, None, Pop2, Push1, Sequential);
    LDELEM_U1 = ("ldelem.u1", 0x91, None, Pop2, Push1, Sequential);
    LDELEM_I2 = ("ldelem.i2", 0x92, None, Pop2, Push1, Sequential);
    LDELEM_U2 = ("ldelem.u2", 0x93, None, Pop2, Push1, Sequential);
    LDELEM_I4 = ("ldelem.i4", 0x94, None, Pop2, Push1, Sequential);
    LDELEM_U4 = ("ldelem.u4", 0x95, None, Pop2, Push1, Sequential);
    LDELEM_I8 = ("ldelem.i8", 0x96, None, Pop2, Push1, Sequential);
    LDELEM_I = ("ldelem.i", 0x97, None, Pop2, Push1, Sequential);
    LDELEM_R4 = ("ldelem.r4", 0x98, None, Pop2, Push1, Sequential);
    LDELEM_R8 = ("ldelem.r8", 0x99, None, Pop2, Push1, Sequential);
    LDELEM_REF = ("ldelem.ref", 0x9A, None, Pop2, Push1, Sequential);
    STELEM_I = ("stelem.i", 0x9B, None, Pop3, Push0, Sequential);
    STELEM_I1 = ("stelem.i1", 0x9C, None, Pop3, Push0, Sequential);
    STELEM_I2 = ("stelem.i2", 0x9D, None, Pop3, Push0, Sequential);
    STELEM_I4 = ("stelem.i4", 0x9E, None, Pop3, Push0, Sequential);
    STELEM_I8 = ("stelem.i8", 0x9F, None, Pop3, Push0, Sequential);
    STELEM_R4 = ("stelem.r4", 0xA0, None, Pop3, Push0, Sequential);
    STELEM_R8 = ("stelem.r8", 0xA1, None, Pop3, Push0, Sequential);
    STELEM_REF = ("stelem.ref", 0xA2, None, Pop3, Push0, Sequential);
    LDELEM = ("ldelem", 0xA3, Type, Pop2, Push1, Sequential);
    STELEM = ("stelem", 0xA4, Type, Pop3, Push0, Sequential);
    UNBOX_ANY = ("unbox.any", 0xA5, Type, Pop1, Push1, Sequential);
    CONV_OVF_I1 = ("conv.ovf.i1", 0xB3, None, Pop1, Push1, Sequential);
    CONV_OVF_U1 = ("conv.ovf.u1", 0xB4, None, Pop1, Push1, Sequential);
    CONV_OVF_I2 = ("conv.ovf.i2", 0xB5, None, Pop1, Push1, Sequential);
    CONV_OVF_U2 = ("conv.ovf.u2", 0xB6, None, Pop1, Push1, Sequential);
    CONV_OVF_I4 = ("conv.ovf.i4", 0xB7, None, Pop1, Push1, Sequential);
    CONV_OVF_U4 = ("conv.ovf.u4", 0xB8, None, Pop1, Push1, Sequential);
    CONV_OVF_I8 = ("conv.ovf.i8", 0xB9, None, Pop1, Push1, Sequential);
    CONV_OVF_U8 = ("conv.ovf.u8", 0xBA, None, Pop1, Push1, Sequential);
    REFANYVAL = ("refanyval", 0xC2, Type, Pop1, Push1, Sequential);
    CKFINITE = ("ckfinite", 0xC3, None, Pop1, Push1, Sequential);
    MKREFANY = ("mkrefany", 0xC6, Type, Pop1, Push1, Sequential);
    LDTOKEN = ("ldtoken", 0xD0, Token, Pop0, Push1, Sequential);
    CONV_U2 = ("conv.u2", 0xD1, None, Pop1, Push1, Sequential);
    CONV_U1 = ("conv.u1", 0xD2, None, Pop1, Push1, Sequential);
    CONV_I = ("conv.i", 0xD3, None, Pop1, Push1, Sequential);
    CONV_OVF_I = ("conv.ovf.i", 0xD4, None, Pop1, Push1, Sequential);
    CONV_OVF_U = ("conv.ovf.u", 0xD5, None, Pop1, Push1, Sequential);
    ADD_OVF = ("add.ovf", 0xD6, None, Pop2, Push1, Sequential);
    ADD_OVF_UN = ("add.ovf.un", 0xD7, None, Pop2, Push1, Sequential);
    MUL_OVF = ("mul.ovf", 0xD8, None, Pop2, Push1, Sequential);
    MUL_OVF_UN = ("mul.ovf.un", 0xD9, None, Pop2, Push1, Sequential);
    SUB_OVF = ("sub.ovf", 0xDA, None, Pop2, Push1, Sequential);
    SUB_OVF_UN = ("sub.ovf.un", 0xDB, None, Pop2, Push1, Sequential);
    ENDFINALLY = ("endfinally", 0xDC, None, Pop0, Push0, Return);
    LEAVE = ("leave", 0xDD, Branch, Varpop, Push0, UnconditionalBranch);
    LEAVE_S = ("leave.s", 0xDE, ShortBranch, Varpop, Push0, UnconditionalBranch);
    STIND_I = ("stind.i", 0xDF, None, Pop2, Push0, Sequential);
    CONV_U = ("conv.u", 0xE0, None, Pop1, Push1, Sequential);

    // ── Two-byte opcodes (0xFE prefix) ─────────────────────────────────────────
    ARGLIST = ("arglist", 0xFE00, None, Pop0, Push1, Sequential);
    CEQ = ("ceq", 0xFE01, None, Pop2, Push1, Sequential);
    CGT = ("cgt", 0xFE02, None, Pop2, Push1, Sequential);
    CGT_UN = ("cgt.un", 0xFE03, None, Pop2, Push1, Sequential);
    CLT = ("clt", 0xFE04, None, Pop2, Push1, Sequential);
    CLT_UN = ("clt.un", 0xFE05, None, Pop2, Push1, Sequential);
    LDFTN = ("ldftn", 0xFE06, Method, Pop0, Push1, Sequential);
    LDVIRTFTN = ("ldvirtftn", 0xFE07, Method, Pop1, Push1, Sequential);
    LDARG = ("ldarg", 0xFE09, Var, Pop0, Push1, Sequential);
    LDARGA = ("ldarga", 0xFE0A, Var, Pop0, Push1, Sequential);
    STARG = ("starg", 0xFE0B, Var, Pop1, Push0, Sequential);
    LDLOC = ("ldloc", 0xFE0C, Var, Pop0, Push1, Sequential);
    LDLOCA = ("ldloca", 0xFE0D, Var, Pop0, Push1, Sequential);
    STLOC = ("stloc", 0xFE0E, Var, Pop1, Push0, Sequential);
    LOCALLOC = ("localloc", 0xFE0F, None, Pop1, Push1, Sequential);
    ENDFILTER = ("endfilter", 0xFE11, None, Pop1, Push0, Return);
    UNALIGNED = ("unaligned.", 0xFE12, UInt8, Pop0, Push0, Meta);
    VOLATILE = ("volatile.", 0xFE13, None, Pop0, Push0, Meta);
    TAIL = ("tail.", 0xFE14, None, Pop0, Push0, Meta);
    INITOBJ = ("initobj", 0xFE15, Type, Pop1, Push0, Sequential);
    CONSTRAINED = ("constrained.", 0xFE16, Type, Pop0, Push0, Meta);
    CPBLK = ("cpblk", 0xFE17, None, Pop3, Push0, Sequential);
    INITBLK = ("initblk", 0xFE18, None, Pop3, Push0, Sequential);
    NO = ("no.", 0xFE19, UInt8, Pop0, Push0, Meta);
    RETHROW = ("rethrow", 0xFE1A, None, Pop0, Push0, Throw);
    SIZEOF = ("sizeof", 0xFE1C, Type, Pop0, Push1, Sequential);
    REFANYTYPE = ("refanytype", 0xFE1D, None, Pop1, Push1, Sequential);
    READONLY = ("readonly.", 0xFE1E, None, Pop0, Push0, Meta);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_sorted_and_unique() {
        for pair in ALL.windows(2) {
            assert!(pair[0].value < pair[1].value, "{} / {}", pair[0], pair[1]);
        }
        assert_eq!(mnemonic_lookup().len(), ALL.len());
        assert_eq!(value_lookup().len(), ALL.len());
    }

    #[test]
    fn lookups() {
        assert_eq!(OpCode::from_value(0x2A), Some(RET));
        assert_eq!(OpCode::from_value(0xFE0C), Some(LDLOC));
        assert_eq!(OpCode::from_value(0x24), None);
        assert_eq!(OpCode::from_mnemonic("stelem.ref"), Some(STELEM_REF));
        assert_eq!(OpCode::from_mnemonic("nonsense"), None);
    }

    #[test]
    fn branch_pairs() {
        for op in ALL.iter().filter(|op| op.operand == OperandType::Branch) {
            let short = op.short_form().expect("every long branch has a short form");
            assert_eq!(short.operand, OperandType::ShortBranch);
            assert_eq!(short.long_form(), Some(*op));
            assert_eq!(short.pop, op.pop);
        }
        assert_eq!(LEAVE.short_form(), Some(LEAVE_S));
        assert_eq!(SWITCH.short_form(), None);
        assert_eq!(ADD.long_form(), None);
    }

    #[test]
    fn sizes_and_bytes() {
        assert_eq!(NOP.encoded_size(), Some(1));
        assert_eq!(LDC_I8.encoded_size(), Some(9));
        assert_eq!(LDLOC.encoded_size(), Some(4));
        assert_eq!(SWITCH.encoded_size(), None);

        let mut buffer = Vec::new();
        STLOC.write_to(&mut buffer);
        ADD.write_to(&mut buffer);
        assert_eq!(buffer, vec![0xFE, 0x0E, 0x58]);
    }

    #[test]
    fn handler_terminators_leave_the_block() {
        assert_eq!(ENDFINALLY.flow, FlowType::Return);
        assert_eq!(ENDFILTER.flow, FlowType::Return);
        assert_eq!(ENDFILTER.pop, StackPop::Pop1);
        assert!(LEAVE.is_branch());
        assert!(!SWITCH.is_branch());
    }
}
