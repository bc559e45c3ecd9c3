//! Operand, control flow and stack behaviour classes of CIL instructions.
//!
//! Every [`crate::assembly::OpCode`] carries one value of each of these enums. The emitter uses
//! [`OperandType`] to validate and size operands, [`StackPop`]/[`StackPush`] to track the
//! evaluation stack and [`FlowType`] to tell branches apart from other instructions.
//!
//! # Examples
//!
//! ```rust
//! use cilemit::assembly::{OperandType, StackPop};
//!
//! assert_eq!(OperandType::Int32.size(), Some(4));
//! assert_eq!(OperandType::Switch.size(), None);
//! assert_eq!(StackPop::Pop2.count(), Some(2));
//! assert_eq!(StackPop::Varpop.count(), None);
//! ```

use strum::{EnumCount, EnumIter};

/// Types of operands for CIL instructions.
///
/// The kind decides both the width of the operand in the code stream and which emit operation
/// accepts it. Token kinds are resolved through the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// One byte local or argument index
    ShortVar,
    /// Two byte local or argument index
    Var,
    /// Signed 8-bit branch offset
    ShortBranch,
    /// Signed 32-bit branch offset
    Branch,
    /// Target count followed by signed 32-bit offsets
    Switch,
    /// User string token
    String,
    /// Field token
    Field,
    /// Method token
    Method,
    /// Type token
    Type,
    /// Any field, method or type token (`ldtoken`)
    Token,
    /// Stand-alone signature token
    Signature,
}

impl OperandType {
    /// Returns the size in bytes of this operand type.
    ///
    /// `None` for the variable sized switch table.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8
            | OperandType::UInt8
            | OperandType::ShortVar
            | OperandType::ShortBranch => Some(1),
            OperandType::Var => Some(2),
            OperandType::Int32
            | OperandType::Float32
            | OperandType::Branch
            | OperandType::String
            | OperandType::Field
            | OperandType::Method
            | OperandType::Type
            | OperandType::Token
            | OperandType::Signature => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }

    /// Returns true for operands that embed a metadata token.
    #[must_use]
    pub const fn is_token(&self) -> bool {
        matches!(
            self,
            OperandType::String
                | OperandType::Field
                | OperandType::Method
                | OperandType::Type
                | OperandType::Token
                | OperandType::Signature
        )
    }
}

/// Control flow behavior of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Always branches to another location (`br`, `leave`)
    UnconditionalBranch,
    /// Conditional branch to another location, including `switch`
    ConditionalBranch,
    /// Call to another method
    Call,
    /// Leaves the method or a handler (`ret`, `endfinally`, `endfilter`)
    Return,
    /// Exception throwing
    Throw,
    /// Prefix that modifies the following instruction
    Meta,
}

/// Number of values an instruction pops from the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum StackPop {
    /// Pops nothing
    Pop0,
    /// Pops one value
    Pop1,
    /// Pops two values
    Pop2,
    /// Pops three values
    Pop3,
    /// Depends on the operand (callee signature) or, for `ret` and `leave`, on the current depth
    Varpop,
}

impl StackPop {
    /// Fixed pop count, `None` for [`StackPop::Varpop`]
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        match self {
            StackPop::Pop0 => Some(0),
            StackPop::Pop1 => Some(1),
            StackPop::Pop2 => Some(2),
            StackPop::Pop3 => Some(3),
            StackPop::Varpop => None,
        }
    }
}

/// Number of values an instruction pushes onto the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum StackPush {
    /// Pushes nothing
    Push0,
    /// Pushes one value
    Push1,
    /// Pushes two values (`dup`)
    Push2,
    /// One value if the callee returns one, nothing otherwise
    Varpush,
}

impl StackPush {
    /// Fixed push count, `None` for [`StackPush::Varpush`]
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        match self {
            StackPush::Push0 => Some(0),
            StackPush::Push1 => Some(1),
            StackPush::Push2 => Some(2),
            StackPush::Varpush => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn token_operands_are_four_bytes() {
        for operand in OperandType::iter().filter(OperandType::is_token) {
            assert_eq!(operand.size(), Some(4), "{operand:?}");
        }
    }

    #[test]
    fn only_switch_is_variable() {
        let variable: Vec<OperandType> = OperandType::iter()
            .filter(|operand| operand.size().is_none())
            .collect();
        assert_eq!(variable, vec![OperandType::Switch]);
        assert_eq!(OperandType::COUNT, 18);
    }

    #[test]
    fn fixed_stack_counts() {
        assert_eq!(StackPop::Pop3.count(), Some(3));
        assert_eq!(StackPush::Push2.count(), Some(2));
        assert_eq!(StackPush::Varpush.count(), None);
    }
}
