use thiserror::Error;

use crate::metadata::store::ItemHandle;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is reported synchronously to the immediate caller; nothing is retried. Once a
/// builder operation has returned an error the in-progress body is in a defined but unusable
/// state and should be abandoned.
///
/// # Error Categories
///
/// ## Misuse
/// - [`Error::InvalidLabel`], [`Error::LabelAlreadyMarked`] - label handling
/// - [`Error::NoOpenExceptionBlock`], [`Error::NoExceptionClauses`],
///   [`Error::ClauseAfterFinally`], [`Error::InvalidFilterTransition`],
///   [`Error::UnclosedExceptionBlock`] - exception regions
/// - [`Error::UnexpectedOperand`], [`Error::WrongOperandType`], [`Error::InvalidBranch`],
///   [`Error::InvalidLocal`] - operand shapes that do not match the opcode
///
/// ## Capacity and Range
/// - [`Error::ImmediateOutOfRange`], [`Error::LocalIndexOutOfRange`]
/// - [`Error::StackOverflow`], [`Error::SectionTooLarge`]
///
/// ## Stack Tracking
/// - [`Error::StackUnderflow`] - only raised under [`crate::builder::StackPolicy::Strict`]
///
/// ## Deferred Resolution
/// - [`Error::UnresolvedToken`] - a fixup the metadata store could not resolve at finalize time
///
/// ## Parsing
/// - [`Error::Malformed`], [`Error::OutOfBounds`], [`Error::NotSupported`]
///
/// # Examples
///
/// ```rust
/// use cilemit::{Error, builder::MethodBodyBuilder};
///
/// let mut body = MethodBodyBuilder::new(16);
/// let label = body.define_label();
/// body.mark_label(label)?;
///
/// match body.mark_label(label) {
///     Err(Error::LabelAlreadyMarked(id)) => assert_eq!(id, 0),
///     other => panic!("unexpected result {other:?}"),
/// }
/// # Ok::<(), cilemit::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Parsing errors
    /// The input is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading a buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The requested encoding or feature is not supported.
    #[error("This feature is not supported - {0}")]
    NotSupported(String),

    // Label errors
    /// The label handle does not belong to this method body.
    #[error("Label {0} is not defined in this method body")]
    InvalidLabel(usize),

    /// A label may only be marked once.
    #[error("Label {0} has already been marked")]
    LabelAlreadyMarked(usize),

    /// The opcode used for a branch is not a branch instruction, or the branch cannot be encoded.
    #[error("Invalid branch - {0}")]
    InvalidBranch(String),

    // Exception region errors
    /// A clause or the end of a region was requested while no exception block is open.
    #[error("No exception block is open")]
    NoOpenExceptionBlock,

    /// An exception block was closed without any handler clause.
    #[error("Exception block has no handler clauses")]
    NoExceptionClauses,

    /// A clause was opened after a `finally` or `fault` clause of the same region.
    #[error("Cannot open a clause after a finally or fault clause")]
    ClauseAfterFinally,

    /// The body was serialized while exception blocks were still open.
    #[error("{0} exception block(s) were never closed")]
    UnclosedExceptionBlock(usize),

    /// A filter handler was started with a catch type, a filter clause was left without a
    /// handler, or an untyped catch was opened outside a filter.
    #[error("Invalid filter transition - {0}")]
    InvalidFilterTransition(String),

    // Operand errors
    /// An operand was supplied for an opcode that takes none.
    #[error("Unexpected operand for '{0}'")]
    UnexpectedOperand(&'static str),

    /// The operand kind does not match what the opcode expects, or the operand is missing.
    #[error("Wrong operand type for '{mnemonic}' - expected {expected}")]
    WrongOperandType {
        /// Mnemonic of the offending opcode
        mnemonic: &'static str,
        /// The operand kind the opcode declares
        expected: String,
    },

    /// The local variable handle was not declared by this method body.
    #[error("Local {0} was not declared in this method body")]
    InvalidLocal(u32),

    // Capacity errors
    /// An immediate does not fit the width the opcode declares.
    #[error("Immediate {value} out of range for '{mnemonic}'")]
    ImmediateOutOfRange {
        /// Mnemonic of the offending opcode
        mnemonic: &'static str,
        /// The rejected value
        value: i64,
    },

    /// A local or argument index beyond the encodable range.
    #[error("Index {0} exceeds the encodable local/argument range")]
    LocalIndexOutOfRange(u32),

    /// The maximum stack depth does not fit into the 16-bit header field.
    #[error("Maximum stack depth {0} exceeds the method header range")]
    StackOverflow(u32),

    /// A section grew beyond what its size field can describe.
    #[error("Section too large - {0}")]
    SectionTooLarge(String),

    // Stack errors
    /// The instruction would pop more values than the evaluation stack holds.
    #[error("Stack underflow at offset {offset}: depth {depth}, pops {pops}")]
    StackUnderflow {
        /// Code offset of the offending instruction
        offset: u32,
        /// Stack depth before the instruction
        depth: u32,
        /// Number of values the instruction pops
        pops: u32,
    },

    // Deferred resolution
    /// The metadata store could not resolve a handle while finalizing fixups.
    #[error("Could not resolve token for item {0}")]
    UnresolvedToken(ItemHandle),

    /// The metadata store rejected an operation.
    #[error("Metadata store error - {0}")]
    Store(String),
}
