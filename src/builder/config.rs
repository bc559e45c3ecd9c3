//! Assembler configuration for method body construction.

use crate::assembly::MIN_CODE_CAPACITY;

/// How the emitter reacts to an instruction that pops more values than the stack holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackPolicy {
    /// Clamp the depth to zero, log a warning and continue
    #[default]
    Lenient,
    /// Reject the instruction with [`crate::Error::StackUnderflow`]
    Strict,
}

/// Configuration for one method body builder
///
/// # Examples
///
/// ```rust
/// use cilemit::builder::{AssemblerConfig, MethodBodyBuilder, StackPolicy};
///
/// let config = AssemblerConfig {
///     stack_policy: StackPolicy::Strict,
///     ..AssemblerConfig::default()
/// };
/// let mut body = MethodBodyBuilder::with_config(config);
/// assert!(body.emit(cilemit::assembly::opcodes::POP).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Initial code buffer size hint in bytes, raised to at least 16
    pub initial_capacity: usize,

    /// Set the init-locals flag in the fat header so locals are zero-initialized (default: true)
    pub init_locals: bool,

    /// Reaction to stack underflow (default: lenient)
    pub stack_policy: StackPolicy,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            init_locals: true,
            stack_policy: StackPolicy::Lenient,
        }
    }
}

impl AssemblerConfig {
    /// Default configuration with the given code buffer size hint
    #[must_use]
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity: initial_capacity.max(MIN_CODE_CAPACITY),
            ..Self::default()
        }
    }

    /// Configuration that rejects stack underflow instead of clamping it
    #[must_use]
    pub fn strict() -> Self {
        Self {
            stack_policy: StackPolicy::Strict,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AssemblerConfig::default();
        assert!(config.init_locals);
        assert_eq!(config.stack_policy, StackPolicy::Lenient);
        assert_eq!(AssemblerConfig::with_capacity(3).initial_capacity, MIN_CODE_CAPACITY);
        assert_eq!(AssemblerConfig::with_capacity(256).initial_capacity, 256);
        assert_eq!(AssemblerConfig::strict().stack_policy, StackPolicy::Strict);
    }
}
