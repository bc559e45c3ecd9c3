//! Evaluation stack depth tracking.

use log::warn;

use crate::{builder::StackPolicy, Error, Result};

/// Current and maximum evaluation stack depth of a method body.
///
/// `current` never drops below zero: an instruction popping more than is available is either
/// clamped (lenient) or rejected (strict). `max` only grows and becomes the header's max stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackDepth {
    current: u32,
    max: u32,
    policy: StackPolicy,
}

impl StackDepth {
    /// Creates an empty stack tracker
    #[must_use]
    pub fn new(policy: StackPolicy) -> Self {
        StackDepth {
            current: 0,
            max: 0,
            policy,
        }
    }

    /// Depth at the current position
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Deepest depth seen so far
    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Applies the effect of one instruction at code `offset`.
    ///
    /// # Errors
    /// Returns [`Error::StackUnderflow`] under [`StackPolicy::Strict`] when `pops` exceeds the
    /// current depth.
    pub fn apply(&mut self, pops: u32, pushes: u32, offset: u32) -> Result<()> {
        if pops > self.current {
            match self.policy {
                StackPolicy::Strict => {
                    return Err(Error::StackUnderflow {
                        offset,
                        depth: self.current,
                        pops,
                    })
                }
                StackPolicy::Lenient => warn!(
                    "Stack underflow at IL_{:04X}: depth {}, pops {} - clamped to 0",
                    offset, self.current, pops
                ),
            }
        }

        // Pops and pushes are applied together, the clamp comes last
        let depth = i64::from(self.current) - i64::from(pops) + i64::from(pushes);
        self.current = u32::try_from(depth.max(0)).unwrap_or(u32::MAX);
        self.max = self.max.max(self.current);
        Ok(())
    }

    /// Sets the depth, e.g. at the start of an exception handler
    pub fn reset(&mut self, depth: u32) {
        self.current = depth;
        self.max = self.max.max(depth);
    }

    /// Raises the depth to at least `depth`, e.g. when a branch target is marked
    pub fn raise_to(&mut self, depth: u32) {
        if depth > self.current {
            self.reset(depth);
        }
    }
}
