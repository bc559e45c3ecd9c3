//! Branch targets and the backpatch bookkeeping behind them.
//!
//! A [`Label`] is an index into the [`LabelTable`] arena, never an offset. Each slot records
//! the resolved offset once marked, the deepest stack height of any branch to it and the
//! placeholder locations still waiting for the offset.

use std::fmt;

use crate::{Error, Result};

/// Opaque branch target handle issued by `define_label`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(usize);

impl Label {
    /// Position of the label in its method body's label table
    #[must_use]
    pub fn id(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A 4-byte relative offset placeholder waiting for its label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchRef {
    /// Offset of the placeholder within the code
    pub patch_offset: u32,
    /// End of the switch table for switch entries; `None` for ordinary branches
    pub table_base: Option<u32>,
}

impl BranchRef {
    /// The offset the relative displacement is measured from
    #[must_use]
    pub fn base(&self) -> u32 {
        self.table_base.unwrap_or(self.patch_offset + 4)
    }
}

#[derive(Clone, Debug, Default)]
struct LabelSlot {
    resolved_offset: Option<u32>,
    stack_height: u32,
    pending: Vec<BranchRef>,
}

/// Arena of labels of one method body.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    slots: Vec<LabelSlot>,
}

impl LabelTable {
    /// Creates an empty table
    #[must_use]
    pub fn new() -> Self {
        LabelTable { slots: Vec::new() }
    }

    /// Allocates a fresh, unresolved label
    pub fn define(&mut self) -> Label {
        self.slots.push(LabelSlot::default());
        Label(self.slots.len() - 1)
    }

    /// Number of labels defined
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no label has been defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, label: Label) -> Result<&LabelSlot> {
        self.slots.get(label.0).ok_or(Error::InvalidLabel(label.0))
    }

    fn slot_mut(&mut self, label: Label) -> Result<&mut LabelSlot> {
        self.slots.get_mut(label.0).ok_or(Error::InvalidLabel(label.0))
    }

    /// Code offset of a marked label, `None` while unresolved.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLabel`] for a label of another body.
    pub fn resolved_offset(&self, label: Label) -> Result<Option<u32>> {
        Ok(self.slot(label)?.resolved_offset)
    }

    /// Records the stack height a branch arrives with; the label keeps the deepest.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLabel`] for a label of another body.
    pub fn note_height(&mut self, label: Label, height: u32) -> Result<()> {
        let slot = self.slot_mut(label)?;
        slot.stack_height = slot.stack_height.max(height);
        Ok(())
    }

    /// Queues a placeholder to be patched when `label` is marked.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLabel`] for a label of another body.
    pub fn add_ref(&mut self, label: Label, branch: BranchRef) -> Result<()> {
        self.slot_mut(label)?.pending.push(branch);
        Ok(())
    }

    /// Resolves `label` to `offset`, handing back the recorded stack height and every pending
    /// placeholder.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLabel`] for a label of another body and
    /// [`Error::LabelAlreadyMarked`] if the label was marked before.
    pub fn mark(&mut self, label: Label, offset: u32) -> Result<(u32, Vec<BranchRef>)> {
        let slot = self.slot_mut(label)?;
        if slot.resolved_offset.is_some() {
            return Err(Error::LabelAlreadyMarked(label.0));
        }

        slot.resolved_offset = Some(offset);
        Ok((slot.stack_height, std::mem::take(&mut slot.pending)))
    }

    /// First label that is still referenced by a placeholder but was never marked
    #[must_use]
    pub fn first_dangling(&self) -> Option<Label> {
        self.slots
            .iter()
            .position(|slot| slot.resolved_offset.is_none() && !slot.pending.is_empty())
            .map(Label)
    }
}
