//! Structured exception handling regions.
//!
//! Regions live in one arena. Open regions form a stack of arena indices (nested `try` blocks,
//! only the innermost one may change); closed regions are appended to a list in the order they
//! are closed, which puts inner regions before the regions enclosing them as the loader
//! expects.
//!
//! Each open region moves through these phases:
//!
//! ```text
//! Try --begin_catch/finally/fault--> Handler --begin_*--> Handler ... --end--> closed
//!  |                                    ^
//!  +--begin_filter--> FilterTest --begin_catch(None)
//! ```
//!
//! Leaving a phase emits its terminator: `leave` to the region end for the `try` block and for
//! catch or filter handlers, `endfilter` for a filter test and `endfinally` for finally and
//! fault handlers.

use crate::{
    assembly::{opcodes, InstructionEncoder, Label},
    metadata::{method::ExceptionHandlerFlags, store::ItemHandle},
    Error, Result,
};

/// The kind of a handler clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    /// Handles exceptions of one type
    Catch,
    /// Handles exceptions accepted by a filter expression
    Filter,
    /// Runs on every exit from the `try` block
    Finally,
    /// Runs when the `try` block exits with an exception
    Fault,
}

impl ClauseKind {
    /// Flags of the exception section record
    #[must_use]
    pub fn flags(&self) -> ExceptionHandlerFlags {
        match self {
            ClauseKind::Catch => ExceptionHandlerFlags::EXCEPTION,
            ClauseKind::Filter => ExceptionHandlerFlags::FILTER,
            ClauseKind::Finally => ExceptionHandlerFlags::FINALLY,
            ClauseKind::Fault => ExceptionHandlerFlags::FAULT,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, ClauseKind::Finally | ClauseKind::Fault)
    }
}

/// A completed handler clause of a closed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionClause {
    /// Kind of the handler
    pub kind: ClauseKind,
    /// First byte of the handler
    pub handler_begin: u32,
    /// First byte after the handler, including its terminator
    pub handler_end: u32,
    /// Caught type of a catch clause
    pub catch_type: Option<ItemHandle>,
    /// First byte of the filter expression of a filter clause, zero otherwise
    pub filter_begin: u32,
}

/// A closed `try` region with its handlers in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRegion {
    /// First byte of the `try` block
    pub try_begin: u32,
    /// First byte after the `leave` that ends the `try` block
    pub try_end: u32,
    /// First byte after the last handler
    pub end_last_clause: u32,
    /// Handler clauses
    pub clauses: Vec<ExceptionClause>,
}

impl ExceptionRegion {
    /// Returns true if this region's offsets need the wide exception section layout.
    #[must_use]
    pub fn needs_wide(&self) -> bool {
        self.try_begin > 0xFFFF
            || self.try_end > 0xFFFF
            || self.try_end - self.try_begin > 0xFF
            || self.end_last_clause.saturating_sub(self.try_end) > 0xFF
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenHandler {
    kind: ClauseKind,
    begin: u32,
    catch_type: Option<ItemHandle>,
    filter_begin: u32,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Try,
    FilterTest { filter_begin: u32 },
    Handler(OpenHandler),
}

#[derive(Debug, Clone)]
struct RegionSlot {
    begin: u32,
    end_try: u32,
    end_last_clause: u32,
    end_label: Label,
    clauses: Vec<ExceptionClause>,
    phase: Phase,
}

/// Arena of open and closed exception regions of one method body.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExceptionRegions {
    arena: Vec<RegionSlot>,
    open: Vec<usize>,
    closed: Vec<usize>,
}

impl ExceptionRegions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of regions that were begun but not ended
    pub(crate) fn open_count(&self) -> usize {
        self.open.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.closed.is_empty()
    }

    /// Closed regions in closing order
    pub(crate) fn closed(&self) -> Vec<ExceptionRegion> {
        self.closed
            .iter()
            .filter_map(|&index| self.arena.get(index))
            .map(|slot| ExceptionRegion {
                try_begin: slot.begin,
                try_end: slot.end_try,
                end_last_clause: slot.end_last_clause,
                clauses: slot.clauses.clone(),
            })
            .collect()
    }

    fn top(&self) -> Result<usize> {
        self.open.last().copied().ok_or(Error::NoOpenExceptionBlock)
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut RegionSlot> {
        self.arena
            .get_mut(index)
            .ok_or(Error::NoOpenExceptionBlock)
    }

    /// Opens a new `try` block at the current offset and returns the label marking its end.
    pub(crate) fn begin(&mut self, encoder: &mut InstructionEncoder) -> Result<Label> {
        let end_label = encoder.define_label();
        let begin = encoder.offset()?;

        self.arena.push(RegionSlot {
            begin,
            end_try: begin,
            end_last_clause: begin,
            end_label,
            clauses: Vec::new(),
            phase: Phase::Try,
        });
        self.open.push(self.arena.len() - 1);

        Ok(end_label)
    }

    /// Ends the current phase of the innermost region and starts a handler of `kind`.
    pub(crate) fn begin_clause(
        &mut self,
        encoder: &mut InstructionEncoder,
        kind: ClauseKind,
        catch_type: Option<ItemHandle>,
    ) -> Result<()> {
        let index = self.top()?;
        let phase = self.slot_mut(index)?.phase;

        match phase {
            Phase::Handler(open) if open.kind.is_terminal() => {
                return Err(Error::ClauseAfterFinally)
            }
            Phase::FilterTest { filter_begin } => {
                if kind != ClauseKind::Catch || catch_type.is_some() {
                    return Err(Error::InvalidFilterTransition(
                        "a filter must be followed by an untyped catch handler".to_string(),
                    ));
                }

                encoder.emit(opcodes::ENDFILTER)?;
                let begin = encoder.offset()?;
                self.slot_mut(index)?.phase = Phase::Handler(OpenHandler {
                    kind: ClauseKind::Filter,
                    begin,
                    catch_type: None,
                    filter_begin,
                });
                encoder.reset_stack(0);
                return Ok(());
            }
            _ => {}
        }

        if kind == ClauseKind::Catch && catch_type.is_none() {
            return Err(Error::InvalidFilterTransition(
                "an untyped catch handler must follow a filter".to_string(),
            ));
        }

        self.terminate(encoder, index)?;

        let begin = encoder.offset()?;
        let slot = self.slot_mut(index)?;
        slot.phase = match kind {
            ClauseKind::Filter => Phase::FilterTest {
                filter_begin: begin,
            },
            _ => Phase::Handler(OpenHandler {
                kind,
                begin,
                catch_type,
                filter_begin: 0,
            }),
        };

        if kind.is_terminal() {
            encoder.reset_stack(1);
        }
        Ok(())
    }

    /// Terminates the last handler, marks the region end and closes the innermost region.
    pub(crate) fn end(&mut self, encoder: &mut InstructionEncoder) -> Result<()> {
        let index = self.top()?;
        let slot = self.slot_mut(index)?;

        match slot.phase {
            Phase::Try => return Err(Error::NoExceptionClauses),
            Phase::FilterTest { .. } => {
                return Err(Error::InvalidFilterTransition(
                    "the filter has no handler".to_string(),
                ))
            }
            Phase::Handler(_) => {}
        }
        let end_label = slot.end_label;

        self.terminate(encoder, index)?;
        encoder.mark_label(end_label)?;

        self.open.pop();
        self.closed.push(index);
        Ok(())
    }

    /// Emits the terminator of the current phase and records where it ends.
    fn terminate(&mut self, encoder: &mut InstructionEncoder, index: usize) -> Result<()> {
        let slot = self.slot_mut(index)?;
        let end_label = slot.end_label;
        let phase = slot.phase;

        match phase {
            Phase::Try => {
                encoder.emit_branch(opcodes::LEAVE, end_label)?;
                let end = encoder.offset()?;
                let slot = self.slot_mut(index)?;
                slot.end_try = end;
                slot.end_last_clause = end;
            }
            Phase::Handler(open) => {
                match open.kind {
                    ClauseKind::Catch | ClauseKind::Filter => {
                        encoder.emit_branch(opcodes::LEAVE, end_label)?;
                    }
                    ClauseKind::Finally | ClauseKind::Fault => encoder.emit(opcodes::ENDFINALLY)?,
                }

                let end = encoder.offset()?;
                let slot = self.slot_mut(index)?;
                slot.clauses.push(ExceptionClause {
                    kind: open.kind,
                    handler_begin: open.begin,
                    handler_end: end,
                    catch_type: open.catch_type,
                    filter_begin: open.filter_begin,
                });
                slot.end_last_clause = end;
            }
            Phase::FilterTest { .. } => {
                return Err(Error::InvalidFilterTransition(
                    "the filter has no handler".to_string(),
                ))
            }
        }

        encoder.reset_stack(0);
        Ok(())
    }
}
