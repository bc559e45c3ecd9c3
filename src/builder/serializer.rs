//! Method body serialization (ECMA-335 II.25.4).
//!
//! Turns the state of a finished builder into the three byte ranges a module writer places in
//! the image: the method header, the code, and the exception handling section.
//!
//! # Header selection
//!
//! The one byte tiny header is used when the code is shorter than 64 bytes, the method has no
//! locals and no exception handlers, and the stack never grows beyond two values. Everything
//! else gets the 12 byte fat header.
//!
//! # Exception section selection
//!
//! Handlers are written in the compact layout (12 bytes per clause) unless any region or clause
//! exceeds its 16/8-bit fields or the compact section would outgrow its one byte size field; in
//! that case the whole section switches to the wide layout (24 bytes per clause).

use log::debug;

use crate::{
    assembly::{InstructionEncoder, TokenFixups},
    builder::{
        locals::LocalTable,
        regions::{ClauseKind, ExceptionRegion, ExceptionRegions},
        AssemblerConfig,
    },
    metadata::{
        method::{
            ExceptionHandler, MethodBodyFlags, SectionFlags, FAT_HEADER_SIZE_DWORDS,
            TINY_CODE_SIZE_LIMIT, TINY_MAX_STACK,
        },
        store::{ItemHandle, MetadataStore},
    },
    utils::{push_le, to_u32},
    Error, Result,
};

/// Maximum stack depth assumed for caller-assembled code.
const EXPLICIT_MAX_STACK: u16 = 8;

/// Largest size the three byte length of a wide exception section can express.
const MAX_WIDE_SECTION_SIZE: usize = 0x00FF_FFFF;

/// The serialized form of one method body.
///
/// Token fixup offsets are relative to the start of `code` and `exceptions` respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedMethodBody {
    /// Tiny or fat method header
    pub header: Vec<u8>,
    /// CIL code
    pub code: Vec<u8>,
    /// Exception handling section, empty without handlers
    pub exceptions: Vec<u8>,
    /// Provisional tokens inside `code`
    pub code_fixups: TokenFixups,
    /// Catch class tokens inside `exceptions`
    pub exception_fixups: TokenFixups,
    /// Deepest evaluation stack depth of the code
    pub max_stack: u32,
}

impl SerializedMethodBody {
    /// Wraps already assembled code with a fat header.
    ///
    /// Uses a max stack of 8, no locals and no exception section.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the code exceeds the 32-bit size field.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cilemit::builder::SerializedMethodBody;
    ///
    /// let body = SerializedMethodBody::from_explicit(&[0x00, 0x2A])?;
    /// assert_eq!(body.header, vec![0x03, 0x30, 0x08, 0x00, 0x02, 0, 0, 0, 0, 0, 0, 0]);
    /// assert_eq!(body.to_bytes().len(), 14);
    /// # Ok::<(), cilemit::Error>(())
    /// ```
    pub fn from_explicit(code: &[u8]) -> Result<Self> {
        let header = fat_header(
            MethodBodyFlags::FAT_FORMAT,
            EXPLICIT_MAX_STACK,
            to_u32(code.len())?,
            0,
        );

        Ok(SerializedMethodBody {
            header,
            code: code.to_vec(),
            exceptions: Vec::new(),
            code_fixups: TokenFixups::new(),
            exception_fixups: TokenFixups::new(),
            max_stack: u32::from(EXPLICIT_MAX_STACK),
        })
    }

    /// Returns true if the header is the one byte tiny form
    #[must_use]
    pub fn is_tiny(&self) -> bool {
        self.header.len() == 1
    }

    /// Returns true if any token placeholder is still waiting for [`SerializedMethodBody::finalize`]
    #[must_use]
    pub fn has_pending_fixups(&self) -> bool {
        !self.code_fixups.is_empty() || !self.exception_fixups.is_empty()
    }

    /// Concatenates header, code and exception section as laid out in the image.
    ///
    /// The exception section starts at the next 4-byte boundary after the code.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(self.header.len() + self.code.len() + self.exceptions.len() + 3);
        bytes.extend_from_slice(&self.header);
        bytes.extend_from_slice(&self.code);

        if !self.exceptions.is_empty() {
            let aligned = (bytes.len() + 3) & !3;
            bytes.resize(aligned, 0);
            bytes.extend_from_slice(&self.exceptions);
        }

        bytes
    }

    /// Rewrites every recorded token placeholder with its final token and empties both ledgers.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedToken`] if the store has no final token for a
    /// recorded item. The ledgers are kept in that case so `finalize` can be retried.
    pub fn finalize(&mut self, store: &dyn MetadataStore) -> Result<()> {
        let (offsets, items) = self.code_fixups.to_arrays();
        store.finalize_fixups(&mut self.code, &offsets, &items)?;

        let (offsets, items) = self.exception_fixups.to_arrays();
        store.finalize_fixups(&mut self.exceptions, &offsets, &items)?;

        self.code_fixups.clear();
        self.exception_fixups.clear();
        Ok(())
    }
}

fn fat_header(flags: MethodBodyFlags, max_stack: u16, code_size: u32, local_sig: u32) -> Vec<u8> {
    let mut header = Vec::with_capacity(12);
    push_le(&mut header, flags.bits() | (FAT_HEADER_SIZE_DWORDS << 12));
    push_le(&mut header, max_stack);
    push_le(&mut header, code_size);
    push_le(&mut header, local_sig);
    header
}

/// Serializes the state of a builder.
pub(crate) fn serialize_body(
    encoder: &InstructionEncoder,
    locals: &LocalTable,
    regions: &ExceptionRegions,
    config: &AssemblerConfig,
    store: &dyn MetadataStore,
) -> Result<SerializedMethodBody> {
    if regions.open_count() > 0 {
        return Err(Error::UnclosedExceptionBlock(regions.open_count()));
    }
    if let Some(label) = encoder.labels().first_dangling() {
        return Err(Error::InvalidBranch(format!(
            "{label} is the target of a branch but was never marked"
        )));
    }

    let code = encoder.code();
    let max_stack = encoder.max_stack();

    let local_sig = match locals.encode()? {
        Some(blob) => store.signature_token(&blob)?.value(),
        None => 0,
    };

    let (exceptions, exception_fixups) = exception_section(&regions.closed(), store)?;

    let header = if code.len() < TINY_CODE_SIZE_LIMIT
        && locals.is_empty()
        && regions.is_empty()
        && max_stack <= TINY_MAX_STACK
    {
        debug!(
            "Tiny header for {} code bytes, max stack {}",
            code.len(),
            max_stack
        );
        // Tiny bodies are below 64 bytes
        #[allow(clippy::cast_possible_truncation)]
        let tiny = ((code.len() as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8;
        vec![tiny]
    } else {
        let mut flags = MethodBodyFlags::FAT_FORMAT;
        if config.init_locals {
            flags |= MethodBodyFlags::INIT_LOCALS;
        }
        if !exceptions.is_empty() {
            flags |= MethodBodyFlags::MORE_SECTS;
        }

        debug!(
            "Fat header for {} code bytes, max stack {}, {} locals, flags {:?}",
            code.len(),
            max_stack,
            locals.len(),
            flags
        );
        let stack = u16::try_from(max_stack).map_err(|_| Error::StackOverflow(max_stack))?;
        fat_header(flags, stack, to_u32(code.len())?, local_sig)
    };

    Ok(SerializedMethodBody {
        header,
        code: code.to_vec(),
        exceptions,
        code_fixups: encoder.fixups().clone(),
        exception_fixups,
        max_stack,
    })
}

/// Builds the exception handling section of all closed regions.
fn exception_section(
    regions: &[ExceptionRegion],
    store: &dyn MetadataStore,
) -> Result<(Vec<u8>, TokenFixups)> {
    let mut fixups = TokenFixups::new();
    if regions.is_empty() {
        return Ok((Vec::new(), fixups));
    }

    // Regions arrive in closing order, so nested regions precede the regions enclosing them.
    // Clauses of one region keep the order they were declared in: the runtime tries handlers
    // in table order, so a region's first catch must stay first.
    let mut handlers: Vec<(ExceptionHandler, Option<ItemHandle>)> = Vec::new();
    for region in regions {
        for clause in &region.clauses {
            let (last_field, class_item) = match clause.kind {
                ClauseKind::Catch => {
                    let item = clause.catch_type.ok_or_else(|| {
                        Error::InvalidFilterTransition("catch clause without a type".to_string())
                    })?;
                    (store.resolve_token(item)?.token.value(), Some(item))
                }
                ClauseKind::Filter => (clause.filter_begin, None),
                ClauseKind::Finally | ClauseKind::Fault => (0, None),
            };

            handlers.push((
                ExceptionHandler {
                    flags: clause.kind.flags(),
                    try_offset: region.try_begin,
                    try_length: region.try_end - region.try_begin,
                    handler_offset: clause.handler_begin,
                    handler_length: clause.handler_end - clause.handler_begin,
                    filter_offset: last_field,
                },
                class_item,
            ));
        }
    }

    let compact_size = handlers.len() * 12 + 4;
    let wide = compact_size > 0xFF
        || regions.iter().any(ExceptionRegion::needs_wide)
        || handlers.iter().any(|(handler, _)| !handler.fits_compact());

    let mut section;
    if wide {
        let size = handlers.len() * 24 + 4;
        if size > MAX_WIDE_SECTION_SIZE {
            return Err(Error::SectionTooLarge(format!(
                "{} exception clauses need {size} bytes",
                handlers.len()
            )));
        }

        section = Vec::with_capacity(size);
        // Three byte size follows the kind byte
        push_le(
            &mut section,
            u32::from((SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT).bits()) | (to_u32(size)? << 8),
        );
        for (handler, class_item) in &handlers {
            push_le(&mut section, u32::from(handler.flags.bits()));
            push_le(&mut section, handler.try_offset);
            push_le(&mut section, handler.try_length);
            push_le(&mut section, handler.handler_offset);
            push_le(&mut section, handler.handler_length);
            if let Some(item) = class_item {
                fixups.register(to_u32(section.len())?, *item);
            }
            push_le(&mut section, handler.filter_offset);
        }
    } else {
        section = Vec::with_capacity(compact_size);
        section.push(SectionFlags::EHTABLE.bits());
        // Checked against 0xFF above
        #[allow(clippy::cast_possible_truncation)]
        section.push(compact_size as u8);
        section.extend_from_slice(&[0, 0]);

        // Every field fits, checked by fits_compact
        #[allow(clippy::cast_possible_truncation)]
        for (handler, class_item) in &handlers {
            push_le(&mut section, handler.flags.bits());
            push_le(&mut section, handler.try_offset as u16);
            push_le(&mut section, handler.try_length as u8);
            push_le(&mut section, handler.handler_offset as u16);
            push_le(&mut section, handler.handler_length as u8);
            if let Some(item) = class_item {
                fixups.register(to_u32(section.len())?, *item);
            }
            push_le(&mut section, handler.filter_offset);
        }
    }

    debug!(
        "{} exception section with {} clauses in {} regions",
        if wide { "Wide" } else { "Compact" },
        handlers.len(),
        regions.len()
    );

    Ok((section, fixups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{regions::ExceptionClause, StackPolicy},
        metadata::{
            method::{ExceptionHandlerFlags, MethodBody},
            store::InMemoryMetadataStore,
            token::Token,
        },
        utils::read_le,
    };

    fn catch_region(store: &InMemoryMetadataStore, try_length: u32) -> ExceptionRegion {
        ExceptionRegion {
            try_begin: 0,
            try_end: try_length,
            end_last_clause: try_length + 6,
            clauses: vec![ExceptionClause {
                kind: ClauseKind::Catch,
                handler_begin: try_length,
                handler_end: try_length + 6,
                catch_type: Some(store.declare_final(Token::new(0x0100_0002))),
                filter_begin: 0,
            }],
        }
    }

    #[test]
    fn compact_section() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let (section, fixups) = exception_section(&[catch_region(&store, 0x20)], &store)?;

        assert_eq!(section.len(), 16);
        assert_eq!(&section[..4], &[0x01, 0x10, 0x00, 0x00]);
        assert_eq!(read_le::<u16>(&section[6..])?, 0);
        assert_eq!(section[8], 0x20);
        assert_eq!(read_le::<u16>(&section[9..])?, 0x20);
        assert_eq!(section[11], 6);
        assert_eq!(read_le::<u32>(&section[12..])?, 0x0100_0002);

        // Final catch types still get an exception fixup
        assert_eq!(fixups.to_arrays().0, vec![12]);
        Ok(())
    }

    #[test]
    fn long_try_switches_to_wide() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let (section, fixups) = exception_section(&[catch_region(&store, 0x100)], &store)?;

        assert_eq!(section.len(), 28);
        assert_eq!(&section[..4], &[0x41, 0x1C, 0x00, 0x00]);
        assert_eq!(read_le::<u32>(&section[8..])?, 0);
        assert_eq!(read_le::<u32>(&section[12..])?, 0x100);
        assert_eq!(read_le::<u32>(&section[24..])?, 0x0100_0002);
        assert_eq!(fixups.to_arrays().0, vec![24]);
        Ok(())
    }

    #[test]
    fn many_clauses_switch_to_wide() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let regions: Vec<ExceptionRegion> = (0..21).map(|_| catch_region(&store, 4)).collect();
        let (section, fixups) = exception_section(&regions, &store)?;

        // 21 * 12 + 4 = 256 no longer fits the compact size byte
        assert_eq!(section[0], 0x41);
        assert_eq!(section.len(), 21 * 24 + 4);
        assert_eq!(fixups.len(), 21);

        let regions: Vec<ExceptionRegion> = (0..20).map(|_| catch_region(&store, 4)).collect();
        let (section, _) = exception_section(&regions, &store)?;
        assert_eq!(section[0], 0x01);
        assert_eq!(section[1], 244);
        Ok(())
    }

    #[test]
    fn explicit_body_parses() -> Result<()> {
        let body = SerializedMethodBody::from_explicit(&[0x00, 0x00, 0x2A])?;
        assert!(!body.is_tiny());
        assert!(!body.has_pending_fixups());

        let bytes = body.to_bytes();
        let parsed = MethodBody::from(&bytes)?;
        assert!(parsed.is_fat);
        assert!(!parsed.is_init_local);
        assert_eq!(parsed.max_stack, 8);
        assert_eq!(parsed.code(&bytes)?, &[0x00, 0x00, 0x2A]);
        Ok(())
    }

    #[test]
    fn padded_exception_section() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let mut encoder = InstructionEncoder::new(16, StackPolicy::Lenient);
        let mut regions = ExceptionRegions::new();
        let locals = LocalTable::new();

        regions.begin(&mut encoder)?;
        encoder.emit(crate::assembly::opcodes::NOP)?;
        regions.begin_clause(&mut encoder, ClauseKind::Fault, None)?;
        regions.end(&mut encoder)?;
        encoder.emit(crate::assembly::opcodes::RET)?;

        let body = serialize_body(
            &encoder,
            &locals,
            &regions,
            &AssemblerConfig::default(),
            &store,
        )?;
        assert_eq!(body.code.len(), 8);
        assert_eq!(body.header[0], 0x1B);

        let bytes = body.to_bytes();
        assert_eq!(bytes.len(), 12 + 8 + 16);

        let parsed = MethodBody::from(&bytes)?;
        assert_eq!(parsed.exception_handlers.len(), 1);
        assert_eq!(
            parsed.exception_handlers[0].flags,
            ExceptionHandlerFlags::FAULT
        );
        assert_eq!(parsed.exception_handlers[0].handler_offset, 6);
        assert_eq!(parsed.exception_handlers[0].handler_length, 1);
        Ok(())
    }

    #[test]
    fn open_region_is_rejected() -> Result<()> {
        let store = InMemoryMetadataStore::new();
        let mut encoder = InstructionEncoder::new(16, StackPolicy::Lenient);
        let mut regions = ExceptionRegions::new();
        regions.begin(&mut encoder)?;

        let result = serialize_body(
            &encoder,
            &LocalTable::new(),
            &regions,
            &AssemblerConfig::default(),
            &store,
        );
        assert!(matches!(result, Err(Error::UnclosedExceptionBlock(1))));
        Ok(())
    }
}
