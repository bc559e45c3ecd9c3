//! End to end tests of method body assembly.
//!
//! Each test drives the public builder API, serializes the body and checks the bytes either
//! directly or by parsing them back with `MethodBody`.

use cilemit::{prelude::*, Result};

fn read_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Small linear congruential generator so the sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) as usize) % bound
    }
}

#[test]
fn max_stack_matches_prefix_sums() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let candidates = [
        opcodes::LDC_I4_0,
        opcodes::LDNULL,
        opcodes::DUP,
        opcodes::POP,
        opcodes::ADD,
        opcodes::MUL,
        opcodes::NEG,
        opcodes::CEQ,
        opcodes::NOP,
        opcodes::STELEM_REF,
    ];

    for seed in 0..32 {
        let mut rng = Lcg(seed);
        let mut body = MethodBodyBuilder::with_config(AssemblerConfig::strict());
        let mut depth = 0_i64;
        let mut expected_max = 0_i64;

        for _ in 0..200 {
            let op = candidates[rng.next(candidates.len())];
            let pops = i64::from(op.pop.count().unwrap_or(0));
            let pushes = i64::from(op.push.count().unwrap_or(0));
            if pops > depth {
                continue;
            }

            body.emit(op)?;
            depth += pushes - pops;
            expected_max = expected_max.max(depth);
            assert_eq!(i64::from(body.current_stack()), depth);
        }

        let serialized = body.serialize(&store)?;
        assert_eq!(i64::from(serialized.max_stack), expected_max, "seed {seed}");
    }

    Ok(())
}

#[test]
fn clamped_sequences_never_underestimate() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(16);

    // pop on an empty stack is clamped under the lenient policy
    body.emit(opcodes::POP)?;
    body.emit_ldc_i4(1)?;
    body.emit_ldc_i4(2)?;
    body.emit_ldc_i4(3)?;
    body.emit(opcodes::ADD)?;

    assert_eq!(body.current_stack(), 2);
    assert!(body.serialize(&store)?.max_stack >= 3);
    Ok(())
}

#[test]
fn simple_add_scenario() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(16);
    let mut depths = vec![body.current_stack()];

    body.emit_ldc_i4(1)?;
    depths.push(body.current_stack());
    body.emit_ldc_i4(2)?;
    depths.push(body.current_stack());
    body.emit(opcodes::ADD)?;
    depths.push(body.current_stack());
    body.emit(opcodes::RET)?;
    depths.push(body.current_stack());

    assert_eq!(depths, [0, 1, 2, 1, 0]);
    assert_eq!(body.serialize(&store)?.max_stack, 2);
    Ok(())
}

#[test]
fn branch_displacements_round_trip() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(64);

    // Backward, short form
    let top = body.define_label();
    body.mark_label(top)?;
    body.emit(opcodes::NOP)?;
    let short_at = body.offset()? as usize;
    body.emit_branch(opcodes::BR, top)?;

    // Forward, long form
    let forward = body.define_label();
    let long_at = body.offset()? as usize;
    body.emit_branch(opcodes::BRTRUE_S, forward)?;
    body.emit(opcodes::NOP)?;
    body.emit(opcodes::NOP)?;
    body.mark_label(forward)?;
    let forward_at = body.offset()? as i64;

    // Backward beyond a signed byte, long form
    for _ in 0..150 {
        body.emit(opcodes::NOP)?;
    }
    let far_at = body.offset()? as usize;
    body.emit_branch(opcodes::BR_S, top)?;
    body.emit(opcodes::RET)?;

    let code = body.serialize(&store)?.code;

    assert_eq!(code[short_at], opcodes::BR_S.value as u8);
    let delta = i64::from(code[short_at + 1] as i8);
    assert_eq!(short_at as i64 + 2 + delta, 0);

    assert_eq!(code[long_at], opcodes::BRTRUE.value as u8);
    let delta = i64::from(read_i32(&code, long_at + 1));
    assert_eq!(long_at as i64 + 5 + delta, forward_at);

    assert_eq!(code[far_at], opcodes::BR.value as u8);
    let delta = i64::from(read_i32(&code, far_at + 1));
    assert_eq!(far_at as i64 + 5 + delta, 0);
    Ok(())
}

#[test]
fn forward_branch_keeps_long_form() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(16);

    let target = body.define_label();
    body.emit_branch(opcodes::BR, target)?;
    for _ in 0..130 {
        body.emit(opcodes::NOP)?;
    }
    body.mark_label(target)?;
    body.emit(opcodes::RET)?;

    let code = body.serialize(&store)?.code;
    assert_eq!(code[0], 0x38);
    assert_eq!(read_i32(&code, 1), 130);
    assert_eq!(code.len(), 5 + 130 + 1);
    Ok(())
}

#[test]
fn switch_round_trip() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(32);
    let cases = [body.define_label(), body.define_label(), body.define_label()];

    body.emit_argument(opcodes::LDARG, 0)?;
    body.emit_switch(&cases)?;
    let table_end = body.offset()? as i64;

    let mut marks = Vec::new();
    for case in cases {
        body.mark_label(case)?;
        marks.push(body.offset()? as i64);
        body.emit(opcodes::RET)?;
    }

    let code = body.serialize(&store)?.code;
    assert_eq!(read_u32(&code, 2), 3);
    for (index, mark) in marks.iter().enumerate() {
        let delta = i64::from(read_i32(&code, 6 + index * 4));
        assert_eq!(table_end + delta, *mark);
    }
    Ok(())
}

#[test]
fn label_cannot_be_marked_twice() -> Result<()> {
    let mut body = MethodBodyBuilder::new(16);
    let label = body.define_label();
    body.mark_label(label)?;
    assert!(matches!(
        body.mark_label(label),
        Err(Error::LabelAlreadyMarked(_))
    ));
    Ok(())
}

#[test]
fn serialize_twice_is_identical() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let field = store.declare(TABLE::FIELD);
    let exception = store.declare(TABLE::TYPE_REF);

    let mut body = MethodBodyBuilder::new(32);
    let local = body.declare_local(TypeSignature::String)?;
    body.begin_exception_block()?;
    body.emit_string(&store, "hello")?;
    body.emit_local(opcodes::STLOC, &local)?;
    body.emit_field(&store, opcodes::LDSFLD, field)?;
    body.emit(opcodes::POP)?;
    body.begin_catch(Some(exception))?;
    body.emit(opcodes::POP)?;
    body.end_exception_block()?;
    body.emit(opcodes::RET)?;

    let first = body.serialize(&store)?;
    let second = body.serialize(&store)?;
    assert_eq!(first.to_bytes(), second.to_bytes());
    assert_eq!(first, second);
    Ok(())
}

fn body_with_code_length(length: usize) -> Result<MethodBodyBuilder> {
    let mut body = MethodBodyBuilder::new(64);
    body.emit_ldc_i4(1)?;
    body.emit_ldc_i4(2)?;
    body.emit(opcodes::ADD)?;
    body.emit(opcodes::POP)?;
    while body.code().len() < length - 1 {
        body.emit(opcodes::NOP)?;
    }
    body.emit(opcodes::RET)?;
    assert_eq!(body.code().len(), length);
    Ok(body)
}

#[test]
fn tiny_header_boundary() -> Result<()> {
    let store = InMemoryMetadataStore::new();

    let tiny = body_with_code_length(0x3F)?.serialize(&store)?;
    assert_eq!(tiny.max_stack, 2);
    assert_eq!(tiny.header, vec![(0x3F << 2) | 0x02]);

    let fat = body_with_code_length(0x40)?.serialize(&store)?;
    assert_eq!(fat.header.len(), 12);
    assert_eq!(&fat.header[..4], &[0x13, 0x30, 0x02, 0x00]);
    assert_eq!(read_u32(&fat.header, 4), 0x40);
    assert_eq!(read_u32(&fat.header, 8), 0);

    let parsed = MethodBody::from(&fat.to_bytes())?;
    assert_eq!(parsed.size_code, 0x40);
    assert_eq!(parsed.max_stack, 2);
    Ok(())
}

#[test]
fn deep_stack_forces_fat_header() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(16);
    for value in 0..3 {
        body.emit_ldc_i4(value)?;
    }
    body.emit(opcodes::RET)?;

    let serialized = body.serialize(&store)?;
    assert!(!serialized.is_tiny());
    assert_eq!(serialized.max_stack, 3);
    Ok(())
}

fn try_catch_with_try_length(store: &InMemoryMetadataStore, length: u32) -> Result<SerializedMethodBody> {
    let exception = store.declare_final(Token::new(0x0100_0001));
    let mut body = MethodBodyBuilder::new(512);

    body.begin_exception_block()?;
    // The try block ends with a five byte leave
    for _ in 0..length - 5 {
        body.emit(opcodes::NOP)?;
    }
    body.begin_catch(Some(exception))?;
    body.emit(opcodes::POP)?;
    body.end_exception_block()?;
    body.emit(opcodes::RET)?;

    body.serialize(store)
}

#[test]
fn try_length_boundary() -> Result<()> {
    let store = InMemoryMetadataStore::new();

    let compact = try_catch_with_try_length(&store, 0xFF)?;
    assert_eq!(compact.exceptions[0], 0x01);
    assert_eq!(compact.exceptions.len(), 16);
    let parsed = MethodBody::from(&compact.to_bytes())?;
    assert!(!parsed.is_fat_exception_data);
    assert_eq!(parsed.exception_handlers[0].try_length, 0xFF);

    let wide = try_catch_with_try_length(&store, 0x100)?;
    assert_eq!(wide.exceptions[0], 0x41);
    assert_eq!(wide.exceptions.len(), 28);
    let parsed = MethodBody::from(&wide.to_bytes())?;
    assert!(parsed.is_fat_exception_data);
    assert_eq!(parsed.exception_handlers[0].try_length, 0x100);
    Ok(())
}

fn try_catch_with_handler_span(
    store: &InMemoryMetadataStore,
    span: u32,
) -> Result<SerializedMethodBody> {
    let exception = store.declare_final(Token::new(0x0100_0001));
    let mut body = MethodBodyBuilder::new(512);

    body.begin_exception_block()?;
    body.emit(opcodes::NOP)?;
    body.begin_catch(Some(exception))?;
    // pop, filler, then the five byte leave
    body.emit(opcodes::POP)?;
    for _ in 0..span - 6 {
        body.emit(opcodes::NOP)?;
    }
    body.end_exception_block()?;
    body.emit(opcodes::RET)?;

    body.serialize(store)
}

#[test]
fn handler_span_boundary() -> Result<()> {
    let store = InMemoryMetadataStore::new();

    let compact = try_catch_with_handler_span(&store, 0xFF)?;
    assert_eq!(compact.exceptions[0], 0x01);
    let parsed = MethodBody::from(&compact.to_bytes())?;
    assert_eq!(parsed.exception_handlers[0].handler_length, 0xFF);

    let wide = try_catch_with_handler_span(&store, 0x100)?;
    assert_eq!(wide.exceptions[0], 0x41);
    let parsed = MethodBody::from(&wide.to_bytes())?;
    assert!(parsed.is_fat_exception_data);
    assert_eq!(parsed.exception_handlers[0].handler_length, 0x100);
    Ok(())
}

#[test]
fn try_beyond_64k_is_wide() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let exception = store.declare_final(Token::new(0x0100_0001));
    let mut body = MethodBodyBuilder::new(0x1_0100);

    for _ in 0..0x1_0000 {
        body.emit(opcodes::NOP)?;
    }
    body.begin_exception_block()?;
    body.emit(opcodes::NOP)?;
    body.begin_catch(Some(exception))?;
    body.emit(opcodes::POP)?;
    body.end_exception_block()?;
    body.emit(opcodes::RET)?;

    let serialized = body.serialize(&store)?;
    assert_eq!(serialized.exceptions[0], 0x41);
    let parsed = MethodBody::from(&serialized.to_bytes())?;
    let handler = parsed.exception_handlers[0];
    assert_eq!(handler.try_offset, 0x1_0000);
    assert_eq!(handler.try_length, 6);
    Ok(())
}

#[test]
fn underflowing_add_clamps_after_push() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(16);

    body.emit_ldc_i4(1)?;
    // Pops two with one available, pushes one: the result is clamped to zero
    body.emit(opcodes::ADD)?;
    assert_eq!(body.current_stack(), 0);

    body.emit_ldc_i4(2)?;
    body.emit_ldc_i4(3)?;
    assert_eq!(body.current_stack(), 2);
    body.emit(opcodes::RET)?;

    assert_eq!(body.serialize(&store)?.max_stack, 2);
    Ok(())
}

#[test]
fn explicit_leave_empties_stack() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::with_config(AssemblerConfig::strict());
    let exit = body.define_label();

    body.emit_ldc_i4(1)?;
    body.emit_ldc_i4(2)?;
    body.emit_branch(opcodes::LEAVE, exit)?;
    assert_eq!(body.current_stack(), 0);

    body.mark_label(exit)?;
    assert_eq!(body.current_stack(), 0);
    body.emit(opcodes::RET)?;
    assert_eq!(body.serialize(&store)?.max_stack, 2);
    Ok(())
}

#[test]
fn finalized_catch_type_scenario() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let exception = store.declare(TABLE::TYPE_REF);
    store.seal();
    assert!(store.resolve_token(exception)?.is_final);

    let mut body = MethodBodyBuilder::new(32);
    body.begin_exception_block()?;
    body.emit(opcodes::NOP)?;
    body.begin_catch(Some(exception))?;
    body.emit(opcodes::POP)?;
    body.end_exception_block()?;
    body.emit(opcodes::RET)?;

    let mut serialized = body.serialize(&store)?;
    assert_eq!(serialized.exceptions[0], 0x01);
    assert_eq!(serialized.exception_fixups.len(), 1);
    assert!(serialized.code_fixups.is_empty());

    serialized.finalize(&store)?;
    assert!(!serialized.has_pending_fixups());
    assert_eq!(read_u32(&serialized.exceptions, 12), 0x0100_0001);
    Ok(())
}

#[test]
fn provisional_tokens_are_fixed_up() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let earlier = store.declare(TABLE::METHOD_DEF);
    let callee = MethodRef::new(
        store.declare(TABLE::METHOD_DEF),
        SignatureMethod::new(TypeSignature::I4, vec![TypeSignature::I4]),
    );

    let mut body = MethodBodyBuilder::new(16);
    body.emit_ldc_i4(5)?;
    body.emit_method(&store, opcodes::CALL, &callee)?;
    body.emit(opcodes::RET)?;

    let mut serialized = body.serialize(&store)?;
    assert_eq!(serialized.code_fixups.to_arrays(), (vec![2], vec![callee.handle]));

    assert!(matches!(
        serialized.finalize(&store),
        Err(Error::UnresolvedToken(_))
    ));
    assert!(serialized.has_pending_fixups());

    store.seal();
    serialized.finalize(&store)?;
    assert_eq!(read_u32(&serialized.code, 2), 0x0600_0002);
    assert!(store.resolve_token(earlier)?.is_final);
    Ok(())
}

#[test]
fn nested_regions_are_written_inner_first() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let inner_type = store.declare_final(Token::new(0x0100_0001));
    let outer_type = store.declare_final(Token::new(0x0100_0002));

    let mut body = MethodBodyBuilder::new(64);
    body.begin_exception_block()?;
    body.begin_exception_block()?;
    body.emit(opcodes::NOP)?;
    body.begin_catch(Some(inner_type))?;
    body.emit(opcodes::POP)?;
    body.end_exception_block()?;
    body.begin_catch(Some(outer_type))?;
    body.emit(opcodes::POP)?;
    body.begin_finally()?;
    body.end_exception_block()?;
    body.emit(opcodes::RET)?;

    let serialized = body.serialize(&store)?;
    let parsed = MethodBody::from(&serialized.to_bytes())?;
    let handlers = parsed.exception_handlers;

    assert_eq!(handlers.len(), 3);
    assert_eq!(handlers[0].class_token(), Some(Token::new(0x0100_0001)));
    assert_eq!(handlers[1].class_token(), Some(Token::new(0x0100_0002)));
    assert_eq!(handlers[2].flags, ExceptionHandlerFlags::FINALLY);
    assert_eq!(handlers[1].try_offset, handlers[2].try_offset);
    assert_eq!(handlers[1].try_length, handlers[2].try_length);
    assert!(
        handlers[0].handler_offset + handlers[0].handler_length
            <= handlers[1].try_offset + handlers[1].try_length
    );
    Ok(())
}

#[test]
fn filter_clause_layout() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let mut body = MethodBodyBuilder::new(32);

    body.begin_exception_block()?;
    body.emit(opcodes::NOP)?;
    body.begin_filter()?;
    let filter_at = body.offset()?;
    body.emit(opcodes::POP)?;
    body.emit_ldc_i4(1)?;
    body.begin_catch(None)?;
    let handler_at = body.offset()?;
    body.emit(opcodes::POP)?;
    body.end_exception_block()?;
    body.emit(opcodes::RET)?;

    let serialized = body.serialize(&store)?;
    assert!(serialized.exception_fixups.is_empty());

    let parsed = MethodBody::from(&serialized.to_bytes())?;
    let handler = parsed.exception_handlers[0];
    assert_eq!(handler.flags, ExceptionHandlerFlags::FILTER);
    assert_eq!(handler.filter_offset, filter_at);
    assert_eq!(handler.handler_offset, handler_at);
    assert_eq!(handler.class_token(), None);
    Ok(())
}

#[test]
fn region_misuse_is_reported() -> Result<()> {
    let store = InMemoryMetadataStore::new();
    let exception = store.declare(TABLE::TYPE_REF);
    let mut body = MethodBodyBuilder::new(32);

    assert!(matches!(
        body.begin_finally(),
        Err(Error::NoOpenExceptionBlock)
    ));
    assert!(matches!(
        body.end_exception_block(),
        Err(Error::NoOpenExceptionBlock)
    ));

    body.begin_exception_block()?;
    assert!(matches!(
        body.end_exception_block(),
        Err(Error::NoExceptionClauses)
    ));

    body.begin_finally()?;
    assert!(matches!(
        body.begin_catch(Some(exception)),
        Err(Error::ClauseAfterFinally)
    ));
    assert!(matches!(
        body.serialize(&store),
        Err(Error::UnclosedExceptionBlock(1))
    ));

    body.end_exception_block()?;
    body.emit(opcodes::RET)?;
    assert!(body.serialize(&store).is_ok());
    Ok(())
}
