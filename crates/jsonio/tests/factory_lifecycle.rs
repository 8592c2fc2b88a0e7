#![allow(missing_docs)]

use jsonio::{
    BufferRecyclerPool, CharBufferKind, ContentReference, IoContextError, JsonEncoding, PoolKind,
    StreamFactory, StreamReadConstraints,
};

#[test]
fn buffers_survive_across_operations() {
    let pool = BufferRecyclerPool::bounded(1);
    let factory = StreamFactory::builder().recycler_pool(pool).build();

    let mut first = factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, true);
    let big = first.alloc_token_buffer_with(10_000).unwrap();
    first.release_token_buffer(big).unwrap();
    first.close();

    let mut second = factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, true);
    assert_eq!(
        second
            .recycler()
            .and_then(|r| r.held_char_buffer_len(CharBufferKind::TokenBuffer)),
        Some(10_000)
    );
    // the recycled buffer satisfies a default-sized request
    assert_eq!(second.alloc_token_buffer().unwrap().len(), 10_000);
}

#[test]
fn non_recycling_factory_starts_fresh_every_time() {
    let factory = StreamFactory::builder()
        .recycler_pool(BufferRecyclerPool::shared_non_recycling())
        .build();
    assert_eq!(factory.recycler_pool().kind(), PoolKind::NonRecycling);

    let mut ctx = factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, false);
    let buf = ctx.alloc_concat_buffer().unwrap();
    ctx.release_concat_buffer(buf).unwrap();
    drop(ctx);

    let ctx = factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, false);
    assert_eq!(
        ctx.recycler()
            .and_then(|r| r.held_char_buffer_len(CharBufferKind::ConcatBuffer)),
        None
    );
}

#[test]
fn closed_context_refuses_work() {
    let factory = StreamFactory::default();
    let mut ctx = factory.new_io_context(ContentReference::raw("stdin"), JsonEncoding::Utf8, true);
    ctx.set_encoding(JsonEncoding::Utf16Be);
    assert_eq!(ctx.encoding(), JsonEncoding::Utf16Be);
    ctx.close();
    assert_eq!(ctx.alloc_read_io_buffer().unwrap_err(), IoContextError::Closed);
    assert_eq!(ctx.alloc_name_copy_buffer(10).unwrap_err(), IoContextError::Closed);
    assert!(ctx.construct_unconstrained_text_buffer().is_err());
    // diagnostics still work
    assert_eq!(
        ctx.content_reference()
            .source_description(ctx.error_report_configuration()),
        "stdin"
    );
}

#[test]
fn rebuilt_factory_applies_new_limits_only_to_new_contexts() {
    let strict = StreamReadConstraints::builder().max_string_length(2).build();
    let lenient = StreamFactory::default();
    let strict_factory = lenient.rebuild().stream_read_constraints(strict).build();

    let mut ctx = lenient.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, true);
    let mut tb = ctx.construct_text_buffer().unwrap();
    assert!(tb.push_str("abc").is_ok());

    let mut ctx =
        strict_factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, true);
    let mut tb = ctx.construct_text_buffer().unwrap();
    assert!(tb.push_str("abc").is_err());
}
