//! Drives [`TextBuffer`] the way a tokenizer does: writing straight into the
//! tail segment and committing lengths, instead of appending.

use rstest::rstest;

use crate::{
    BigDecimal, BufferRecyclerPool, ContentReference, Error, JsonEncoding, StreamConstraintsError,
    StreamFactory, StreamReadConstraints, TextBuffer,
};

/// Copies `input` into `tb` segment by segment, as a tokenizer would.
fn tokenize_into(tb: &mut TextBuffer, input: &str) -> Result<(), StreamConstraintsError> {
    let mut segment = tb.empty_and_get_current_segment();
    let mut used = 0;
    for c in input.chars() {
        if used == segment.len() {
            segment = tb.finish_current_segment()?;
            used = 0;
        }
        segment[used] = c;
        used += 1;
    }
    tb.set_current_length(used)
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(199)]
#[case(200)]
#[case(201)]
#[case(5_000)]
fn tokenizer_writes_round_trip(#[case] len: usize) {
    let input: String = (0..len)
        .map(|i| char::from(b'a' + u8::try_from(i % 26).unwrap()))
        .collect();
    let factory = StreamFactory::builder()
        .recycler_pool(BufferRecyclerPool::non_recycling())
        .build();
    let mut ctx = factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, false);
    let mut tb = ctx.construct_text_buffer().unwrap();

    tokenize_into(&mut tb, &input).unwrap();
    assert_eq!(tb.len(), len);
    assert_eq!(tb.contents_as_string().unwrap(), input);
    ctx.release_text_buffer(tb);
}

#[test]
fn tokenizer_writes_are_limited() {
    let constraints = StreamReadConstraints::builder()
        .max_string_length(600)
        .build();
    let mut tb = TextBuffer::with_constraints(constraints);
    let err = tokenize_into(&mut tb, &"x".repeat(2_000)).unwrap_err();
    assert_eq!(err.limit(), 600);
    assert!(tb.has_overflowed());
    assert!(tb.contents_as_chars().is_err());

    // a reset clears the overflow
    tokenize_into(&mut tb, "short").unwrap();
    assert_eq!(tb.contents_as_string().unwrap(), "short");
}

#[test]
fn expanded_segment_keeps_written_prefix() {
    let mut tb = TextBuffer::unconstrained();
    let segment = tb.empty_and_get_current_segment();
    let before = segment.len();
    segment[..3].copy_from_slice(&['1', '.', '5']);
    let expanded = tb.expand_current_segment();
    assert!(expanded.len() > before);
    assert_eq!(&expanded[..3], &['1', '.', '5']);
    tb.set_current_length(3).unwrap();

    let value = tb
        .contents_as_big_decimal(&crate::NumberParser::default())
        .unwrap();
    assert_eq!(value, BigDecimal::new(15.into(), 1));
}

#[test]
fn number_content_is_length_guarded() {
    let factory = StreamFactory::builder()
        .stream_read_constraints(StreamReadConstraints::builder().max_number_length(4).build())
        .build();
    let mut ctx = factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, false);
    let mut tb = ctx.construct_text_buffer().unwrap();
    tb.push_str("12345").unwrap();
    let parser = ctx.number_parser().with_fast_parser(true);
    assert!(matches!(
        tb.contents_as_big_integer(&parser),
        Err(Error::Number(_))
    ));
    tb.reset_with_str("1234").unwrap();
    assert_eq!(tb.contents_as_big_integer(&parser).unwrap(), 1234.into());
}
