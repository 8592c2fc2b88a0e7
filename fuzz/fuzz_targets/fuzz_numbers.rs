#![no_main]
use arbitrary::Arbitrary;
use jsonio::{NumberParseError, NumberParser};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    max_length: u16,
    text: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let max = usize::from(input.max_length);
    let parser = NumberParser::default().with_max_length(max);
    let text = input.text;

    let reference = parser.big_integer_reference(text);
    let fast = parser.big_integer_fast(text);
    assert_eq!(reference, fast, "integer paths disagree on {text:?}");

    let reference = parser.big_decimal_reference(text);
    let fast = parser.big_decimal_fast(text);
    match (&reference, &fast) {
        // compare unscaled value and scale; equality across scales would
        // materialise 10^|exponent|
        (Ok(r), Ok(f)) => assert_eq!(
            r.as_bigint_and_exponent(),
            f.as_bigint_and_exponent(),
            "decimal paths disagree on {text:?}"
        ),
        (Err(r), Err(f)) => assert_eq!(r, f),
        _ => panic!("decimal paths disagree on {text:?}: {reference:?} vs {fast:?}"),
    }

    if text.len() > max {
        assert!(matches!(reference, Err(NumberParseError::TooLong { .. })));
    }
    if let Err(err) = reference {
        // excerpts are bounded whatever the input
        assert!(err.to_string().len() < 400, "unbounded message for {} bytes", text.len());
    }
});
