#![no_main]
use arbitrary::Arbitrary;
use jsonio::{StreamReadConstraints, TextBuffer};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op<'a> {
    Push(&'a str),
    Char(char),
    Slice { text: &'a str, offset: u8, len: u8 },
    Reset,
    Expand,
}

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    max_length: u16,
    ops: Vec<Op<'a>>,
}

fuzz_target!(|input: Input<'_>| {
    let max = usize::from(input.max_length);
    let mut tb = TextBuffer::with_constraints(
        StreamReadConstraints::builder().max_string_length(max).build(),
    );
    let mut model = String::new();
    let mut overflowed = false;

    for op in input.ops {
        let before = model.chars().count();
        let (result, added): (Result<(), _>, String) = match op {
            Op::Push(text) => (tb.push_str(text), text.to_owned()),
            Op::Char(c) => (tb.append_char(c), c.to_string()),
            Op::Slice { text, offset, len } => {
                let added: String = text
                    .chars()
                    .skip(usize::from(offset))
                    .take(usize::from(len))
                    .collect();
                let checked = before + added.chars().count();
                let result = tb.append_str(text, usize::from(offset), usize::from(len));
                // only the characters actually taken count against the limit
                assert_eq!(result.is_err(), overflowed || checked > max);
                (result, added)
            }
            Op::Reset => {
                tb.reset_with_empty();
                model.clear();
                overflowed = false;
                continue;
            }
            Op::Expand => {
                let len = tb.len();
                tb.expand_current_segment();
                assert_eq!(tb.len(), len);
                continue;
            }
        };
        match result {
            Ok(()) => model.push_str(&added),
            Err(_) => overflowed = true,
        }
    }

    match tb.contents_as_string() {
        Ok(s) => {
            assert!(!overflowed);
            assert_eq!(s, model);
            assert!(s.chars().count() <= max);
        }
        Err(_) => assert!(overflowed || tb.len() > max),
    }
});
