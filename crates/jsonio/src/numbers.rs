//! Length-guarded conversion of number tokens to arbitrary-precision values.
//!
//! Every entry point first compares the input length against a bound and
//! rejects over-long input without looking at a single digit, so the cost of
//! a rejection does not depend on what an attacker sends. Input within bounds
//! is validated against the lexical grammar and then converted by either
//!
//! - the *reference* path, which delegates to `num-bigint` / `bigdecimal`, or
//! - the *fast* path, which multiply-accumulates nine-digit groups into
//!   base-2<sup>32</sup> limbs and falls back to the reference path above
//!   [`FAST_PATH_DIGIT_LIMIT`] digits, where quadratic accumulation stops
//!   paying off.
//!
//! Both paths produce numerically identical results.
//!
//! ```rust
//! use jsonio::{parse_big_decimal_fast, parse_big_integer};
//!
//! assert_eq!(parse_big_integer("-0042").unwrap(), (-42).into());
//! assert_eq!(parse_big_decimal_fast("1.5e2").unwrap(), jsonio::BigDecimal::from(150));
//!
//! let err = parse_big_integer(&"9".repeat(5_000)).unwrap_err();
//! assert!(err.to_string().starts_with("Value \"999"));
//! assert!(err.to_string().contains("truncated"));
//! ```

use core::{fmt, str::FromStr};

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint, Sign};
use tracing::debug;

use crate::{
    ErrorReportConfiguration, NumberParseError, StreamReadConstraints,
    error_report::quoted_excerpt,
};

/// Digit count above which the fast path defers to the reference path.
pub const FAST_PATH_DIGIT_LIMIT: usize = 1_250;

const GROUP_DIGITS: usize = 9;
const GROUP_BASE: u32 = 1_000_000_000;

/// Target type of a numeric conversion, as named in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    BigInteger,
    BigDecimal,
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BigInteger => "BigInt",
            Self::BigDecimal => "BigDecimal",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexical {
    Empty,
    NoDigits,
    UnexpectedChar { ch: char, at: usize },
    ExponentOutOfRange,
    Unrepresentable,
}

impl fmt::Display for Lexical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty input"),
            Self::NoDigits => f.write_str("no digits"),
            Self::UnexpectedChar { ch, at } => {
                write!(f, "unexpected character {ch:?} at offset {at}")
            }
            Self::ExponentOutOfRange => f.write_str("exponent out of range"),
            Self::Unrepresentable => f.write_str("value can not be represented"),
        }
    }
}

struct IntegerLexeme<'a> {
    negative: bool,
    digits: &'a [u8],
}

struct DecimalLexeme<'a> {
    negative: bool,
    integer: &'a [u8],
    fraction: &'a [u8],
    exponent: i64,
}

impl DecimalLexeme<'_> {
    /// Number of digits after the decimal point once the exponent is applied.
    fn scale(&self) -> Result<i64, Lexical> {
        i64::try_from(self.fraction.len())
            .ok()
            .and_then(|frac| frac.checked_sub(self.exponent))
            .ok_or(Lexical::ExponentOutOfRange)
    }
}

fn unexpected(text: &str, at: usize) -> Lexical {
    // everything before `at` is ASCII, so `at` is a char boundary
    let ch = text[at..].chars().next().unwrap_or('\0');
    Lexical::UnexpectedChar { ch, at }
}

fn split_sign(bytes: &[u8]) -> (bool, &[u8], usize) {
    match bytes.first() {
        Some(b'-') => (true, &bytes[1..], 1),
        Some(b'+') => (false, &bytes[1..], 1),
        _ => (false, bytes, 0),
    }
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// `[+-]?[0-9]+`
fn scan_integer(text: &str) -> Result<IntegerLexeme<'_>, Lexical> {
    if text.is_empty() {
        return Err(Lexical::Empty);
    }
    let (negative, rest, start) = split_sign(text.as_bytes());
    let n = digit_run(rest);
    if n < rest.len() {
        return Err(unexpected(text, start + n));
    }
    if n == 0 {
        return Err(Lexical::NoDigits);
    }
    Ok(IntegerLexeme {
        negative,
        digits: rest,
    })
}

/// `[+-]?(digits(.digits?)?|.digits)([eE][+-]?digits)?`
fn scan_decimal(text: &str) -> Result<DecimalLexeme<'_>, Lexical> {
    if text.is_empty() {
        return Err(Lexical::Empty);
    }
    let bytes = text.as_bytes();
    let (negative, _, mut pos) = split_sign(bytes);

    let int_len = digit_run(&bytes[pos..]);
    let integer = &bytes[pos..pos + int_len];
    pos += int_len;

    let mut fraction: &[u8] = &[];
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let frac_len = digit_run(&bytes[pos..]);
        fraction = &bytes[pos..pos + frac_len];
        pos += frac_len;
    }
    if integer.is_empty() && fraction.is_empty() {
        return Err(if pos < bytes.len() && bytes[pos] != b'.' {
            unexpected(text, pos)
        } else {
            Lexical::NoDigits
        });
    }

    let mut exponent = 0i64;
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        let (exp_negative, _, sign_len) = split_sign(&bytes[pos..]);
        pos += sign_len;
        let exp_len = digit_run(&bytes[pos..]);
        if exp_len == 0 {
            return Err(if pos < bytes.len() {
                unexpected(text, pos)
            } else {
                Lexical::NoDigits
            });
        }
        for &d in &bytes[pos..pos + exp_len] {
            exponent = exponent
                .checked_mul(10)
                .and_then(|e| e.checked_add(i64::from(d - b'0')))
                .ok_or(Lexical::ExponentOutOfRange)?;
        }
        if exp_negative {
            exponent = -exponent;
        }
        pos += exp_len;
    }
    if pos < bytes.len() {
        return Err(unexpected(text, pos));
    }
    Ok(DecimalLexeme {
        negative,
        integer,
        fraction,
        exponent,
    })
}

fn group_value(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0, |acc, d| acc * 10 + u32::from(d - b'0'))
}

/// `limbs = limbs * mul + add`, little-endian base 2^32.
#[allow(clippy::cast_possible_truncation)]
fn multiply_add(limbs: &mut Vec<u32>, mul: u32, add: u32) {
    let mut carry = u64::from(add);
    for limb in limbs.iter_mut() {
        let t = u64::from(*limb) * u64::from(mul) + carry;
        *limb = t as u32;
        carry = t >> 32;
    }
    if carry != 0 {
        limbs.push(carry as u32);
    }
}

/// Magnitude of an ASCII digit string, nine digits at a time.
#[allow(clippy::cast_possible_truncation)]
fn accumulate_magnitude(digits: &[u8]) -> BigUint {
    let mut limbs = Vec::with_capacity(digits.len() / GROUP_DIGITS + 1);
    let (head, body) = digits.split_at(digits.len() % GROUP_DIGITS);
    if !head.is_empty() {
        multiply_add(&mut limbs, 10u32.pow(head.len() as u32), group_value(head));
    }
    for group in body.chunks_exact(GROUP_DIGITS) {
        multiply_add(&mut limbs, GROUP_BASE, group_value(group));
    }
    BigUint::new(limbs)
}

fn signed(negative: bool, magnitude: BigUint) -> BigInt {
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    BigInt::from_biguint(sign, magnitude)
}

/// Converts number tokens under a length bound.
///
/// Constructed from the active constraints (see
/// [`IoContext::number_parser`](crate::IoContext::number_parser)) or with
/// [`Default`], which uses the default [`StreamReadConstraints`] and
/// [`ErrorReportConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberParser {
    max_length: usize,
    excerpt_length: usize,
    fast: bool,
}

impl Default for NumberParser {
    fn default() -> Self {
        Self::new(
            &StreamReadConstraints::default(),
            &ErrorReportConfiguration::default(),
        )
    }
}

impl NumberParser {
    /// Bound by [`StreamReadConstraints::max_number_length`], quoting at most
    /// [`ErrorReportConfiguration::max_value_excerpt_length`] characters in
    /// errors. Uses the reference path unless
    /// [`with_fast_parser`](Self::with_fast_parser) is enabled.
    #[must_use]
    pub fn new(constraints: &StreamReadConstraints, report: &ErrorReportConfiguration) -> Self {
        Self {
            max_length: constraints.max_number_length(),
            excerpt_length: report.max_value_excerpt_length(),
            fast: false,
        }
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Selects the path used by [`big_integer`](Self::big_integer) and
    /// [`big_decimal`](Self::big_decimal).
    #[must_use]
    pub fn with_fast_parser(mut self, enabled: bool) -> Self {
        self.fast = enabled;
        self
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    #[must_use]
    pub fn uses_fast_parser(&self) -> bool {
        self.fast
    }

    fn guard_length(&self, text: &str) -> Result<(), NumberParseError> {
        if text.len() > self.max_length {
            debug!(
                length = text.len(),
                max = self.max_length,
                "rejecting number before parsing"
            );
            return Err(NumberParseError::TooLong {
                excerpt: quoted_excerpt(text, self.excerpt_length),
                length: text.len(),
                max: self.max_length,
            });
        }
        Ok(())
    }

    // `reason` is always one of our own fixed messages; third-party parse
    // errors quote the whole input and are never forwarded
    fn malformed(&self, text: &str, target: NumberKind, reason: Lexical) -> NumberParseError {
        NumberParseError::Malformed {
            excerpt: quoted_excerpt(text, self.excerpt_length),
            target,
            reason: reason.to_string(),
        }
    }

    /// Integer conversion on the configured path.
    ///
    /// # Errors
    ///
    /// [`NumberParseError::TooLong`] if `text` is longer than the bound (in
    /// bytes), [`NumberParseError::Malformed`] if it is not an integer.
    pub fn big_integer(&self, text: &str) -> Result<BigInt, NumberParseError> {
        if self.fast {
            self.big_integer_fast(text)
        } else {
            self.big_integer_reference(text)
        }
    }

    /// Decimal conversion on the configured path.
    ///
    /// # Errors
    ///
    /// As [`big_integer`](Self::big_integer).
    pub fn big_decimal(&self, text: &str) -> Result<BigDecimal, NumberParseError> {
        if self.fast {
            self.big_decimal_fast(text)
        } else {
            self.big_decimal_reference(text)
        }
    }

    /// # Errors
    ///
    /// As [`big_integer`](Self::big_integer).
    pub fn big_integer_reference(&self, text: &str) -> Result<BigInt, NumberParseError> {
        self.guard_length(text)?;
        scan_integer(text).map_err(|e| self.malformed(text, NumberKind::BigInteger, e))?;
        self.integer_from_str(text)
    }

    /// # Errors
    ///
    /// As [`big_integer`](Self::big_integer).
    pub fn big_integer_fast(&self, text: &str) -> Result<BigInt, NumberParseError> {
        self.guard_length(text)?;
        let lexeme =
            scan_integer(text).map_err(|e| self.malformed(text, NumberKind::BigInteger, e))?;
        if lexeme.digits.len() > FAST_PATH_DIGIT_LIMIT {
            return self.integer_from_str(text);
        }
        Ok(signed(lexeme.negative, accumulate_magnitude(lexeme.digits)))
    }

    /// # Errors
    ///
    /// As [`big_integer`](Self::big_integer); an exponent that does not fit
    /// an `i64` is malformed.
    pub fn big_decimal_reference(&self, text: &str) -> Result<BigDecimal, NumberParseError> {
        self.guard_length(text)?;
        let lexeme =
            scan_decimal(text).map_err(|e| self.malformed(text, NumberKind::BigDecimal, e))?;
        lexeme
            .scale()
            .map_err(|e| self.malformed(text, NumberKind::BigDecimal, e))?;
        self.decimal_from_str(text)
    }

    /// # Errors
    ///
    /// As [`big_decimal_reference`](Self::big_decimal_reference).
    pub fn big_decimal_fast(&self, text: &str) -> Result<BigDecimal, NumberParseError> {
        self.guard_length(text)?;
        let lexeme =
            scan_decimal(text).map_err(|e| self.malformed(text, NumberKind::BigDecimal, e))?;
        let scale = lexeme
            .scale()
            .map_err(|e| self.malformed(text, NumberKind::BigDecimal, e))?;
        if lexeme.integer.len() + lexeme.fraction.len() > FAST_PATH_DIGIT_LIMIT {
            return self.decimal_from_str(text);
        }
        let magnitude = if lexeme.fraction.is_empty() {
            accumulate_magnitude(lexeme.integer)
        } else {
            accumulate_magnitude(&[lexeme.integer, lexeme.fraction].concat())
        };
        Ok(BigDecimal::new(signed(lexeme.negative, magnitude), scale))
    }

    /// Delegates lexically valid input to `num-bigint`.
    fn integer_from_str(&self, text: &str) -> Result<BigInt, NumberParseError> {
        BigInt::from_str(text)
            .map_err(|_| self.malformed(text, NumberKind::BigInteger, Lexical::Unrepresentable))
    }

    /// Delegates lexically valid input with a representable scale to
    /// `bigdecimal`.
    fn decimal_from_str(&self, text: &str) -> Result<BigDecimal, NumberParseError> {
        BigDecimal::from_str(text)
            .map_err(|_| self.malformed(text, NumberKind::BigDecimal, Lexical::Unrepresentable))
    }
}

/// [`NumberParser::big_integer_reference`] with default bounds.
///
/// # Errors
///
/// See [`NumberParser::big_integer`].
pub fn parse_big_integer(text: &str) -> Result<BigInt, NumberParseError> {
    NumberParser::default().big_integer_reference(text)
}

/// [`NumberParser::big_integer_fast`] with default bounds.
///
/// # Errors
///
/// See [`NumberParser::big_integer`].
pub fn parse_big_integer_fast(text: &str) -> Result<BigInt, NumberParseError> {
    NumberParser::default().big_integer_fast(text)
}

/// [`NumberParser::big_decimal_reference`] with default bounds.
///
/// # Errors
///
/// See [`NumberParser::big_decimal`].
pub fn parse_big_decimal(text: &str) -> Result<BigDecimal, NumberParseError> {
    NumberParser::default().big_decimal_reference(text)
}

/// [`NumberParser::big_decimal_fast`] with default bounds.
///
/// # Errors
///
/// See [`NumberParser::big_decimal`].
pub fn parse_big_decimal_fast(text: &str) -> Result<BigDecimal, NumberParseError> {
    NumberParser::default().big_decimal_fast(text)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn bounded(max: usize) -> NumberParser {
        NumberParser::default().with_max_length(max)
    }

    #[rstest]
    #[case("0")]
    #[case("-0")]
    #[case("+7")]
    #[case("000000000000000000000123")]
    #[case("999999999")]
    #[case("1000000000")]
    #[case("4294967295")]
    #[case("4294967296")]
    #[case("-18446744073709551616")]
    #[case("99999999999999999999999999999999999999")]
    fn integer_paths_agree(#[case] text: &str) {
        let p = NumberParser::default();
        let reference = p.big_integer_reference(text).unwrap();
        assert_eq!(p.big_integer_fast(text).unwrap(), reference);
        let expected: BigInt = text.trim_start_matches('+').parse().unwrap();
        assert_eq!(reference, expected);
    }

    #[rstest]
    #[case("0.0", "0")]
    #[case("-1.50", "-1.5")]
    #[case(".5", "0.5")]
    #[case("5.", "5")]
    #[case("1e3", "1000")]
    #[case("1E-3", "0.001")]
    #[case("+12.5e+2", "1250")]
    #[case("-0.000999999999999999999", "-0.000999999999999999999")]
    fn decimal_paths_agree(#[case] text: &str, #[case] expected: &str) {
        let p = NumberParser::default();
        let expected = BigDecimal::from_str(expected).unwrap();
        assert_eq!(p.big_decimal_reference(text).unwrap(), expected);
        assert_eq!(p.big_decimal_fast(text).unwrap(), expected);
    }

    #[rstest]
    #[case("", "empty input")]
    #[case("-", "no digits")]
    #[case("12a", "unexpected character 'a' at offset 2")]
    #[case("1_000", "unexpected character '_' at offset 1")]
    #[case("--1", "unexpected character '-' at offset 1")]
    #[case("١٢", "unexpected character '١' at offset 0")]
    fn malformed_integers(#[case] text: &str, #[case] reason: &str) {
        let p = NumberParser::default();
        for result in [p.big_integer_reference(text), p.big_integer_fast(text)] {
            match result {
                Err(NumberParseError::Malformed { reason: r, target, .. }) => {
                    assert_eq!(r, reason);
                    assert_eq!(target, NumberKind::BigInteger);
                }
                other => panic!("expected malformed, got {other:?}"),
            }
        }
    }

    #[rstest]
    #[case(".")]
    #[case("1e")]
    #[case("1e+")]
    #[case("1.2.3")]
    #[case("e5")]
    #[case("1e99999999999999999999")]
    #[case("NaN")]
    fn malformed_decimals(#[case] text: &str) {
        let p = NumberParser::default();
        assert!(matches!(
            p.big_decimal_reference(text),
            Err(NumberParseError::Malformed { .. })
        ));
        assert!(matches!(
            p.big_decimal_fast(text),
            Err(NumberParseError::Malformed { .. })
        ));
    }

    #[test]
    fn exact_bound_parses_and_one_more_is_rejected() {
        let p = bounded(20);
        let at_bound = "9".repeat(20);
        let expected = BigInt::from_str(&at_bound).unwrap();
        assert_eq!(p.big_integer_reference(&at_bound).unwrap(), expected);
        assert_eq!(p.big_integer_fast(&at_bound).unwrap(), expected);

        let over = "9".repeat(21);
        for err in [
            p.big_integer_reference(&over).unwrap_err(),
            p.big_integer_fast(&over).unwrap_err(),
        ] {
            assert!(matches!(err, NumberParseError::TooLong { length: 21, max: 20, .. }));
        }
    }

    #[test]
    fn length_guard_runs_before_lexical_checks() {
        // not a number at all, but too long: the length is reported, not the grammar
        let p = bounded(10);
        let err = p.big_decimal_fast("ABCDEFGHIJK").unwrap_err();
        assert!(matches!(err, NumberParseError::TooLong { .. }));
    }

    #[test]
    fn long_inputs_fall_back_to_reference_path() {
        let digits = "123456789".repeat(200);
        assert!(digits.len() > FAST_PATH_DIGIT_LIMIT);
        let p = bounded(usize::MAX);
        assert_eq!(
            p.big_integer_fast(&digits).unwrap(),
            p.big_integer_reference(&digits).unwrap()
        );
        let decimal = format!("{digits}.{digits}e-7");
        assert_eq!(
            p.big_decimal_fast(&decimal).unwrap(),
            p.big_decimal_reference(&decimal).unwrap()
        );
    }

    #[rstest]
    #[case::tiny_fraction("0.", "e-9223372036854775807")]
    #[case::exponent_overflow("", "e-9223372036854775808")]
    fn scale_overflow_is_rejected_alike_above_the_fast_limit(
        #[case] prefix: &str,
        #[case] exponent: &str,
    ) {
        let text = format!("{prefix}{}{exponent}", "1".repeat(50_000));
        let p = bounded(100_000);
        let reference = p.big_decimal_reference(&text).unwrap_err();
        let fast = p.big_decimal_fast(&text).unwrap_err();
        assert_eq!(reference, fast);
        assert!(matches!(
            &fast,
            NumberParseError::Malformed { reason, .. } if reason == "exponent out of range"
        ));
        assert!(fast.to_string().len() < 200, "{} bytes", fast.to_string().len());
    }

    #[test]
    fn configured_path_is_used() {
        let p = NumberParser::default().with_fast_parser(true);
        assert!(p.uses_fast_parser());
        assert_eq!(p.big_integer("42").unwrap(), BigInt::from(42));
        assert_eq!(p.big_decimal("4.2").unwrap(), BigDecimal::new(42.into(), 1));
    }
}
