//! Segmented accumulator for decoded string values and property names.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::{
    BufferRecycler, CharBufferKind, Error, NumberParser, StreamConstraintsError,
    StreamReadConstraints,
};

/// Smallest segment allocated by a [`TextBuffer`].
pub const MIN_SEGMENT_LEN: usize = 500;
/// Largest segment allocated by a [`TextBuffer`]; longer content spans
/// multiple segments.
pub const MAX_SEGMENT_LEN: usize = 0x1_0000;

#[derive(Debug)]
struct Segment {
    chars: Vec<char>,
    len: usize,
}

/// Growable character buffer made of fixed-size segments.
///
/// Content is appended into the tail segment; when it fills up, the tail is
/// retired and a new segment, 50% larger and capped at [`MAX_SEGMENT_LEN`],
/// becomes the tail. Completed segments are never copied again until the
/// content is materialized.
///
/// A buffer obtained through
/// [`IoContext::construct_text_buffer`](crate::IoContext::construct_text_buffer)
/// is bound to the read constraints: an append that would make the content
/// longer than [`StreamReadConstraints::max_string_length`] fails, and the
/// buffer stays unreadable until it is reset.
#[derive(Debug)]
pub struct TextBuffer {
    constraints: Option<StreamReadConstraints>,
    segments: Vec<Segment>,
    segment_size: usize,
    current: Vec<char>,
    current_size: usize,
    spare: Vec<Vec<char>>,
    overflow: Option<usize>,
}

impl TextBuffer {
    pub(crate) fn from_parts(
        constraints: Option<StreamReadConstraints>,
        initial: Option<Vec<char>>,
    ) -> Self {
        Self {
            constraints,
            segments: Vec::new(),
            segment_size: 0,
            current: initial.unwrap_or_default(),
            current_size: 0,
            spare: Vec::new(),
            overflow: None,
        }
    }

    /// A buffer enforcing `constraints`, not backed by a recycler.
    #[must_use]
    pub fn with_constraints(constraints: StreamReadConstraints) -> Self {
        Self::from_parts(Some(constraints), None)
    }

    /// A buffer without a length limit, for generator-side use.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::from_parts(None, None)
    }

    #[must_use]
    pub fn constraints(&self) -> Option<&StreamReadConstraints> {
        self.constraints.as_ref()
    }

    /// Number of characters accumulated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segment_size + self.current_size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an append was rejected since the last reset.
    #[must_use]
    pub fn has_overflowed(&self) -> bool {
        self.overflow.is_some()
    }

    fn check_length(&mut self, length: usize) -> Result<(), StreamConstraintsError> {
        let Some(constraints) = self.constraints else {
            return Ok(());
        };
        if let Some(rejected) = self.overflow {
            return Err(StreamConstraintsError::StringLength {
                length: rejected,
                max: constraints.max_string_length(),
            });
        }
        constraints
            .validate_string_length(length)
            .inspect_err(|_| self.overflow = Some(length))
    }

    fn next_segment_len(previous: usize) -> usize {
        (previous + (previous >> 1)).clamp(MIN_SEGMENT_LEN, MAX_SEGMENT_LEN)
    }

    fn ensure_current(&mut self) {
        if self.current.is_empty() {
            self.current = self
                .spare
                .pop()
                .unwrap_or_else(|| vec!['\0'; MIN_SEGMENT_LEN]);
        }
    }

    /// Retires the tail segment and installs a fresh one.
    fn push_segment(&mut self) {
        let next_len = Self::next_segment_len(self.current.len());
        let next = match self.spare.iter().position(|s| s.len() >= next_len) {
            Some(ix) => self.spare.swap_remove(ix),
            None => vec!['\0'; next_len],
        };
        let full = core::mem::replace(&mut self.current, next);
        self.segments.push(Segment {
            chars: full,
            len: self.current_size,
        });
        self.segment_size += self.current_size;
        self.current_size = 0;
    }

    fn push_unchecked(&mut self, c: char) {
        self.ensure_current();
        if self.current_size == self.current.len() {
            self.push_segment();
        }
        self.current[self.current_size] = c;
        self.current_size += 1;
    }

    fn extend_unchecked(&mut self, mut chars: &[char]) {
        self.ensure_current();
        while !chars.is_empty() {
            if self.current_size == self.current.len() {
                self.push_segment();
            }
            let room = self.current.len() - self.current_size;
            let (head, tail) = chars.split_at(room.min(chars.len()));
            self.current[self.current_size..self.current_size + head.len()].copy_from_slice(head);
            self.current_size += head.len();
            chars = tail;
        }
    }

    /// Appends one character.
    ///
    /// # Errors
    ///
    /// [`StreamConstraintsError::StringLength`] if the content would exceed the
    /// maximum string length, or a previous append already did.
    pub fn append_char(&mut self, c: char) -> Result<(), StreamConstraintsError> {
        self.check_length(self.len() + 1)?;
        self.push_unchecked(c);
        Ok(())
    }

    /// Appends `chars[offset..offset + len]`.
    ///
    /// # Errors
    ///
    /// As [`append_char`](Self::append_char); nothing is copied on failure.
    ///
    /// # Panics
    ///
    /// If the range is out of bounds for `chars`.
    pub fn append_chars(
        &mut self,
        chars: &[char],
        offset: usize,
        len: usize,
    ) -> Result<(), StreamConstraintsError> {
        let chars = &chars[offset..offset + len];
        self.check_length(self.len() + chars.len())?;
        self.extend_unchecked(chars);
        Ok(())
    }

    /// Appends up to `len` characters of `text`, starting at character
    /// `offset`. A range running past the end of `text` is cut short.
    ///
    /// # Errors
    ///
    /// As [`append_char`](Self::append_char), checked against the number of
    /// characters actually taken before anything is copied.
    pub fn append_str(
        &mut self,
        text: &str,
        offset: usize,
        len: usize,
    ) -> Result<(), StreamConstraintsError> {
        let taken = text.chars().skip(offset).take(len);
        self.check_length(self.len() + taken.clone().count())?;
        for c in taken {
            self.push_unchecked(c);
        }
        Ok(())
    }

    /// Appends all of `text`.
    ///
    /// # Errors
    ///
    /// As [`append_char`](Self::append_char).
    pub fn push_str(&mut self, text: &str) -> Result<(), StreamConstraintsError> {
        self.append_str(text, 0, text.chars().count())
    }

    fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.segments
            .iter()
            .flat_map(|s| &s.chars[..s.len])
            .chain(&self.current[..self.current_size])
            .copied()
    }

    fn check_readable(&self) -> Result<(), StreamConstraintsError> {
        let Some(constraints) = self.constraints else {
            return Ok(());
        };
        match self.overflow {
            Some(length) => Err(StreamConstraintsError::StringLength {
                length,
                max: constraints.max_string_length(),
            }),
            None => constraints.validate_string_length(self.len()),
        }
    }

    /// The accumulated content as one `String`.
    ///
    /// # Errors
    ///
    /// [`StreamConstraintsError::StringLength`] if any append since the last
    /// reset was rejected; a partial value is never returned.
    pub fn contents_as_string(&self) -> Result<String, StreamConstraintsError> {
        self.check_readable()?;
        let mut out = String::with_capacity(self.len());
        out.extend(self.chars());
        Ok(out)
    }

    /// # Errors
    ///
    /// As [`contents_as_string`](Self::contents_as_string).
    pub fn contents_as_chars(&self) -> Result<Vec<char>, StreamConstraintsError> {
        self.check_readable()?;
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.chars());
        Ok(out)
    }

    /// Parses the content as an integer with `parser`.
    ///
    /// # Errors
    ///
    /// A string-length violation, or any error of
    /// [`NumberParser::big_integer`].
    pub fn contents_as_big_integer(&self, parser: &NumberParser) -> Result<BigInt, Error> {
        let text = self.contents_as_string()?;
        Ok(parser.big_integer(&text)?)
    }

    /// # Errors
    ///
    /// A string-length violation, or any error of
    /// [`NumberParser::big_decimal`].
    pub fn contents_as_big_decimal(&self, parser: &NumberParser) -> Result<BigDecimal, Error> {
        let text = self.contents_as_string()?;
        Ok(parser.big_decimal(&text)?)
    }

    /// Discards the content, keeping allocated segments for reuse.
    pub fn reset_with_empty(&mut self) {
        for segment in self.segments.drain(..) {
            self.spare.push(segment.chars);
        }
        self.segment_size = 0;
        self.current_size = 0;
        self.overflow = None;
    }

    /// Replaces the content with `text`.
    ///
    /// # Errors
    ///
    /// As [`append_char`](Self::append_char).
    pub fn reset_with_str(&mut self, text: &str) -> Result<(), StreamConstraintsError> {
        self.reset_with_empty();
        self.push_str(text)
    }

    /// # Errors
    ///
    /// As [`append_char`](Self::append_char).
    pub fn reset_with_copy(&mut self, chars: &[char]) -> Result<(), StreamConstraintsError> {
        self.reset_with_empty();
        self.append_chars(chars, 0, chars.len())
    }

    /// Clears the content and exposes the whole tail segment for direct
    /// writing; commit with [`set_current_length`](Self::set_current_length).
    pub fn empty_and_get_current_segment(&mut self) -> &mut [char] {
        self.reset_with_empty();
        self.ensure_current();
        &mut self.current
    }

    /// The whole tail segment, including the part past
    /// [`current_segment_size`](Self::current_segment_size).
    pub fn current_segment_mut(&mut self) -> &mut [char] {
        self.ensure_current();
        &mut self.current
    }

    /// Characters used in the tail segment.
    #[must_use]
    pub fn current_segment_size(&self) -> usize {
        self.current_size
    }

    /// Commits `len` characters written directly into the tail segment.
    ///
    /// # Errors
    ///
    /// [`StreamConstraintsError::StringLength`] if the total content now
    /// exceeds the maximum string length.
    ///
    /// # Panics
    ///
    /// If `len` is larger than the tail segment.
    pub fn set_current_length(&mut self, len: usize) -> Result<(), StreamConstraintsError> {
        assert!(len <= self.current.len(), "length {len} exceeds segment");
        self.check_length(self.segment_size + len)?;
        self.current_size = len;
        Ok(())
    }

    /// Retires the (filled) tail segment and returns the next one.
    ///
    /// # Errors
    ///
    /// [`StreamConstraintsError::StringLength`] if the content accumulated so
    /// far exceeds the maximum string length.
    pub fn finish_current_segment(&mut self) -> Result<&mut [char], StreamConstraintsError> {
        self.ensure_current();
        self.current_size = self.current.len();
        self.check_length(self.len())?;
        self.push_segment();
        Ok(&mut self.current)
    }

    /// Grows the tail segment in place by 50% (by one element once it is at
    /// [`MAX_SEGMENT_LEN`]) and returns it.
    pub fn expand_current_segment(&mut self) -> &mut [char] {
        self.ensure_current();
        let len = self.current.len();
        let new_len = if len >= MAX_SEGMENT_LEN {
            len + 1
        } else {
            (len + (len >> 1)).min(MAX_SEGMENT_LEN)
        };
        self.current.resize(new_len, '\0');
        &mut self.current
    }

    /// Clears the content and hands the largest segment back to `recycler`.
    pub fn release_buffers(&mut self, recycler: &mut BufferRecycler) {
        self.reset_with_empty();
        let current = core::mem::take(&mut self.current);
        if let Some(largest) = self
            .spare
            .drain(..)
            .chain(Some(current))
            .max_by_key(Vec::len)
            .filter(|buf| !buf.is_empty())
        {
            recycler.release_char_buffer(CharBufferKind::TextBuffer, largest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limited(max: usize) -> TextBuffer {
        TextBuffer::with_constraints(
            StreamReadConstraints::builder()
                .max_string_length(max)
                .build(),
        )
    }

    #[test]
    fn accumulates_across_segments() {
        let mut tb = TextBuffer::unconstrained();
        let text: String = (0..2_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        tb.push_str(&text).unwrap();
        tb.append_char('!').unwrap();
        assert_eq!(tb.len(), 2_001);
        assert!(tb.segments.len() >= 2);
        let out = tb.contents_as_string().unwrap();
        assert_eq!(&out[..2_000], text);
        assert!(out.ends_with('!'));
    }

    #[test]
    fn segments_grow_geometrically_up_to_cap() {
        assert_eq!(TextBuffer::next_segment_len(0), MIN_SEGMENT_LEN);
        assert_eq!(TextBuffer::next_segment_len(1000), 1500);
        assert_eq!(TextBuffer::next_segment_len(MAX_SEGMENT_LEN), MAX_SEGMENT_LEN);
    }

    #[test]
    fn exact_limit_is_accepted() {
        let mut tb = limited(10);
        tb.append_chars(&['a'; 10], 0, 10).unwrap();
        assert_eq!(tb.contents_as_string().unwrap(), "aaaaaaaaaa");
    }

    #[test]
    fn one_past_limit_poisons_the_buffer() {
        let mut tb = limited(10);
        tb.push_str("0123456789").unwrap();
        let err = tb.append_char('x').unwrap_err();
        assert_eq!(err, StreamConstraintsError::StringLength { length: 11, max: 10 });
        assert!(tb.has_overflowed());
        assert!(tb.contents_as_string().is_err());
        assert!(tb.contents_as_chars().is_err());
        // even an append that would fit is refused until reset
        assert!(tb.append_chars(&[], 0, 0).is_err());
        tb.reset_with_empty();
        tb.append_char('y').unwrap();
        assert_eq!(tb.contents_as_string().unwrap(), "y");
    }

    #[test]
    fn append_str_honours_offset_and_len() {
        let mut tb = limited(100);
        tb.append_str("héllo world", 1, 4).unwrap();
        assert_eq!(tb.contents_as_string().unwrap(), "éllo");
    }

    #[test]
    fn append_str_checks_what_is_actually_taken() {
        let mut tb = limited(5);
        tb.append_str("ab", 0, 10).unwrap();
        tb.append_str("xyzw", 1, 100).unwrap();
        assert!(!tb.has_overflowed());
        assert_eq!(tb.contents_as_string().unwrap(), "abyzw");
        assert_eq!(
            tb.append_str("q", 0, 1),
            Err(StreamConstraintsError::StringLength { length: 6, max: 5 })
        );
    }

    #[test]
    fn reset_reuses_segments() {
        let mut tb = TextBuffer::unconstrained();
        tb.push_str(&"x".repeat(5_000)).unwrap();
        let retired = tb.segments.len();
        tb.reset_with_empty();
        assert!(tb.is_empty());
        assert_eq!(tb.spare.len(), retired);
        tb.reset_with_str("abc").unwrap();
        assert_eq!(tb.contents_as_string().unwrap(), "abc");
    }

    #[test]
    fn direct_segment_writes() {
        let mut tb = limited(1_000);
        let seg = tb.empty_and_get_current_segment();
        seg[..3].copy_from_slice(&['a', 'b', 'c']);
        tb.set_current_length(3).unwrap();
        assert_eq!(tb.current_segment_size(), 3);

        let len = tb.current_segment_mut().len();
        let expanded = tb.expand_current_segment().len();
        assert_eq!(expanded, len + len / 2);
        assert_eq!(tb.contents_as_string().unwrap(), "abc");
    }

    #[test]
    fn finishing_segments_is_checked() {
        let mut tb = limited(MIN_SEGMENT_LEN + 10);
        tb.empty_and_get_current_segment().fill('z');
        let next = tb.finish_current_segment().unwrap();
        next[0] = 'q';
        tb.set_current_length(1).unwrap();
        assert_eq!(tb.len(), MIN_SEGMENT_LEN + 1);
        assert!(tb.set_current_length(11).is_err());
        assert!(tb.contents_as_string().is_err());
    }

    #[test]
    fn release_hands_back_largest_segment() {
        let mut recycler = BufferRecycler::new();
        let mut tb = TextBuffer::unconstrained();
        tb.push_str(&"x".repeat(3_000)).unwrap();
        tb.release_buffers(&mut recycler);
        let held = recycler
            .held_char_buffer_len(CharBufferKind::TextBuffer)
            .unwrap();
        assert!(held > MIN_SEGMENT_LEN);
        assert!(tb.is_empty());
    }
}
