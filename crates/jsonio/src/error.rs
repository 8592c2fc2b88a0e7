use thiserror::Error;

use crate::{
    numbers::NumberKind,
    recycler::{ByteBufferKind, CharBufferKind},
};

/// A configured resource limit was crossed.
///
/// Raised at the point where the limit is first exceeded. Every variant
/// carries the offending measurement and the configured maximum, never the
/// content itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamConstraintsError {
    #[error(
        "string value length ({length}) exceeds the maximum allowed ({max}, from `StreamReadConstraints::max_string_length`)"
    )]
    StringLength { length: usize, max: usize },
    #[error(
        "number value length ({length}) exceeds the maximum allowed ({max}, from `StreamReadConstraints::max_number_length`)"
    )]
    NumberLength { length: usize, max: usize },
    #[error(
        "name length ({length}) exceeds the maximum allowed ({max}, from `StreamReadConstraints::max_name_length`)"
    )]
    NameLength { length: usize, max: usize },
    #[error("document nesting depth ({depth}) exceeds the maximum allowed ({max}, from `{setting}`)")]
    NestingDepth {
        depth: usize,
        max: usize,
        setting: &'static str,
    },
    #[error(
        "document length ({length}) exceeds the maximum allowed ({max}, from `StreamReadConstraints::max_document_length`)"
    )]
    DocumentLength { length: u64, max: u64 },
    #[error(
        "token count ({count}) exceeds the maximum allowed ({max}, from `StreamReadConstraints::max_token_count`)"
    )]
    TokenCount { count: u64, max: u64 },
}

impl StreamConstraintsError {
    /// The configured limit that was exceeded.
    #[must_use]
    pub fn limit(&self) -> u64 {
        match *self {
            Self::StringLength { max, .. }
            | Self::NumberLength { max, .. }
            | Self::NameLength { max, .. }
            | Self::NestingDepth { max, .. } => max as u64,
            Self::DocumentLength { max, .. } | Self::TokenCount { max, .. } => max,
        }
    }
}

/// Failure to convert text into an arbitrary-precision number.
///
/// Both variants embed a quoted excerpt of the input that is bounded by
/// [`ErrorReportConfiguration::max_value_excerpt_length`], so an oversized
/// payload is never echoed back in full.
///
/// [`ErrorReportConfiguration::max_value_excerpt_length`]: crate::ErrorReportConfiguration::max_value_excerpt_length
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberParseError {
    /// The input was rejected by the length guard; no digit was examined.
    #[error("Value {excerpt} exceeds the maximum number length ({length} > {max})")]
    TooLong {
        excerpt: String,
        length: usize,
        max: usize,
    },
    /// The input is within bounds but is not a valid number.
    #[error("Value {excerpt} can not be deserialized as `{target}`, reason: {reason}")]
    Malformed {
        excerpt: String,
        target: NumberKind,
        reason: String,
    },
}

/// Identifies one of the raw buffers an [`IoContext`](crate::IoContext) hands
/// out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Byte(ByteBufferKind),
    Char(CharBufferKind),
}

impl core::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Byte(kind) => kind.fmt(f),
            Self::Char(kind) => kind.fmt(f),
        }
    }
}

/// Misuse of the per-operation buffer protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoContextError {
    #[error("I/O context already closed")]
    Closed,
    #[error("`{0}` buffer already allocated; release it before allocating again")]
    BufferAlreadyAllocated(BufferKind),
    #[error("`{0}` buffer released but none was allocated")]
    NotAllocated(BufferKind),
    #[error(
        "released `{kind}` buffer ({released} elements) is smaller than the one allocated ({allocated})"
    )]
    ForeignBuffer {
        kind: BufferKind,
        released: usize,
        allocated: usize,
    },
}

/// Any error produced by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Constraints(#[from] StreamConstraintsError),
    #[error(transparent)]
    Number(#[from] NumberParseError),
    #[error(transparent)]
    Context(#[from] IoContextError),
}
