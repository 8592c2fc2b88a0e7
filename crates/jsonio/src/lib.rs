//! Buffer recycling and processing limits for JSON readers and writers.
//!
//! Each parse or generate operation gets an [`IoContext`] from a
//! [`StreamFactory`]. The context owns a [`BufferRecycler`] borrowed from a
//! [`BufferRecyclerPool`], hands out scratch buffers and [`TextBuffer`]s that
//! enforce [`StreamReadConstraints`], and converts number tokens with a
//! length-guarded [`NumberParser`]. Dropping or closing the context returns
//! the recycler to its pool.
//!
//! ```rust
//! use jsonio::{BufferRecyclerPool, ContentReference, JsonEncoding, StreamFactory};
//!
//! let factory = StreamFactory::builder()
//!     .recycler_pool(BufferRecyclerPool::bounded(16))
//!     .build();
//! let mut ctx = factory.new_io_context(ContentReference::unknown(), JsonEncoding::Utf8, true);
//!
//! let input = ctx.alloc_read_io_buffer().unwrap();
//! assert!(input.len() >= 8000);
//! ctx.release_read_io_buffer(input).unwrap();
//!
//! ctx.close();
//! assert_eq!(factory.recycler_pool().pooled_count(), 1);
//! ```

#![allow(missing_docs)]

mod constraints;
mod content;
mod error;
mod error_report;
mod factory;
mod io_context;
mod numbers;
mod pool;
mod recycler;
mod text_buffer;

#[cfg(test)]
mod tests;

pub use constraints::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_NAME_LEN, DEFAULT_MAX_NUM_LEN, DEFAULT_MAX_STRING_LEN,
    StreamReadConstraints, StreamReadConstraintsBuilder, StreamWriteConstraints,
    StreamWriteConstraintsBuilder,
};
pub use content::{ContentReference, JsonEncoding};
pub use error::{BufferKind, Error, IoContextError, NumberParseError, StreamConstraintsError};
pub use error_report::{
    DEFAULT_MAX_ERROR_TOKEN_LENGTH, DEFAULT_MAX_RAW_CONTENT_LENGTH,
    DEFAULT_MAX_VALUE_EXCERPT_LENGTH, ErrorReportConfiguration, ErrorReportConfigurationBuilder,
};
pub use factory::{StreamFactory, StreamFactoryBuilder};
pub use io_context::IoContext;
pub use numbers::{
    FAST_PATH_DIGIT_LIMIT, NumberKind, NumberParser, parse_big_decimal, parse_big_decimal_fast,
    parse_big_integer, parse_big_integer_fast,
};
pub use pool::{BufferRecyclerPool, DEFAULT_BOUNDED_CAPACITY, PoolKind, PooledRecycler};
pub use recycler::{BufferRecycler, ByteBufferKind, CharBufferKind};
pub use text_buffer::{MAX_SEGMENT_LEN, MIN_SEGMENT_LEN, TextBuffer};

pub use bigdecimal::BigDecimal;
pub use num_bigint::BigInt;
