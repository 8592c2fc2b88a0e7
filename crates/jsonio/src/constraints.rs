//! Resource limits applied while reading and writing token streams.
//!
//! Both constraint types are small immutable `Copy` values. They are built
//! once (usually by [`StreamFactoryBuilder`](crate::StreamFactoryBuilder)) and
//! then handed by value to every [`IoContext`](crate::IoContext) created from
//! the same configuration.
//!
//! # Examples
//!
//! ```rust
//! use jsonio::StreamReadConstraints;
//!
//! let constraints = StreamReadConstraints::builder()
//!     .max_string_length(1_000)
//!     .max_nesting_depth(64)
//!     .build();
//!
//! assert!(constraints.validate_string_length(1_000).is_ok());
//! assert!(constraints.validate_string_length(1_001).is_err());
//! ```

use tracing::debug;

use crate::StreamConstraintsError;

/// Default maximum nesting depth for reading and writing.
pub const DEFAULT_MAX_DEPTH: usize = 1000;
/// Default maximum length of a number token, in characters.
pub const DEFAULT_MAX_NUM_LEN: usize = 1000;
/// Default maximum length of a string value, in characters.
pub const DEFAULT_MAX_STRING_LEN: usize = 20_000_000;
/// Default maximum length of a property name, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 50_000;

/// Limits enforced while reading a document.
///
/// # Default
///
/// | limit | default |
/// |---|---|
/// | nesting depth | [`DEFAULT_MAX_DEPTH`] |
/// | number length | [`DEFAULT_MAX_NUM_LEN`] |
/// | string length | [`DEFAULT_MAX_STRING_LEN`] |
/// | name length | [`DEFAULT_MAX_NAME_LEN`] |
/// | document length | unlimited |
/// | token count | unlimited |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamReadConstraints {
    max_nesting_depth: usize,
    max_document_length: Option<u64>,
    max_token_count: Option<u64>,
    max_number_length: usize,
    max_string_length: usize,
    max_name_length: usize,
}

impl Default for StreamReadConstraints {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            max_document_length: None,
            max_token_count: None,
            max_number_length: DEFAULT_MAX_NUM_LEN,
            max_string_length: DEFAULT_MAX_STRING_LEN,
            max_name_length: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl StreamReadConstraints {
    /// Starts a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> StreamReadConstraintsBuilder {
        StreamReadConstraintsBuilder(Self::default())
    }

    /// Starts a builder seeded with this value.
    #[must_use]
    pub fn rebuild(&self) -> StreamReadConstraintsBuilder {
        StreamReadConstraintsBuilder(*self)
    }

    #[must_use]
    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    /// `None` means unlimited.
    #[must_use]
    pub fn max_document_length(&self) -> Option<u64> {
        self.max_document_length
    }

    /// `None` means unlimited.
    #[must_use]
    pub fn max_token_count(&self) -> Option<u64> {
        self.max_token_count
    }

    #[must_use]
    pub fn max_number_length(&self) -> usize {
        self.max_number_length
    }

    #[must_use]
    pub fn max_string_length(&self) -> usize {
        self.max_string_length
    }

    #[must_use]
    pub fn max_name_length(&self) -> usize {
        self.max_name_length
    }

    /// Checks the length of a string value accumulated so far.
    ///
    /// # Errors
    ///
    /// [`StreamConstraintsError::StringLength`] if `length` exceeds
    /// [`max_string_length`](Self::max_string_length).
    pub fn validate_string_length(&self, length: usize) -> Result<(), StreamConstraintsError> {
        if length > self.max_string_length {
            debug!(length, max = self.max_string_length, "string length limit exceeded");
            return Err(StreamConstraintsError::StringLength {
                length,
                max: self.max_string_length,
            });
        }
        Ok(())
    }

    /// Checks the length of an integral number token.
    ///
    /// # Errors
    ///
    /// [`StreamConstraintsError::NumberLength`] if `length` exceeds
    /// [`max_number_length`](Self::max_number_length).
    pub fn validate_integer_length(&self, length: usize) -> Result<(), StreamConstraintsError> {
        self.validate_number_length(length)
    }

    /// Checks the length of a floating-point number token.
    ///
    /// # Errors
    ///
    /// [`StreamConstraintsError::NumberLength`] if `length` exceeds
    /// [`max_number_length`](Self::max_number_length).
    pub fn validate_fp_length(&self, length: usize) -> Result<(), StreamConstraintsError> {
        self.validate_number_length(length)
    }

    fn validate_number_length(&self, length: usize) -> Result<(), StreamConstraintsError> {
        if length > self.max_number_length {
            debug!(length, max = self.max_number_length, "number length limit exceeded");
            return Err(StreamConstraintsError::NumberLength {
                length,
                max: self.max_number_length,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`StreamConstraintsError::NameLength`] if `length` exceeds
    /// [`max_name_length`](Self::max_name_length).
    pub fn validate_name_length(&self, length: usize) -> Result<(), StreamConstraintsError> {
        if length > self.max_name_length {
            debug!(length, max = self.max_name_length, "name length limit exceeded");
            return Err(StreamConstraintsError::NameLength {
                length,
                max: self.max_name_length,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`StreamConstraintsError::NestingDepth`] if `depth` exceeds
    /// [`max_nesting_depth`](Self::max_nesting_depth).
    pub fn validate_nesting_depth(&self, depth: usize) -> Result<(), StreamConstraintsError> {
        if depth > self.max_nesting_depth {
            debug!(depth, max = self.max_nesting_depth, "read nesting depth exceeded");
            return Err(StreamConstraintsError::NestingDepth {
                depth,
                max: self.max_nesting_depth,
                setting: "StreamReadConstraints::max_nesting_depth",
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`StreamConstraintsError::DocumentLength`] if a maximum is configured and
    /// `length` exceeds it.
    pub fn validate_document_length(&self, length: u64) -> Result<(), StreamConstraintsError> {
        match self.max_document_length {
            Some(max) if length > max => {
                debug!(length, max, "document length limit exceeded");
                Err(StreamConstraintsError::DocumentLength { length, max })
            }
            _ => Ok(()),
        }
    }

    /// # Errors
    ///
    /// [`StreamConstraintsError::TokenCount`] if a maximum is configured and
    /// `count` exceeds it.
    pub fn validate_token_count(&self, count: u64) -> Result<(), StreamConstraintsError> {
        match self.max_token_count {
            Some(max) if count > max => {
                debug!(count, max, "token count limit exceeded");
                Err(StreamConstraintsError::TokenCount { count, max })
            }
            _ => Ok(()),
        }
    }
}

/// Builder for [`StreamReadConstraints`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct StreamReadConstraintsBuilder(StreamReadConstraints);

impl StreamReadConstraintsBuilder {
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.0.max_nesting_depth = depth;
        self
    }

    /// Maximum document length in input units (bytes or chars); `None` removes
    /// the limit.
    pub fn max_document_length(mut self, length: Option<u64>) -> Self {
        self.0.max_document_length = length;
        self
    }

    /// `None` removes the limit.
    pub fn max_token_count(mut self, count: Option<u64>) -> Self {
        self.0.max_token_count = count;
        self
    }

    pub fn max_number_length(mut self, length: usize) -> Self {
        self.0.max_number_length = length;
        self
    }

    pub fn max_string_length(mut self, length: usize) -> Self {
        self.0.max_string_length = length;
        self
    }

    pub fn max_name_length(mut self, length: usize) -> Self {
        self.0.max_name_length = length;
        self
    }

    pub fn build(self) -> StreamReadConstraints {
        self.0
    }
}

/// Limits enforced while generating a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamWriteConstraints {
    max_nesting_depth: usize,
}

impl Default for StreamWriteConstraints {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl StreamWriteConstraints {
    #[must_use]
    pub fn builder() -> StreamWriteConstraintsBuilder {
        StreamWriteConstraintsBuilder(Self::default())
    }

    #[must_use]
    pub fn rebuild(&self) -> StreamWriteConstraintsBuilder {
        StreamWriteConstraintsBuilder(*self)
    }

    #[must_use]
    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    /// # Errors
    ///
    /// [`StreamConstraintsError::NestingDepth`] if `depth` exceeds
    /// [`max_nesting_depth`](Self::max_nesting_depth).
    pub fn validate_nesting_depth(&self, depth: usize) -> Result<(), StreamConstraintsError> {
        if depth > self.max_nesting_depth {
            debug!(depth, max = self.max_nesting_depth, "write nesting depth exceeded");
            return Err(StreamConstraintsError::NestingDepth {
                depth,
                max: self.max_nesting_depth,
                setting: "StreamWriteConstraints::max_nesting_depth",
            });
        }
        Ok(())
    }
}

/// Builder for [`StreamWriteConstraints`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct StreamWriteConstraintsBuilder(StreamWriteConstraints);

impl StreamWriteConstraintsBuilder {
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.0.max_nesting_depth = depth;
        self
    }

    pub fn build(self) -> StreamWriteConstraints {
        self.0
    }
}
