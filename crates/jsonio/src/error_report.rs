/// Default maximum length of a token quoted in an error message.
pub const DEFAULT_MAX_ERROR_TOKEN_LENGTH: usize = 256;
/// Default maximum amount of source content included in a location
/// description.
pub const DEFAULT_MAX_RAW_CONTENT_LENGTH: usize = 500;
/// Default maximum number of characters of an offending value quoted in a
/// number parsing error.
pub const DEFAULT_MAX_VALUE_EXCERPT_LENGTH: usize = 60;

/// Controls how much input is echoed back in diagnostics.
///
/// Error messages built from attacker-controlled input quote at most the
/// configured number of characters, so a huge payload cannot turn into an
/// equally huge log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ErrorReportConfiguration {
    max_error_token_length: usize,
    max_raw_content_length: usize,
    max_value_excerpt_length: usize,
}

impl Default for ErrorReportConfiguration {
    fn default() -> Self {
        Self {
            max_error_token_length: DEFAULT_MAX_ERROR_TOKEN_LENGTH,
            max_raw_content_length: DEFAULT_MAX_RAW_CONTENT_LENGTH,
            max_value_excerpt_length: DEFAULT_MAX_VALUE_EXCERPT_LENGTH,
        }
    }
}

impl ErrorReportConfiguration {
    #[must_use]
    pub fn builder() -> ErrorReportConfigurationBuilder {
        ErrorReportConfigurationBuilder(Self::default())
    }

    #[must_use]
    pub fn rebuild(&self) -> ErrorReportConfigurationBuilder {
        ErrorReportConfigurationBuilder(*self)
    }

    /// Maximum length of an invalid token quoted in an error message.
    #[must_use]
    pub fn max_error_token_length(&self) -> usize {
        self.max_error_token_length
    }

    /// Maximum amount of source content included in a source description.
    #[must_use]
    pub fn max_raw_content_length(&self) -> usize {
        self.max_raw_content_length
    }

    /// Maximum number of characters of a rejected numeric value quoted in a
    /// [`NumberParseError`](crate::NumberParseError).
    #[must_use]
    pub fn max_value_excerpt_length(&self) -> usize {
        self.max_value_excerpt_length
    }

    /// Quotes `value` for an error message, truncated to
    /// [`max_value_excerpt_length`](Self::max_value_excerpt_length) characters.
    #[must_use]
    pub fn value_excerpt(&self, value: &str) -> String {
        quoted_excerpt(value, self.max_value_excerpt_length)
    }
}

/// Builder for [`ErrorReportConfiguration`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct ErrorReportConfigurationBuilder(ErrorReportConfiguration);

impl ErrorReportConfigurationBuilder {
    pub fn max_error_token_length(mut self, length: usize) -> Self {
        self.0.max_error_token_length = length;
        self
    }

    pub fn max_raw_content_length(mut self, length: usize) -> Self {
        self.0.max_raw_content_length = length;
        self
    }

    pub fn max_value_excerpt_length(mut self, length: usize) -> Self {
        self.0.max_value_excerpt_length = length;
        self
    }

    pub fn build(self) -> ErrorReportConfiguration {
        self.0
    }
}

/// `"value"` when short enough, otherwise the first `max_chars` characters
/// followed by a `[truncated N bytes]` marker.
///
/// Only the prefix is scanned; the cost does not depend on the length of
/// `value`.
pub(crate) fn quoted_excerpt(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        None => format!("\"{value}\""),
        Some((cut, _)) => format!(
            "\"{}\" [truncated {} bytes]",
            &value[..cut],
            value.len() - cut
        ),
    }
}
