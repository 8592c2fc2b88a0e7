use core::fmt::{self, Write};
use std::sync::Arc;

use bstr::BStr;

use crate::ErrorReportConfiguration;

/// Character encoding declared for a byte-oriented source or destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JsonEncoding {
    #[default]
    Utf8,
    Utf16Be,
    Utf16Le,
    Utf32Be,
    Utf32Le,
}

impl JsonEncoding {
    /// Canonical encoding name, e.g. `"UTF-16BE"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf32Be => "UTF-32BE",
            Self::Utf32Le => "UTF-32LE",
        }
    }

    /// Size of one code unit in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Utf8 => 8,
            Self::Utf16Be | Self::Utf16Le => 16,
            Self::Utf32Be | Self::Utf32Le => 32,
        }
    }

    #[must_use]
    pub const fn is_big_endian(self) -> bool {
        matches!(self, Self::Utf16Be | Self::Utf32Be)
    }
}

impl fmt::Display for JsonEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Unknown,
    Redacted,
    Raw(Arc<str>),
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
}

/// Describes where the content of an operation comes from, for diagnostics
/// only.
///
/// Text and byte references keep the content (shared, not copied) so that an
/// error location can quote the surrounding input; the quote is bounded by
/// [`ErrorReportConfiguration::max_raw_content_length`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReference {
    content: Content,
    offset: usize,
    length: Option<usize>,
}

impl Default for ContentReference {
    fn default() -> Self {
        Self::unknown()
    }
}

impl ContentReference {
    fn new(content: Content) -> Self {
        Self {
            content,
            offset: 0,
            length: None,
        }
    }

    /// Nothing is known about the source.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(Content::Unknown)
    }

    /// The source is known but must not be included in diagnostics.
    #[must_use]
    pub fn redacted() -> Self {
        Self::new(Content::Redacted)
    }

    /// A free-form description of the source, such as a file name.
    #[must_use]
    pub fn raw(description: impl Into<Arc<str>>) -> Self {
        Self::new(Content::Raw(description.into()))
    }

    /// Textual content; offsets are in characters.
    #[must_use]
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Self::new(Content::Text(text.into()))
    }

    /// Binary content; offsets are in bytes.
    #[must_use]
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(Content::Bytes(bytes.into()))
    }

    /// Restricts the reference to `length` units starting at `offset`.
    #[must_use]
    pub fn with_window(&self, offset: usize, length: usize) -> Self {
        Self {
            content: self.content.clone(),
            offset,
            length: Some(length),
        }
    }

    /// Whether offsets into this content count characters rather than bytes.
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(self.content, Content::Text(_))
    }

    /// Whether the referenced content itself is available for quoting.
    #[must_use]
    pub fn has_content(&self) -> bool {
        matches!(self.content, Content::Text(_) | Content::Bytes(_))
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    /// Human-readable description of the source, quoting at most
    /// `max_raw_content_length` units of content.
    #[must_use]
    pub fn source_description(&self, config: &ErrorReportConfiguration) -> String {
        let max = config.max_raw_content_length();
        let mut out = String::new();
        match &self.content {
            Content::Unknown => out.push_str("UNKNOWN"),
            Content::Redacted => out.push_str("REDACTED (source inclusion disabled)"),
            Content::Raw(description) => out.push_str(description),
            Content::Text(text) => {
                let mut window = text
                    .chars()
                    .skip(self.offset)
                    .take(self.length.unwrap_or(usize::MAX));
                out.push_str("(text)\"");
                out.extend(window.by_ref().take(max));
                out.push('"');
                let rest = window.count();
                if rest > 0 {
                    let _ = write!(out, "[truncated {rest} chars]");
                }
            }
            Content::Bytes(bytes) => {
                let start = self.offset.min(bytes.len());
                let end = self
                    .length
                    .map_or(bytes.len(), |len| start.saturating_add(len).min(bytes.len()));
                let window = &bytes[start..end];
                let shown = window.len().min(max);
                let _ = write!(out, "(bytes)\"{}\"", BStr::new(&window[..shown]));
                if window.len() > shown {
                    let _ = write!(out, "[truncated {} bytes]", window.len() - shown);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize) -> ErrorReportConfiguration {
        ErrorReportConfiguration::builder()
            .max_raw_content_length(max)
            .build()
    }

    #[test]
    fn encoding_properties() {
        assert_eq!(JsonEncoding::default(), JsonEncoding::Utf8);
        assert_eq!(JsonEncoding::Utf16Le.bits(), 16);
        assert!(JsonEncoding::Utf32Be.is_big_endian());
        assert!(!JsonEncoding::Utf8.is_big_endian());
        assert_eq!(JsonEncoding::Utf16Be.to_string(), "UTF-16BE");
    }

    #[test]
    fn descriptions_without_content() {
        assert_eq!(ContentReference::unknown().source_description(&config(10)), "UNKNOWN");
        assert!(
            ContentReference::redacted()
                .source_description(&config(10))
                .starts_with("REDACTED")
        );
        assert_eq!(ContentReference::raw("N/A").source_description(&config(10)), "N/A");
        assert!(!ContentReference::raw("N/A").has_content());
    }

    #[test]
    fn text_is_windowed_and_truncated() {
        let r = ContentReference::text("héllo, world");
        assert!(r.is_textual());
        assert_eq!(r.source_description(&config(5)), "(text)\"héllo\"[truncated 7 chars]");
        assert_eq!(
            r.with_window(7, 5).source_description(&config(100)),
            "(text)\"world\""
        );
    }

    #[test]
    fn long_text_is_quoted_without_copying_the_window() {
        let r = ContentReference::text("x".repeat(1_000_000));
        let description = r.source_description(&config(3));
        assert_eq!(description, "(text)\"xxx\"[truncated 999997 chars]");
        assert!(description.capacity() < 1_000);
    }

    #[test]
    fn bytes_render_lossily() {
        let r = ContentReference::bytes(&b"ab\xFFcd"[..]);
        assert!(!r.is_textual());
        assert_eq!(r.source_description(&config(100)), "(bytes)\"ab\u{FFFD}cd\"");
        assert_eq!(
            r.source_description(&config(2)),
            "(bytes)\"ab\"[truncated 3 bytes]"
        );
        // windows past the end are clamped
        assert_eq!(r.with_window(10, 3).source_description(&config(2)), "(bytes)\"\"");
    }
}
