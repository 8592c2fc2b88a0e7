//! Reusable scratch buffers for a single parse or generate operation.
//!
//! A [`BufferRecycler`] holds at most one array per purpose. Arrays are moved
//! out to the caller on allocation and moved back on release, so ownership,
//! not locking, guarantees that no two users touch the same array.

use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::trace;

static NEXT_RECYCLER_ID: AtomicU64 = AtomicU64::new(1);

/// Purposes of the byte buffers held by a [`BufferRecycler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteBufferKind {
    /// Raw input read from a byte source.
    ReadIo,
    /// Encoded output waiting to be written.
    WriteEncoding,
    /// Concatenation of small output chunks.
    WriteConcat,
    /// Base64 encoding/decoding scratch.
    Base64Codec,
}

impl ByteBufferKind {
    pub const ALL: [Self; 4] = [
        Self::ReadIo,
        Self::WriteEncoding,
        Self::WriteConcat,
        Self::Base64Codec,
    ];

    /// Size of a freshly allocated buffer of this kind.
    #[must_use]
    pub const fn default_size(self) -> usize {
        match self {
            Self::ReadIo | Self::WriteEncoding => 8000,
            Self::WriteConcat | Self::Base64Codec => 2000,
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ByteBufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadIo => "read-io",
            Self::WriteEncoding => "write-encoding",
            Self::WriteConcat => "write-concat",
            Self::Base64Codec => "base64-codec",
        })
    }
}

/// Purposes of the character buffers held by a [`BufferRecycler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharBufferKind {
    /// Decoded input characters awaiting tokenization.
    TokenBuffer,
    /// Characters being concatenated for output.
    ConcatBuffer,
    /// First segment of a [`TextBuffer`](crate::TextBuffer).
    TextBuffer,
    /// Copy of a property name.
    NameCopyBuffer,
}

impl CharBufferKind {
    pub const ALL: [Self; 4] = [
        Self::TokenBuffer,
        Self::ConcatBuffer,
        Self::TextBuffer,
        Self::NameCopyBuffer,
    ];

    #[must_use]
    pub const fn default_size(self) -> usize {
        match self {
            Self::TokenBuffer | Self::ConcatBuffer => 4000,
            Self::TextBuffer | Self::NameCopyBuffer => 200,
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CharBufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TokenBuffer => "token",
            Self::ConcatBuffer => "concat",
            Self::TextBuffer => "text",
            Self::NameCopyBuffer => "name-copy",
        })
    }
}

/// A small set of reusable scratch arrays keyed by purpose.
///
/// Obtained from a [`BufferRecyclerPool`](crate::BufferRecyclerPool); owned by
/// exactly one operation at a time. Contents are not cleared between
/// operations.
#[derive(Debug)]
pub struct BufferRecycler {
    id: u64,
    byte_buffers: [Option<Vec<u8>>; 4],
    char_buffers: [Option<Vec<char>>; 4],
}

impl Default for BufferRecycler {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferRecycler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_RECYCLER_ID.fetch_add(1, Ordering::Relaxed),
            ..Self::vacant()
        }
    }

    /// Placeholder left behind when a recycler is moved out of a handle.
    pub(crate) const fn vacant() -> Self {
        Self {
            id: 0,
            byte_buffers: [None, None, None, None],
            char_buffers: [None, None, None, None],
        }
    }

    /// Process-unique identity of this recycler.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Takes the held byte buffer for `kind` if it has at least
    /// `max(min_size, kind.default_size())` elements, otherwise allocates one
    /// of that size. A held buffer that is too small is discarded.
    pub fn alloc_byte_buffer(&mut self, kind: ByteBufferKind, min_size: usize) -> Vec<u8> {
        let size = min_size.max(kind.default_size());
        match self.byte_buffers[kind.index()].take() {
            Some(buf) if buf.len() >= size => buf,
            _ => {
                trace!(recycler = self.id, %kind, size, "allocating byte buffer");
                vec![0; size]
            }
        }
    }

    /// Character counterpart of [`alloc_byte_buffer`](Self::alloc_byte_buffer).
    pub fn alloc_char_buffer(&mut self, kind: CharBufferKind, min_size: usize) -> Vec<char> {
        let size = min_size.max(kind.default_size());
        match self.char_buffers[kind.index()].take() {
            Some(buf) if buf.len() >= size => buf,
            _ => {
                trace!(recycler = self.id, %kind, size, "allocating char buffer");
                vec!['\0'; size]
            }
        }
    }

    /// Returns a byte buffer; the larger of the held and returned buffers is
    /// kept.
    pub fn release_byte_buffer(&mut self, kind: ByteBufferKind, buf: Vec<u8>) {
        let slot = &mut self.byte_buffers[kind.index()];
        if slot.as_ref().is_none_or(|held| held.len() < buf.len()) {
            *slot = Some(buf);
        }
    }

    pub fn release_char_buffer(&mut self, kind: CharBufferKind, buf: Vec<char>) {
        let slot = &mut self.char_buffers[kind.index()];
        if slot.as_ref().is_none_or(|held| held.len() < buf.len()) {
            *slot = Some(buf);
        }
    }

    /// Length of the byte buffer currently held for `kind`, if any.
    #[must_use]
    pub fn held_byte_buffer_len(&self, kind: ByteBufferKind) -> Option<usize> {
        self.byte_buffers[kind.index()].as_ref().map(Vec::len)
    }

    #[must_use]
    pub fn held_char_buffer_len(&self, kind: CharBufferKind) -> Option<usize> {
        self.char_buffers[kind.index()].as_ref().map(Vec::len)
    }
}
