//! Per-operation owner of a recycler and the buffers borrowed from it.

use tracing::trace;

use crate::{
    BufferKind, BufferRecycler, ByteBufferKind, CharBufferKind, ContentReference,
    ErrorReportConfiguration, IoContextError, JsonEncoding, NumberParser, PooledRecycler,
    StreamReadConstraints, StreamWriteConstraints, TextBuffer,
};

/// State shared by the reader or writer of one parse/generate operation.
///
/// An `IoContext` owns the [`PooledRecycler`] acquired for the operation and
/// hands out its buffers, each purpose at most once at a time. Closing the
/// context (explicitly or on drop) returns the recycler to the pool that
/// issued it.
#[derive(Debug)]
pub struct IoContext {
    read_constraints: StreamReadConstraints,
    write_constraints: StreamWriteConstraints,
    error_report: ErrorReportConfiguration,
    content: ContentReference,
    resource_managed: bool,
    encoding: JsonEncoding,
    /// `None` once closed.
    recycler: Option<PooledRecycler>,
    // lengths of the buffers currently handed out, by kind index
    bytes_out: [Option<usize>; 4],
    chars_out: [Option<usize>; 4],
}

impl IoContext {
    #[must_use]
    pub fn new(
        read_constraints: StreamReadConstraints,
        write_constraints: StreamWriteConstraints,
        error_report: ErrorReportConfiguration,
        recycler: PooledRecycler,
        content: ContentReference,
        resource_managed: bool,
        encoding: JsonEncoding,
    ) -> Self {
        Self {
            read_constraints,
            write_constraints,
            error_report,
            content,
            resource_managed,
            encoding,
            recycler: Some(recycler),
            bytes_out: [None; 4],
            chars_out: [None; 4],
        }
    }

    #[must_use]
    pub fn stream_read_constraints(&self) -> &StreamReadConstraints {
        &self.read_constraints
    }

    #[must_use]
    pub fn stream_write_constraints(&self) -> &StreamWriteConstraints {
        &self.write_constraints
    }

    #[must_use]
    pub fn error_report_configuration(&self) -> &ErrorReportConfiguration {
        &self.error_report
    }

    #[must_use]
    pub fn content_reference(&self) -> &ContentReference {
        &self.content
    }

    #[must_use]
    pub fn encoding(&self) -> JsonEncoding {
        self.encoding
    }

    /// Records the encoding once it has been detected from the input.
    pub fn set_encoding(&mut self, encoding: JsonEncoding) {
        self.encoding = encoding;
    }

    /// Whether the operation owns the underlying source/destination and is
    /// expected to close it.
    #[must_use]
    pub fn is_resource_managed(&self) -> bool {
        self.resource_managed
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.recycler.is_none()
    }

    /// The recycler backing this context, if still open.
    #[must_use]
    pub fn recycler(&self) -> Option<&BufferRecycler> {
        self.recycler.as_deref()
    }

    fn recycler_mut(&mut self) -> Result<&mut BufferRecycler, IoContextError> {
        self.recycler.as_deref_mut().ok_or(IoContextError::Closed)
    }

    /// A [`NumberParser`] bound by this context's number-length limit and
    /// excerpt length.
    #[must_use]
    pub fn number_parser(&self) -> NumberParser {
        NumberParser::new(&self.read_constraints, &self.error_report)
    }

    /// Windowed copy of the content reference, for error locations.
    #[must_use]
    pub fn construct_content_reference(&self, offset: usize, length: usize) -> ContentReference {
        self.content.with_window(offset, length)
    }

    // -- text buffers -------------------------------------------------------

    /// A [`TextBuffer`] enforcing the read constraints, seeded with the
    /// recycler's text segment.
    ///
    /// # Errors
    ///
    /// [`IoContextError::Closed`] after [`close`](Self::close).
    pub fn construct_text_buffer(&mut self) -> Result<TextBuffer, IoContextError> {
        let constraints = self.read_constraints;
        let initial = self
            .recycler_mut()?
            .alloc_char_buffer(CharBufferKind::TextBuffer, 0);
        Ok(TextBuffer::from_parts(Some(constraints), Some(initial)))
    }

    /// A [`TextBuffer`] without a length limit, for generator-side use.
    ///
    /// # Errors
    ///
    /// [`IoContextError::Closed`] after [`close`](Self::close).
    pub fn construct_unconstrained_text_buffer(&mut self) -> Result<TextBuffer, IoContextError> {
        let initial = self
            .recycler_mut()?
            .alloc_char_buffer(CharBufferKind::TextBuffer, 0);
        Ok(TextBuffer::from_parts(None, Some(initial)))
    }

    /// Hands the buffer's largest segment back to the recycler. On a closed
    /// context the buffer is simply dropped.
    pub fn release_text_buffer(&mut self, mut buffer: TextBuffer) {
        if let Some(recycler) = self.recycler.as_deref_mut() {
            buffer.release_buffers(recycler);
        }
    }

    // -- raw buffers --------------------------------------------------------

    fn alloc_bytes(
        &mut self,
        kind: ByteBufferKind,
        min_size: usize,
    ) -> Result<Vec<u8>, IoContextError> {
        if self.bytes_out[kind.index()].is_some() {
            return Err(IoContextError::BufferAlreadyAllocated(BufferKind::Byte(kind)));
        }
        let buf = self.recycler_mut()?.alloc_byte_buffer(kind, min_size);
        self.bytes_out[kind.index()] = Some(buf.len());
        Ok(buf)
    }

    fn alloc_chars(
        &mut self,
        kind: CharBufferKind,
        min_size: usize,
    ) -> Result<Vec<char>, IoContextError> {
        if self.chars_out[kind.index()].is_some() {
            return Err(IoContextError::BufferAlreadyAllocated(BufferKind::Char(kind)));
        }
        let buf = self.recycler_mut()?.alloc_char_buffer(kind, min_size);
        self.chars_out[kind.index()] = Some(buf.len());
        Ok(buf)
    }

    fn release_bytes(&mut self, kind: ByteBufferKind, buf: Vec<u8>) -> Result<(), IoContextError> {
        let allocated = check_release(
            BufferKind::Byte(kind),
            self.bytes_out[kind.index()],
            buf.len(),
        )?;
        self.bytes_out[kind.index()] = None;
        match self.recycler.as_deref_mut() {
            Some(recycler) => recycler.release_byte_buffer(kind, buf),
            None => trace!(%kind, allocated, "dropping buffer released after close"),
        }
        Ok(())
    }

    fn release_chars(
        &mut self,
        kind: CharBufferKind,
        buf: Vec<char>,
    ) -> Result<(), IoContextError> {
        let allocated = check_release(
            BufferKind::Char(kind),
            self.chars_out[kind.index()],
            buf.len(),
        )?;
        self.chars_out[kind.index()] = None;
        match self.recycler.as_deref_mut() {
            Some(recycler) => recycler.release_char_buffer(kind, buf),
            None => trace!(%kind, allocated, "dropping buffer released after close"),
        }
        Ok(())
    }

    /// Buffer for raw input.
    ///
    /// # Errors
    ///
    /// [`IoContextError::BufferAlreadyAllocated`] while a previous read buffer
    /// is outstanding, [`IoContextError::Closed`] after
    /// [`close`](Self::close). The same applies to every `alloc_*` method.
    pub fn alloc_read_io_buffer(&mut self) -> Result<Vec<u8>, IoContextError> {
        self.alloc_bytes(ByteBufferKind::ReadIo, 0)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_read_io_buffer_with(
        &mut self,
        min_size: usize,
    ) -> Result<Vec<u8>, IoContextError> {
        self.alloc_bytes(ByteBufferKind::ReadIo, min_size)
    }

    /// Returns a buffer obtained from
    /// [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    ///
    /// # Errors
    ///
    /// [`IoContextError::NotAllocated`] if no read buffer is outstanding,
    /// [`IoContextError::ForeignBuffer`] if `buf` is smaller than the buffer
    /// handed out. The same applies to every `release_*` method.
    pub fn release_read_io_buffer(&mut self, buf: Vec<u8>) -> Result<(), IoContextError> {
        self.release_bytes(ByteBufferKind::ReadIo, buf)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_write_encoding_buffer(&mut self) -> Result<Vec<u8>, IoContextError> {
        self.alloc_bytes(ByteBufferKind::WriteEncoding, 0)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_write_encoding_buffer_with(
        &mut self,
        min_size: usize,
    ) -> Result<Vec<u8>, IoContextError> {
        self.alloc_bytes(ByteBufferKind::WriteEncoding, min_size)
    }

    /// # Errors
    ///
    /// See [`release_read_io_buffer`](Self::release_read_io_buffer).
    pub fn release_write_encoding_buffer(&mut self, buf: Vec<u8>) -> Result<(), IoContextError> {
        self.release_bytes(ByteBufferKind::WriteEncoding, buf)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_base64_buffer(&mut self) -> Result<Vec<u8>, IoContextError> {
        self.alloc_bytes(ByteBufferKind::Base64Codec, 0)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_base64_buffer_with(&mut self, min_size: usize) -> Result<Vec<u8>, IoContextError> {
        self.alloc_bytes(ByteBufferKind::Base64Codec, min_size)
    }

    /// # Errors
    ///
    /// See [`release_read_io_buffer`](Self::release_read_io_buffer).
    pub fn release_base64_buffer(&mut self, buf: Vec<u8>) -> Result<(), IoContextError> {
        self.release_bytes(ByteBufferKind::Base64Codec, buf)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_token_buffer(&mut self) -> Result<Vec<char>, IoContextError> {
        self.alloc_chars(CharBufferKind::TokenBuffer, 0)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_token_buffer_with(
        &mut self,
        min_size: usize,
    ) -> Result<Vec<char>, IoContextError> {
        self.alloc_chars(CharBufferKind::TokenBuffer, min_size)
    }

    /// # Errors
    ///
    /// See [`release_read_io_buffer`](Self::release_read_io_buffer).
    pub fn release_token_buffer(&mut self, buf: Vec<char>) -> Result<(), IoContextError> {
        self.release_chars(CharBufferKind::TokenBuffer, buf)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_concat_buffer(&mut self) -> Result<Vec<char>, IoContextError> {
        self.alloc_chars(CharBufferKind::ConcatBuffer, 0)
    }

    /// # Errors
    ///
    /// See [`release_read_io_buffer`](Self::release_read_io_buffer).
    pub fn release_concat_buffer(&mut self, buf: Vec<char>) -> Result<(), IoContextError> {
        self.release_chars(CharBufferKind::ConcatBuffer, buf)
    }

    /// # Errors
    ///
    /// See [`alloc_read_io_buffer`](Self::alloc_read_io_buffer).
    pub fn alloc_name_copy_buffer(&mut self, min_size: usize) -> Result<Vec<char>, IoContextError> {
        self.alloc_chars(CharBufferKind::NameCopyBuffer, min_size)
    }

    /// # Errors
    ///
    /// See [`release_read_io_buffer`](Self::release_read_io_buffer).
    pub fn release_name_copy_buffer(&mut self, buf: Vec<char>) -> Result<(), IoContextError> {
        self.release_chars(CharBufferKind::NameCopyBuffer, buf)
    }

    /// Returns the recycler to its pool. Later calls do nothing.
    pub fn close(&mut self) {
        if let Some(recycler) = self.recycler.take() {
            trace!(recycler = recycler.id(), "closing I/O context");
            recycler.release();
        }
    }
}

impl Drop for IoContext {
    fn drop(&mut self) {
        self.close();
    }
}

fn check_release(
    kind: BufferKind,
    outstanding: Option<usize>,
    released: usize,
) -> Result<usize, IoContextError> {
    let allocated = outstanding.ok_or(IoContextError::NotAllocated(kind))?;
    if released < allocated {
        return Err(IoContextError::ForeignBuffer {
            kind,
            released,
            allocated,
        });
    }
    Ok(allocated)
}
