use crate::{
    BufferRecyclerPool, ContentReference, ErrorReportConfiguration, IoContext, JsonEncoding,
    StreamReadConstraints, StreamWriteConstraints,
};

/// Immutable configuration shared by every operation it starts.
///
/// Cloning is cheap: constraints are `Copy` and the pool is reference-counted.
///
/// ```rust
/// use jsonio::{ContentReference, JsonEncoding, StreamFactory, StreamReadConstraints};
///
/// let factory = StreamFactory::builder()
///     .stream_read_constraints(StreamReadConstraints::builder().max_number_length(50).build())
///     .build();
///
/// let mut ctx = factory.new_io_context(ContentReference::text("12"), JsonEncoding::Utf8, false);
/// let mut text = ctx.construct_text_buffer().unwrap();
/// text.push_str("12").unwrap();
/// let value = text.contents_as_big_integer(&ctx.number_parser()).unwrap();
/// assert_eq!(value, 12.into());
/// ctx.release_text_buffer(text);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamFactory {
    read_constraints: StreamReadConstraints,
    write_constraints: StreamWriteConstraints,
    error_report: ErrorReportConfiguration,
    pool: BufferRecyclerPool,
}

impl StreamFactory {
    #[must_use]
    pub fn builder() -> StreamFactoryBuilder {
        StreamFactoryBuilder::default()
    }

    /// A builder seeded with this factory's configuration.
    #[must_use]
    pub fn rebuild(&self) -> StreamFactoryBuilder {
        StreamFactoryBuilder(self.clone())
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
    pub fn recycler_pool(&self) -> &BufferRecyclerPool {
        &self.pool
    }

    /// Starts an operation: acquires a recycler from the pool and wraps it,
    /// with this factory's configuration, into a fresh [`IoContext`].
    #[must_use]
    pub fn new_io_context(
        &self,
        content: ContentReference,
        encoding: JsonEncoding,
        resource_managed: bool,
    ) -> IoContext {
        IoContext::new(
            self.read_constraints,
            self.write_constraints,
            self.error_report,
            self.pool.acquire(),
            content,
            resource_managed,
            encoding,
        )
    }
}

/// Chainable configuration for a [`StreamFactory`].
#[derive(Debug, Clone, Default)]
pub struct StreamFactoryBuilder(StreamFactory);

impl StreamFactoryBuilder {
    #[must_use]
    pub fn stream_read_constraints(mut self, constraints: StreamReadConstraints) -> Self {
        self.0.read_constraints = constraints;
        self
    }

    #[must_use]
    pub fn stream_write_constraints(mut self, constraints: StreamWriteConstraints) -> Self {
        self.0.write_constraints = constraints;
        self
    }

    #[must_use]
    pub fn error_report_configuration(mut self, config: ErrorReportConfiguration) -> Self {
        self.0.error_report = config;
        self
    }

    #[must_use]
    pub fn recycler_pool(mut self, pool: BufferRecyclerPool) -> Self {
        self.0.pool = pool;
        self
    }

    #[must_use]
    pub fn build(self) -> StreamFactory {
        self.0
    }
}
