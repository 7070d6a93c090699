use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// An extractor emitted zero rows for a table with no registered
    /// fallback schema. Programming error; fails loud.
    #[error("no fallback schema declared for empty table '{0}'")]
    MissingFallbackSchema(String),

    /// A batch arrived for a query shape with no registered extractor.
    /// Soft: normalization is skipped, the raw tier is still written.
    #[error("no extractor registered for query shape '{0}'")]
    UnknownQueryShape(String),
}
