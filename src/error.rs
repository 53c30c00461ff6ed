use thiserror::Error;

/// Result alias used across the library.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors raised by the loader, annotators, aggregator, combiner and the
/// orchestration around them.
///
/// Only [`ExportError::NotFound`] is recoverable: the batch loop logs it and
/// moves on to the next series. Everything else ends the run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Time series not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Duplicate row index {index} in {source_name}")]
    DuplicateRow { index: usize, source_name: String },

    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Unknown time series identifier: {0}")]
    UnknownSeries(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store request failed: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ExportError {
    /// Returns `true` for errors the batch loop skips over instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExportError::NotFound(_))
    }
}
