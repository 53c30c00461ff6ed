//! Trait for the remote time-series store.

use crate::error::ExportResult;
use crate::model::CorrectedSeries;

/// Abstraction over a time-series store (e.g., AQUARIUS Publish).
#[async_trait::async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Resolves a qualified `<Parameter>.<Label>@<Location>` name to the
    /// store's unique series id.
    ///
    /// Returns [`ExportError::NotFound`](crate::error::ExportError::NotFound)
    /// when the location has no such series.
    async fn resolve_series_id(&self, qualified_name: &str) -> ExportResult<String>;

    /// Fetches the corrected points with their grade, approval and note
    /// intervals.
    async fn fetch_corrected_series(&self, unique_id: &str) -> ExportResult<CorrectedSeries>;
}
