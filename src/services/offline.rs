use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::store_api::TimeSeriesStore;
use crate::error::{ExportError, ExportResult};
use crate::model::CorrectedSeries;

/// A store backed by corrected-series payloads held in memory.
///
/// Series ids are the qualified names themselves. Used for offline runs
/// against saved `GetTimeSeriesCorrectedData` responses and in tests.
#[derive(Debug, Default)]
pub struct OfflineStore {
    series: HashMap<String, CorrectedSeries>,
}

impl OfflineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qualified_name: impl Into<String>, series: CorrectedSeries) {
        self.series.insert(qualified_name.into(), series);
    }

    /// Loads every `*.json` file in `dir`. The file stem is the qualified
    /// name, e.g. `Water Temp.Water Temperature (C) HOBO@ROMO_001.json`.
    pub fn load_dir(dir: &Path) -> ExportResult<Self> {
        let mut store = Self::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            let series: CorrectedSeries = serde_json::from_str(&content)
                .map_err(|e| ExportError::Parse(format!("{}: {e}", path.display())))?;
            debug!(series = name, points = series.points.len(), "Loaded offline series");
            store.insert(name, series);
        }

        Ok(store)
    }
}

#[async_trait]
impl TimeSeriesStore for OfflineStore {
    async fn resolve_series_id(&self, qualified_name: &str) -> ExportResult<String> {
        if self.series.contains_key(qualified_name) {
            Ok(qualified_name.to_string())
        } else {
            Err(ExportError::NotFound(qualified_name.to_string()))
        }
    }

    async fn fetch_corrected_series(&self, unique_id: &str) -> ExportResult<CorrectedSeries> {
        self.series
            .get(unique_id)
            .cloned()
            .ok_or_else(|| ExportError::NotFound(unique_id.to_string()))
    }
}
