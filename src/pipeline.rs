use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::analyzers::{Granularity, aggregate, join_grade_names};
use crate::annotate::{apply_approvals, apply_grades, apply_notes};
use crate::combine::combine_files;
use crate::error::{ExportError, ExportResult};
use crate::model::{AnnotatedPoint, CorrectedSeries};
use crate::output::{bucket_table, combined_output_path, raw_table, site_output_path};
use crate::parser::load_points;
use crate::runlog::RunLog;
use crate::series::SeriesSpec;
use crate::services::TimeSeriesStore;
use crate::sites::{Protocol, SiteKey};

/// Run-wide export settings.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub protocol: Protocol,
    pub granularities: Vec<Granularity>,
    pub out_dir: PathBuf,
    /// File name prefix, e.g. `ROMO_AirTemp`.
    pub prefix: String,
}

impl ExportSettings {
    /// Requested granularities in first-seen order, each once.
    pub fn distinct_granularities(&self) -> Vec<Granularity> {
        let mut seen = Vec::with_capacity(self.granularities.len());
        for &g in &self.granularities {
            if !seen.contains(&g) {
                seen.push(g);
            }
        }
        seen
    }
}

/// Paths written so far, per granularity, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFiles {
    files: BTreeMap<Granularity, Vec<PathBuf>>,
}

impl OutputFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, granularity: Granularity, path: PathBuf) {
        self.files.entry(granularity).or_default().push(path);
    }

    /// Appends everything in `other`, keeping its order after ours.
    pub fn extend(&mut self, other: OutputFiles) {
        for (granularity, paths) in other.files {
            self.files.entry(granularity).or_default().extend(paths);
        }
    }

    pub fn get(&self, granularity: Granularity) -> &[PathBuf] {
        self.files
            .get(&granularity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

/// Outcome of a completed batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub files: OutputFiles,
    /// Combined file and row count per granularity that had any input.
    pub combined: Vec<(Granularity, PathBuf, usize)>,
}

/// Loads and annotates one corrected series.
///
/// The grade join runs before the approval and note overlays, so points with
/// an unknown grade code never reach them.
pub fn annotate_series(site: &str, series: &CorrectedSeries) -> ExportResult<Vec<AnnotatedPoint>> {
    let mut points: Vec<AnnotatedPoint> = load_points(site, &series.points)?
        .into_iter()
        .map(AnnotatedPoint::from)
        .collect();

    apply_grades(&mut points, &series.grades)?;
    let mut points = join_grade_names(points);
    apply_approvals(&mut points, &series.approvals)?;
    apply_notes(&mut points, &series.notes)?;

    debug!(site, points = points.len(), "Series annotated");
    Ok(points)
}

/// Writes one file per requested granularity for an annotated series.
pub fn export_series(
    site: &str,
    series: &SeriesSpec,
    points: &[AnnotatedPoint],
    settings: &ExportSettings,
    log: &RunLog,
) -> ExportResult<OutputFiles> {
    let key = SiteKey::decompose(site, settings.protocol)?;
    let mut files = OutputFiles::new();

    for granularity in settings.distinct_granularities() {
        let table = if granularity.is_aggregated() {
            let buckets = aggregate(points, granularity)?;
            bucket_table(&key, settings.protocol, granularity, &buckets)
        } else {
            raw_table(&key, settings.protocol, points)
        };

        let path = site_output_path(
            &settings.out_dir,
            &settings.prefix,
            site,
            series.field,
            granularity,
        );
        table.write_csv(&path)?;
        log.info(&format!(
            "Successfully Exported {granularity} - {site} - {}",
            series.identifier
        ));
        files.push(granularity, path);
    }

    Ok(files)
}

/// Looks up, fetches, annotates and exports one site×series combination.
#[tracing::instrument(skip(store, series, settings, log), fields(series = %series.identifier))]
pub async fn process_series(
    store: &dyn TimeSeriesStore,
    site: &str,
    series: &SeriesSpec,
    settings: &ExportSettings,
    log: &RunLog,
) -> ExportResult<OutputFiles> {
    let qualified = series.qualified_name(site);
    let id = store.resolve_series_id(&qualified).await?;
    debug!(qualified = %qualified, id = %id, "Series resolved");

    let corrected = store.fetch_corrected_series(&id).await?;
    let points = annotate_series(site, &corrected)?;
    export_series(site, series, &points, settings, log)
}

/// Runs every site × series combination, then combines per granularity.
///
/// A series missing at a site is logged once and skipped. Any other error
/// is logged and returned, leaving the remaining work undone.
pub async fn run_batch(
    store: &dyn TimeSeriesStore,
    sites: &[String],
    series: &[SeriesSpec],
    settings: &ExportSettings,
    log: &RunLog,
) -> ExportResult<BatchSummary> {
    info!(
        sites = sites.len(),
        series = series.len(),
        out_dir = %settings.out_dir.display(),
        "Starting export batch"
    );

    let mut summary = BatchSummary::default();

    for site in sites {
        fs::create_dir_all(settings.out_dir.join(site))?;

        for entry in series {
            match process_series(store, site, entry, settings, log).await {
                Ok(files) => {
                    summary.files.extend(files);
                    summary.processed += 1;
                    log.info(&format!(
                        "Successfully Processed - {site} - {}",
                        entry.identifier
                    ));
                }
                Err(ExportError::NotFound(_)) => {
                    summary.skipped += 1;
                    log.warn(&format!(
                        "WARNING Time Series - {} was not found at Site: {site}",
                        entry.qualified_name(site)
                    ));
                }
                Err(e) => {
                    log.error(&format!("Failed - {site} - {} - {e}", entry.identifier));
                    return Err(e);
                }
            }
        }
    }

    for granularity in settings.distinct_granularities() {
        let out = combined_output_path(&settings.out_dir, &settings.prefix, granularity);
        match combine_files(summary.files.get(granularity), &out) {
            Ok(Some(rows)) => {
                log.info(&format!(
                    "Successfully Combined {granularity} - {}",
                    out.display()
                ));
                summary.combined.push((granularity, out, rows));
            }
            Ok(None) => debug!(%granularity, "No files to combine"),
            Err(e) => {
                log.error(&format!("Failed - Combine {granularity} - {e}"));
                return Err(e);
            }
        }
    }

    log.info(&format!(
        "Successfully finished processing {} sites - {} series exported, {} skipped",
        sites.len(),
        summary.processed,
        summary.skipped
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::OfflineStore;
    use crate::series::resolve_series;
    use std::env;

    const WATER_TEMP: &str = "Water Temp.Water Temperature (C) HOBO";

    fn series_json(points: &[(&str, f64)]) -> CorrectedSeries {
        let points: Vec<_> = points
            .iter()
            .map(|(ts, v)| serde_json::json!({"Timestamp": ts, "Value": {"Numeric": v}}))
            .collect();
        serde_json::from_value(serde_json::json!({ "Points": points })).unwrap()
    }

    fn settings(dir: &str, granularities: Vec<Granularity>) -> ExportSettings {
        let out_dir = env::temp_dir().join(dir);
        let _ = fs::remove_dir_all(&out_dir);
        fs::create_dir_all(&out_dir).unwrap();
        ExportSettings {
            protocol: Protocol::Sei,
            granularities,
            out_dir,
            prefix: "TEST".into(),
        }
    }

    #[test]
    fn test_output_files_keep_order_per_granularity() {
        let mut a = OutputFiles::new();
        a.push(Granularity::Daily, "a_daily".into());
        let mut b = OutputFiles::new();
        b.push(Granularity::Daily, "b_daily".into());
        b.push(Granularity::Raw, "b_raw".into());

        a.extend(b);
        assert_eq!(
            a.get(Granularity::Daily),
            &[PathBuf::from("a_daily"), PathBuf::from("b_daily")]
        );
        assert_eq!(a.get(Granularity::Raw).len(), 1);
        assert!(a.get(Granularity::Yearly).is_empty());
        assert_eq!(a.total(), 3);
    }

    #[test]
    fn test_distinct_granularities_keep_first_seen_order() {
        let settings = ExportSettings {
            protocol: Protocol::Sei,
            granularities: vec![
                Granularity::Daily,
                Granularity::Raw,
                Granularity::Daily,
                Granularity::Raw,
            ],
            out_dir: PathBuf::from("out"),
            prefix: "P".into(),
        };
        assert_eq!(
            settings.distinct_granularities(),
            vec![Granularity::Daily, Granularity::Raw]
        );
    }

    #[tokio::test]
    async fn test_repeated_granularity_is_exported_and_combined_once() {
        let settings = settings(
            "aquarius_export_test_pipeline_repeat",
            vec![Granularity::Daily, Granularity::Daily],
        );
        let log = RunLog::new(settings.out_dir.join("run.log"));

        let mut store = OfflineStore::new();
        store.insert(
            format!("{WATER_TEMP}@ABCD_001"),
            series_json(&[
                ("2021-01-01T00:00:00-07:00", 5.0),
                ("2021-01-01T12:00:00-07:00", 7.0),
                ("2021-01-02T00:00:00-07:00", 9.0),
            ]),
        );

        let series = resolve_series(&[WATER_TEMP.to_string()]).unwrap();
        let summary = run_batch(&store, &["ABCD_001".to_string()], &series, &settings, &log)
            .await
            .unwrap();

        assert_eq!(summary.files.get(Granularity::Daily).len(), 1);
        assert_eq!(summary.combined.len(), 1);
        assert_eq!(summary.combined[0].2, 2);

        let combined = crate::output::Table::read_csv(&combined_output_path(
            &settings.out_dir,
            "TEST",
            Granularity::Daily,
        ))
        .unwrap();
        assert_eq!(combined.len(), 2);

        fs::remove_dir_all(&settings.out_dir).unwrap();
    }

    #[test]
    fn test_annotate_series_without_metadata_leaves_fields_empty() {
        let series = series_json(&[("2021-01-01T00:00:00-07:00", 5.0)]);
        let points = annotate_series("ABCD_001", &series).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].grade_code, "");
        assert_eq!(points[0].approval_code, "");
        assert_eq!(points[0].note_text, "");
    }

    #[tokio::test]
    async fn test_lookup_miss_is_logged_once_and_skipped() {
        let settings = settings("aquarius_export_test_pipeline_miss", vec![Granularity::Daily]);
        let log = RunLog::new(settings.out_dir.join("run.log"));

        let mut store = OfflineStore::new();
        store.insert(
            format!("{WATER_TEMP}@EFGH_002"),
            series_json(&[("2021-01-01T00:00:00-07:00", 5.0)]),
        );

        let series = resolve_series(&[WATER_TEMP.to_string()]).unwrap();
        let sites = vec!["ABCD_001".to_string(), "EFGH_002".to_string()];
        let summary = run_batch(&store, &sites, &series, &settings, &log)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.processed, 1);

        let content = fs::read_to_string(log.path()).unwrap();
        let warnings: Vec<_> = content
            .lines()
            .filter(|l| l.starts_with("WARNING Time Series"))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains(&format!("{WATER_TEMP}@ABCD_001")));
        assert!(warnings[0].contains("Site: ABCD_001"));
        assert!(content.contains("Successfully Processed - EFGH_002"));

        fs::remove_dir_all(&settings.out_dir).unwrap();
    }

    #[tokio::test]
    async fn test_parse_failure_stops_the_batch() {
        let settings = settings("aquarius_export_test_pipeline_fatal", vec![Granularity::Raw]);
        let log = RunLog::new(settings.out_dir.join("run.log"));

        let mut store = OfflineStore::new();
        let bad: CorrectedSeries = serde_json::from_value(
            serde_json::json!({"Points": [{"Timestamp": "not a time", "Value": {"Numeric": 1.0}}]}),
        )
        .unwrap();
        store.insert(format!("{WATER_TEMP}@ABCD_001"), bad);
        store.insert(
            format!("{WATER_TEMP}@EFGH_002"),
            series_json(&[("2021-01-01T00:00:00-07:00", 5.0)]),
        );

        let series = resolve_series(&[WATER_TEMP.to_string()]).unwrap();
        let sites = vec!["ABCD_001".to_string(), "EFGH_002".to_string()];
        let err = run_batch(&store, &sites, &series, &settings, &log)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Parse(_)));
        assert!(!settings.out_dir.join("EFGH_002").exists());
        assert!(!combined_output_path(&settings.out_dir, "TEST", Granularity::Raw).exists());

        fs::remove_dir_all(&settings.out_dir).unwrap();
    }

    #[tokio::test]
    async fn test_batch_writes_site_and_combined_files() {
        let settings = settings(
            "aquarius_export_test_pipeline_combined",
            vec![Granularity::Raw, Granularity::Monthly],
        );
        let log = RunLog::new(settings.out_dir.join("run.log"));

        let mut store = OfflineStore::new();
        for site in ["ABCD_001", "EFGH_002"] {
            store.insert(
                format!("{WATER_TEMP}@{site}"),
                series_json(&[
                    ("2021-01-01T00:00:00-07:00", 5.0),
                    ("2021-01-02T00:00:00-07:00", 7.0),
                ]),
            );
        }

        let series = resolve_series(&[WATER_TEMP.to_string()]).unwrap();
        let sites = vec!["ABCD_001".to_string(), "EFGH_002".to_string()];
        let summary = run_batch(&store, &sites, &series, &settings, &log)
            .await
            .unwrap();

        assert_eq!(summary.files.total(), 4);
        assert!(
            settings
                .out_dir
                .join("ABCD_001/TEST_ABCD_001_WaterTemp_C_Raw.csv")
                .exists()
        );
        assert_eq!(
            summary.combined,
            vec![
                (
                    Granularity::Raw,
                    combined_output_path(&settings.out_dir, "TEST", Granularity::Raw),
                    4
                ),
                (
                    Granularity::Monthly,
                    combined_output_path(&settings.out_dir, "TEST", Granularity::Monthly),
                    2
                ),
            ]
        );

        fs::remove_dir_all(&settings.out_dir).unwrap();
    }
}
