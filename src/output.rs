//! Output tables and their CSV persistence. Each row carries a positional
//! index, which the combiner uses as row identity.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use crate::analyzers::{Bucket, Granularity};
use crate::error::{ExportError, ExportResult};
use crate::model::AnnotatedPoint;
use crate::sites::{Protocol, SiteKey};

const RAW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PERIOD_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Positional row index, parallel to `rows`.
    pub index: Vec<usize>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            index: Vec::new(),
        }
    }

    /// Appends a row, indexing it by its position in this table.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.index.push(self.rows.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reads a CSV file written by [`Table::write_csv`]. Rows are indexed
    /// `0..n` in file order.
    pub fn read_csv(path: &Path) -> ExportResult<Self> {
        let file = File::open(path)?;
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);

        let mut table = Table::new(rdr.headers()?.iter());
        for record in rdr.records() {
            let record = record?;
            if record.len() != table.columns.len() {
                return Err(ExportError::SchemaMismatch(format!(
                    "{}: row {} has {} fields, header has {}",
                    path.display(),
                    table.len(),
                    record.len(),
                    table.columns.len()
                )));
            }
            table.push_row(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }

    /// Writes the table to `path`, replacing any existing file. The
    /// positional index is not written.
    pub fn write_csv(&self, path: &Path) -> ExportResult<()> {
        debug!(path = %path.display(), rows = self.len(), "Writing CSV table");

        let file = File::create(path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Column names of a per-site export at `granularity`.
pub fn columns(protocol: Protocol, granularity: Granularity) -> Vec<String> {
    let mut cols: Vec<String> = protocol.key_columns().iter().map(|c| c.to_string()).collect();
    cols.push("DateTime".into());

    if granularity.is_aggregated() {
        let label = granularity.label();
        cols.push(format!("{label}Mean"));
        cols.push(format!("{label}StandardDev"));
        cols.push(format!("{label}Count"));
    } else {
        cols.extend(
            [
                "Utc",
                "Value",
                "GradeCode",
                "GradeName",
                "ApprovalCode",
                "ApprovalName",
                "NoteText",
            ]
            .map(String::from),
        );
    }
    cols
}

/// Builds the raw export table for one site's annotated series.
pub fn raw_table(key: &SiteKey, protocol: Protocol, points: &[AnnotatedPoint]) -> Table {
    let mut table = Table::new(columns(protocol, Granularity::Raw));
    for p in points {
        let mut row = key.cells();
        row.push(p.point.timestamp.format(RAW_TIME_FORMAT).to_string());
        row.push(p.point.utc_offset.clone());
        row.push(p.point.value.map(format_float).unwrap_or_default());
        row.push(p.grade_code.clone());
        row.push(p.grade_name.clone());
        row.push(p.approval_code.clone());
        row.push(p.approval_name.clone());
        row.push(p.note_text.clone());
        table.push_row(row);
    }
    table
}

/// Builds the aggregated export table for one site's buckets.
pub fn bucket_table(
    key: &SiteKey,
    protocol: Protocol,
    granularity: Granularity,
    buckets: &[Bucket],
) -> Table {
    let mut table = Table::new(columns(protocol, granularity));
    for b in buckets {
        let mut row = key.cells();
        row.push(b.anchor.format(PERIOD_FORMAT).to_string());
        row.push(format_float(b.mean));
        row.push(format_float(b.stddev));
        row.push(b.count.to_string());
        table.push_row(row);
    }
    table
}

/// Formats a float for CSV. NaN is written as an empty cell; whole numbers
/// keep a trailing `.0`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value:?}")
    }
}

/// `{out_dir}/{site}/{prefix}_{site}_{field}_{Granularity}.csv`
pub fn site_output_path(
    out_dir: &Path,
    prefix: &str,
    site: &str,
    field: &str,
    granularity: Granularity,
) -> PathBuf {
    out_dir
        .join(site)
        .join(format!("{prefix}_{site}_{field}_{granularity}.csv"))
}

/// `{out_dir}/{prefix}_AllSites_{Granularity}.csv`
pub fn combined_output_path(out_dir: &Path, prefix: &str, granularity: Granularity) -> PathBuf {
    out_dir.join(format!("{prefix}_AllSites_{granularity}.csv"))
}
