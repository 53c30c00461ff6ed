use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ExportError, ExportResult};
use crate::output::Table;

/// How row indices are carried into the combined table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowIdentity {
    /// Renumber rows `0..n` in output order.
    Reset,
    /// Keep each input row's index; a collision is a [`ExportError::DuplicateRow`].
    Preserve,
}

/// Concatenates `tables` in order. Each entry is `(source name, table)`.
///
/// Tables whose columns are the same set in a different order are realigned
/// to the first table's order. Column names must be unique.
pub fn concat(tables: &[(String, Table)], identity: RowIdentity) -> ExportResult<Table> {
    let Some((_, first)) = tables.first() else {
        return Ok(Table::new(Vec::<String>::new()));
    };

    let columns = first.columns.clone();
    let mut expected = columns.clone();
    expected.sort();
    if let Some(dup) = expected.windows(2).find(|w| w[0] == w[1]) {
        return Err(ExportError::SchemaMismatch(format!(
            "{} repeats column '{}'",
            tables[0].0, dup[0]
        )));
    }

    let mut combined = Table::new(columns.clone());
    let mut seen = HashSet::new();

    for (name, table) in tables {
        let mut actual = table.columns.clone();
        actual.sort();
        if actual != expected {
            return Err(ExportError::SchemaMismatch(format!(
                "{name} has columns [{}], expected [{}]",
                table.columns.join(", "),
                columns.join(", ")
            )));
        }

        // Position of each output column within this table's rows.
        let order: Vec<usize> = columns
            .iter()
            .map(|c| table.columns.iter().position(|tc| tc == c).unwrap_or_default())
            .collect();
        let aligned = table.columns == columns;

        for (row, &idx) in table.rows.iter().zip(&table.index) {
            let index = match identity {
                RowIdentity::Reset => combined.len(),
                RowIdentity::Preserve => {
                    if !seen.insert(idx) {
                        return Err(ExportError::DuplicateRow {
                            index: idx,
                            source_name: name.clone(),
                        });
                    }
                    idx
                }
            };

            let row = if aligned {
                row.clone()
            } else {
                order.iter().map(|&i| row[i].clone()).collect()
            };
            combined.rows.push(row);
            combined.index.push(index);
        }
    }

    Ok(combined)
}

/// Reads every file in `paths`, concatenates them with reset row identity
/// and writes the result to `out`.
///
/// Returns the number of combined rows, or `None` (and writes nothing) when
/// `paths` is empty.
pub fn combine_files(paths: &[PathBuf], out: &Path) -> ExportResult<Option<usize>> {
    if paths.is_empty() {
        return Ok(None);
    }

    let tables = paths
        .iter()
        .map(|p| Ok((p.display().to_string(), Table::read_csv(p)?)))
        .collect::<ExportResult<Vec<_>>>()?;
    debug!(files = tables.len(), "Combining tables");

    let combined = concat(&tables, RowIdentity::Reset)?;
    combined.write_csv(out)?;

    info!(
        path = %out.display(),
        rows = combined.len(),
        files = paths.len(),
        "Combined file written"
    );
    Ok(Some(combined.len()))
}
