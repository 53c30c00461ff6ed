use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use calamine::{Data, Reader, open_workbook_auto};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{ExportError, ExportResult};

/// Monitoring program. Decides how a site identifier breaks into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Stream ecological integrity (stream temperature loggers).
    Sei,
    /// Wetland ecological integrity.
    Wei,
    /// Alpine vegetation and climate summits; identifiers carry summit and plot.
    Avcss,
}

impl Protocol {
    pub fn has_summit_plot(self) -> bool {
        self == Protocol::Avcss
    }

    /// Leading identifier columns written on every output row.
    pub fn key_columns(self) -> &'static [&'static str] {
        if self.has_summit_plot() {
            &["Park", "Summit", "Plot", "SiteName"]
        } else {
            &["Park", "SiteName"]
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Sei => write!(f, "SEI"),
            Protocol::Wei => write!(f, "WEI"),
            Protocol::Avcss => write!(f, "AVCSS"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SEI" => Ok(Protocol::Sei),
            "WEI" => Ok(Protocol::Wei),
            "AVCSS" => Ok(Protocol::Avcss),
            other => Err(ExportError::Config(format!("unknown protocol '{other}'"))),
        }
    }
}

/// A site identifier split into its output columns.
///
/// `GLAC_TUNDRA_2019_SUM01_P03` under AVCSS becomes park `GLAC`, summit
/// `SUM01`, plot `P03`. Under SEI/WEI only the park prefix is split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteKey {
    pub park: String,
    pub summit: Option<String>,
    pub plot: Option<String>,
    pub site: String,
}

impl SiteKey {
    pub fn decompose(site: &str, protocol: Protocol) -> ExportResult<Self> {
        let parts: Vec<&str> = site.split('_').collect();
        let park = parts[0].to_string();

        let (summit, plot) = if protocol.has_summit_plot() {
            match (parts.get(3), parts.get(4)) {
                (Some(summit), Some(plot)) => (Some(summit.to_string()), Some(plot.to_string())),
                _ => {
                    return Err(ExportError::Parse(format!(
                        "site '{site}' has no summit/plot parts for protocol {protocol}"
                    )));
                }
            }
        } else {
            (None, None)
        };

        Ok(SiteKey {
            park,
            summit,
            plot,
            site: site.to_string(),
        })
    }

    /// Cell values matching [`Protocol::key_columns`].
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.park.clone()];
        if let (Some(summit), Some(plot)) = (&self.summit, &self.plot) {
            cells.push(summit.clone());
            cells.push(plot.clone());
        }
        cells.push(self.site.clone());
        cells
    }
}

/// Reads the site identifiers to process from a site list.
///
/// Workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read from their
/// first sheet. `.tsv` and `.txt` files are tab-delimited, anything else is
/// read as CSV. The first row is the header. Blank identifiers are skipped.
pub fn load_site_list(path: &Path, column: &str) -> ExportResult<Vec<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let sites = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path, column)?,
        "tsv" | "txt" => read_delimited(path, column, b'\t')?,
        _ => read_delimited(path, column, b',')?,
    };

    debug!(path = %path.display(), count = sites.len(), "Loaded site list");
    Ok(sites)
}

fn read_delimited(path: &Path, column: &str, delimiter: u8) -> ExportResult<Vec<String>> {
    let file = File::open(path)?;
    let mut rdr = ReaderBuilder::new().delimiter(delimiter).from_reader(file);

    let idx = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| missing_column(path, column))?;

    let mut sites = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match record.get(idx).map(str::trim) {
            Some(site) if !site.is_empty() => sites.push(site.to_string()),
            _ => continue,
        }
    }
    Ok(sites)
}

fn read_workbook(path: &Path, column: &str) -> ExportResult<Vec<String>> {
    let workbook_err =
        |e: calamine::Error| ExportError::Parse(format!("{}: {e}", path.display()));

    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExportError::Config(format!("{} has no worksheets", path.display())))?
        .map_err(workbook_err)?;

    let mut rows = range.rows();
    let idx = rows
        .next()
        .and_then(|header| header.iter().position(|h| h.to_string().trim() == column))
        .ok_or_else(|| missing_column(path, column))?;

    let mut sites = Vec::new();
    for row in rows {
        match row.get(idx) {
            None | Some(Data::Empty) => continue,
            Some(cell) => {
                let site = cell.to_string();
                let site = site.trim();
                if !site.is_empty() {
                    sites.push(site.to_string());
                }
            }
        }
    }
    Ok(sites)
}

fn missing_column(path: &Path, column: &str) -> ExportError {
    ExportError::Config(format!("column '{column}' not found in {}", path.display()))
}
