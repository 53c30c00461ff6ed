use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{error, info, warn};

/// Append-only outcome log, one `<message> - <local timestamp>` line per
/// event. The file is opened and closed for each line.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RunLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: &str) {
        info!("{message}");
        self.append(message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{message}");
        self.append(message);
    }

    pub fn error(&self, message: &str) {
        error!("{message}");
        self.append(message);
    }

    fn append(&self, message: &str) {
        let line = format_line(message, Local::now().naive_local());
        if let Err(e) = append_line(&self.path, &line) {
            error!(path = %self.path.display(), error = %e, "Failed to write run log");
        }
    }
}

/// Formats one run-log line.
pub fn format_line(message: &str, at: NaiveDateTime) -> String {
    format!("{message} - {}", at.format("%Y-%m-%dT%H:%M:%S%.6f"))
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}
