//! CLI entry point for the AQUARIUS export tool.
//!
//! Exports corrected time series per site with grade, approval and note
//! metadata, summarizes them per calendar period and combines the per-site
//! files into one table per granularity.

mod infra;

use crate::infra::aquarius::AquariusClient;
use anyhow::{Context, Result, anyhow};
use aquarius_export::analyzers::Granularity;
use aquarius_export::pipeline::{ExportSettings, run_batch};
use aquarius_export::runlog::RunLog;
use aquarius_export::series::{SERIES_FIELDS, SeriesSpec, resolve_series};
use aquarius_export::services::{OfflineStore, TimeSeriesStore};
use aquarius_export::sites::{Protocol, load_site_list};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aquarius_export")]
#[command(about = "Export and summarize AQUARIUS time series per site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export, annotate and summarize series for every site in a site list
    Export {
        /// Site list: a workbook (.xlsx, .xls, ...) or a delimited file (.csv, .tsv, .txt)
        #[arg(short, long, value_name = "FILE")]
        sites: PathBuf,

        /// Column of the site list holding the site identifiers
        #[arg(long, default_value = "SiteName")]
        site_column: String,

        /// Series identifier(s) as <Parameter>.<Label>
        #[arg(short = 't', long = "series", required = true, num_args = 1..)]
        series: Vec<String>,

        /// Granularities to export (Raw, Daily, Weekly, Monthly, Yearly)
        #[arg(short, long, num_args = 1.., default_values_t = Granularity::ALL)]
        granularity: Vec<Granularity>,

        /// Site naming protocol: SEI, WEI or AVCSS
        #[arg(short, long, default_value_t = Protocol::Sei)]
        protocol: Protocol,

        /// Output directory; one subdirectory per site is created
        #[arg(short, long, default_value = "export")]
        output_dir: PathBuf,

        /// Prefix for every output file name
        #[arg(long, default_value = "Aquarius")]
        prefix: String,

        /// Plaintext run log (appended)
        #[arg(long, default_value = "aquarius_export_log.txt")]
        run_log: PathBuf,

        /// Read saved corrected-series JSON files from this directory
        /// instead of the AQUARIUS server
        #[arg(long, value_name = "DIR")]
        offline_dir: Option<PathBuf>,
    },
    /// List the series identifiers that can be exported
    ListSeries,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/aquarius_export.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aquarius_export.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            sites,
            site_column,
            series,
            granularity,
            protocol,
            output_dir,
            prefix,
            run_log,
            offline_dir,
        } => {
            let log = RunLog::new(run_log);
            let settings = ExportSettings {
                protocol,
                granularities: granularity,
                out_dir: output_dir,
                prefix,
            };

            let result = export(&sites, &site_column, &series, &settings, offline_dir, &log).await;
            if let Err(e) = result {
                log.error(&format!("Exiting Error - {e:#}"));
                return Err(e);
            }
        }
        Commands::ListSeries => {
            for (identifier, field) in SERIES_FIELDS {
                println!("{identifier}\t{field}");
            }
            info!(total = SERIES_FIELDS.len(), "Series catalog listed");
        }
    }

    Ok(())
}

/// Validates the inputs, opens the store and runs the batch.
#[tracing::instrument(
    skip(series, settings, offline_dir, log),
    fields(protocol = %settings.protocol)
)]
async fn export(
    sites_path: &Path,
    site_column: &str,
    series: &[String],
    settings: &ExportSettings,
    offline_dir: Option<PathBuf>,
    log: &RunLog,
) -> Result<()> {
    let series = resolve_series(series)?;
    let sites = load_site_list(sites_path, site_column)
        .with_context(|| format!("Failed to load site list {}", sites_path.display()))?;
    info!(sites = sites.len(), series = series.len(), "Inputs validated");

    std::fs::create_dir_all(&settings.out_dir)?;

    match offline_dir {
        Some(dir) => {
            let store = OfflineStore::load_dir(&dir)
                .with_context(|| format!("Failed to load offline series from {}", dir.display()))?;
            run(&store, &sites, &series, settings, log).await
        }
        None => {
            let server = env_var("AQUARIUS_SERVER")?;
            let username = env_var("AQUARIUS_USERNAME")?;
            let password = env_var("AQUARIUS_PASSWORD")?;

            let client = AquariusClient::connect(&server, &username, &password).await?;
            let result = run(&client, &sites, &series, settings, log).await;
            if let Err(e) = client.disconnect().await {
                error!(error = %e, "Failed to close AQUARIUS session");
            }
            result
        }
    }
}

async fn run(
    store: &dyn TimeSeriesStore,
    sites: &[String],
    series: &[SeriesSpec],
    settings: &ExportSettings,
    log: &RunLog,
) -> Result<()> {
    let summary = run_batch(store, sites, series, settings, log).await?;
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        files = summary.files.total(),
        combined = summary.combined.len(),
        "Export finished"
    );
    Ok(())
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow!("{name} must be set"))
}
