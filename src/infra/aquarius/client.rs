use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aquarius_export::error::{ExportError, ExportResult};
use aquarius_export::fetch::auth::SessionToken;
use aquarius_export::fetch::{BasicClient, fetch_json, send};
use aquarius_export::model::CorrectedSeries;
use aquarius_export::series::parameter_name;
use aquarius_export::services::TimeSeriesStore;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SESSION_PATH: &str = "AQUARIUS/Provisioning/v1/session";
const PUBLISH_PATH: &str = "AQUARIUS/Publish/v2/";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescriptionList {
    #[serde(default)]
    time_series_descriptions: Vec<Description>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Description {
    identifier: String,
    unique_id: String,
}

/// AQUARIUS Publish client holding an authenticated session.
pub struct AquariusClient {
    base_url: Url,
    http: SessionToken<BasicClient>,
}

impl AquariusClient {
    /// Opens a session on `server` and keeps its token for later requests.
    pub async fn connect(server: &str, username: &str, password: &str) -> Result<Self> {
        let base_url = base_url(server)?;
        let basic = BasicClient::new()?;

        let body = serde_json::to_value(SessionRequest { username, password })?;
        let token = send(&basic, Method::POST, base_url.join(SESSION_PATH)?, Some(&body))
            .await
            .context("Failed to open AQUARIUS session")?;
        let token = token.trim().trim_matches('"');

        info!(server = %base_url, "AQUARIUS session opened");
        Ok(Self {
            base_url,
            http: SessionToken::new(basic, token)?,
        })
    }

    /// Closes the session. The token is unusable afterwards.
    pub async fn disconnect(self) -> Result<()> {
        send(
            &self.http,
            Method::DELETE,
            self.base_url.join(SESSION_PATH)?,
            None,
        )
        .await
        .context("Failed to close AQUARIUS session")?;

        info!("AQUARIUS session closed");
        Ok(())
    }

    fn publish_url(&self, operation: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.join(PUBLISH_PATH)?.join(operation)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }
}

#[async_trait]
impl TimeSeriesStore for AquariusClient {
    #[tracing::instrument(skip(self))]
    async fn resolve_series_id(&self, qualified_name: &str) -> ExportResult<String> {
        let (identifier, location) = split_qualified(qualified_name)?;
        let parameter = parameter_name(identifier);

        let url = self.publish_url(
            "GetTimeSeriesDescriptionList",
            &[("LocationIdentifier", location), ("Parameter", parameter)],
        )?;
        let list: DescriptionList = fetch_json(&self.http, url)
            .await
            .with_context(|| format!("Failed to list time series at {location}"))?;
        debug!(
            candidates = list.time_series_descriptions.len(),
            "Time series descriptions fetched"
        );

        list.time_series_descriptions
            .into_iter()
            .find(|d| d.identifier == qualified_name)
            .map(|d| d.unique_id)
            .ok_or_else(|| ExportError::NotFound(qualified_name.to_string()))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_corrected_series(&self, unique_id: &str) -> ExportResult<CorrectedSeries> {
        let url = self.publish_url(
            "GetTimeSeriesCorrectedData",
            &[("TimeSeriesUniqueId", unique_id)],
        )?;
        let series: CorrectedSeries = fetch_json(&self.http, url)
            .await
            .with_context(|| format!("Failed to fetch corrected data for {unique_id}"))?;

        debug!(
            points = series.points.len(),
            grades = series.grades.len(),
            approvals = series.approvals.len(),
            notes = series.notes.len(),
            "Corrected series fetched"
        );
        Ok(series)
    }
}

/// Normalizes the configured server to a base URL ending in `/`. A bare host
/// name gets `https://`.
fn base_url(server: &str) -> Result<Url> {
    let server = server.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err(anyhow!("AQUARIUS server is empty"));
    }
    let with_scheme = if server.contains("://") {
        format!("{server}/")
    } else {
        format!("https://{server}/")
    };
    Url::parse(&with_scheme).with_context(|| format!("invalid AQUARIUS server '{server}'"))
}

/// Splits `<Parameter>.<Label>@<Location>` at the last `@`.
fn split_qualified(qualified_name: &str) -> ExportResult<(&str, &str)> {
    qualified_name
        .rsplit_once('@')
        .filter(|(id, loc)| !id.is_empty() && !loc.is_empty())
        .ok_or_else(|| {
            ExportError::Parse(format!(
                "'{qualified_name}' is not of the form <Parameter>.<Label>@<Location>"
            ))
        })
}
