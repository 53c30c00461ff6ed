mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, bail};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

/// Sends a request through `client` and returns the response body as text.
///
/// Non-2xx responses become errors carrying the status and body.
pub async fn send<C: HttpClient + ?Sized>(
    client: &C,
    method: Method,
    url: Url,
    json_body: Option<&serde_json::Value>,
) -> Result<String> {
    let mut req = reqwest::Request::new(method, url.clone());
    if let Some(body) = json_body {
        req.headers_mut().insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    }

    let resp = client.execute(req).await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        bail!("{} returned status {}: {}", url.path(), status, text);
    }
    Ok(text)
}

/// GETs `url` and deserializes the JSON response.
pub async fn fetch_json<C: HttpClient + ?Sized, T: DeserializeOwned>(
    client: &C,
    url: Url,
) -> Result<T> {
    let text = send(client, Method::GET, url, None).await?;
    Ok(serde_json::from_str(&text)?)
}
