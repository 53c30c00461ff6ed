use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared HTTP requests.
///
/// Wrappers such as [`SessionToken`](super::auth::SessionToken) decorate an
/// inner client to add authentication before delegating.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
