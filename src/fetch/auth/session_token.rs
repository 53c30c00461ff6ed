use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// Header AQUARIUS expects the session token in.
pub const AUTH_HEADER: &str = "X-Authentication-Token";

/// An [`HttpClient`] wrapper that attaches a session token to every request.
///
/// The header name and value are validated once, when the wrapper is built.
pub struct SessionToken<C> {
    inner: C,
    header_name: HeaderName,
    token: HeaderValue,
}

impl<C> SessionToken<C> {
    /// Wraps `inner` so requests carry `X-Authentication-Token: <token>`.
    pub fn new(inner: C, token: &str) -> Result<Self> {
        Self::with_header(inner, AUTH_HEADER, token)
    }

    pub fn with_header(inner: C, header_name: &str, token: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut token =
            HeaderValue::from_str(token).context("session token is not a valid header value")?;
        token.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            token,
        })
    }

    /// Adds the token header to `req`, replacing any previous value.
    pub fn authorize(&self, req: &mut reqwest::Request) {
        req.headers_mut()
            .insert(self.header_name.clone(), self.token.clone());
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for SessionToken<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.authorize(&mut req);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    fn request() -> reqwest::Request {
        reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost/AQUARIUS/Publish/v2".parse().unwrap(),
        )
    }

    #[test]
    fn test_token_header_is_attached() {
        let client = SessionToken::new(BasicClient::new().unwrap(), "abc123").unwrap();
        let mut req = request();
        client.authorize(&mut req);
        client.authorize(&mut req);

        let values: Vec<_> = req.headers().get_all(AUTH_HEADER).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "abc123");
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        assert!(SessionToken::new(BasicClient::new().unwrap(), "bad\ntoken").is_err());
        assert!(SessionToken::with_header(BasicClient::new().unwrap(), "bad header", "t").is_err());
    }
}
