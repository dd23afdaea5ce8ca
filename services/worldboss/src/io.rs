//! HTTP client abstraction for testability

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};

use crate::WorldbossError;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request, giving up after `timeout`
    async fn get(&self, url: &str, timeout: Duration) -> crate::Result<HttpResponse>;

    /// Send a POST request with form-encoded body, giving up after `timeout`
    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Client that sends the given `User-Agent` and, when present, the raw
    /// `Cookie` header on every request.
    pub fn with_identity(user_agent: &str, cookie: Option<&str>) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| WorldbossError::Config(format!("Invalid user agent: {}", e)))?,
        );
        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie)
                    .map_err(|e| WorldbossError::Config(format!("Invalid cookie header: {}", e)))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| WorldbossError::Http(format!("Building HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, timeout: Duration) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| WorldbossError::Http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WorldbossError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", redact_url(url));
        let response = self
            .client
            .post(url)
            .form(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                WorldbossError::Http(format!("POST {} failed: {}", redact_url(url), e.without_url()))
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WorldbossError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("POST {} -> {} ({} bytes)", redact_url(url), status, body.len());
        Ok(HttpResponse { status, body })
    }
}

/// Strip the path from a URL so bot tokens embedded in it never reach the logs.
fn redact_url(url: &str) -> &str {
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find('/') {
                Some(path_start) => &url[..scheme_end + 3 + path_start],
                None => url,
            }
        }
        None => url,
    }
}
