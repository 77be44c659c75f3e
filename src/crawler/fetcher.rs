//! Page loading
//!
//! This module defines the page-loading seam used by the scheduler and the
//! default HTTP implementation:
//! - Building HTTP clients with the crawler's user agent and an optional proxy
//! - Loading pages with a navigation timeout
//! - Mapping HTTP and transport failures to page-level errors
//! - Swapping the proxy at runtime when rate limiting triggers a rotation

use crate::config::UserAgentConfig;
use crate::{CrawlError, CrawlResult, ScribeError};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info};

/// A page returned by a [`PageLoader`]
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// URL that was requested
    pub url: String,
    /// URL after redirects; relative links resolve against it
    pub final_url: String,
    pub status: u16,
    pub content_type: String,
    pub html: String,
}

/// The browser-automation seam
///
/// Implementations load pages and report failures as [`CrawlError`] so the
/// classifier can categorize them. A headless-browser implementation would
/// also use `wait_until_ready` to wait for client-side rendering.
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Loads a page, failing with [`CrawlError::Timeout`] after `timeout`
    async fn load(&self, url: &str, timeout: Duration) -> CrawlResult<LoadedPage>;

    /// Waits until the page reports itself ready
    async fn wait_until_ready(&self, _page: &LoadedPage, _timeout: Duration) -> CrawlResult<()> {
        Ok(())
    }

    /// Routes subsequent loads through the given proxy
    async fn set_proxy(&self, proxy_url: &str) -> CrawlResult<()>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Value of the `User-Agent` header
/// * `proxy` - Optional proxy URL every request is routed through
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy URL or TLS backend failure
pub fn build_http_client(user_agent: &str, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    builder.build()
}

/// Loads pages over plain HTTP with `reqwest`
///
/// Pages are not rendered; client-side content is out of reach.
pub struct HttpPageLoader {
    user_agent: String,
    client: RwLock<Client>,
}

impl HttpPageLoader {
    /// Creates a loader, optionally starting behind a proxy
    pub fn new(config: &UserAgentConfig, proxy: Option<&str>) -> Result<Self, ScribeError> {
        let user_agent = config.header_value();
        let client = build_http_client(&user_agent, proxy).map_err(|e| ScribeError::InvalidProxy {
            url: proxy.unwrap_or_default().to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            user_agent,
            client: RwLock::new(client),
        })
    }

    fn client(&self) -> Client {
        self.client
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &str, timeout: Duration) -> CrawlResult<LoadedPage> {
        let client = self.client();
        debug!(url, "Loading page");

        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(url, timeout, e))?;

        let status = response.status();
        check_status(url, status)?;

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(CrawlError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| map_transport_error(url, timeout, e))?;

        Ok(LoadedPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            html,
        })
    }

    async fn set_proxy(&self, proxy_url: &str) -> CrawlResult<()> {
        let client = build_http_client(&self.user_agent, Some(proxy_url))
            .map_err(|e| CrawlError::other(format!("Invalid proxy '{}': {}", proxy_url, e)))?;

        *self
            .client
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = client;

        info!(proxy = proxy_url, "Switched proxy");
        Ok(())
    }
}

/// Maps an unsuccessful HTTP status to a page-level error
///
/// | Status | Error |
/// |--------|-------|
/// | 429 | `RateLimited` |
/// | 5xx | `Network` (the server may recover) |
/// | other non-2xx | `HttpStatus` |
fn check_status(url: &str, status: StatusCode) -> CrawlResult<()> {
    if status.is_success() {
        return Ok(());
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(CrawlError::RateLimited {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if status.is_server_error() {
        return Err(CrawlError::Network {
            url: url.to_string(),
            message: format!("server responded with HTTP {}", status.as_u16()),
        });
    }

    Err(CrawlError::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
    })
}

fn map_transport_error(url: &str, timeout: Duration, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        CrawlError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// A missing content type is given the benefit of the doubt
fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}
