//! Browser session abstraction for the click automation

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;

use crate::config::AutomationConfig;
use crate::WorldbossError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A cookie to inject into the browser before navigating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
}

/// Split a raw `Cookie` header into browser cookies scoped to `domain`.
///
/// Parts without `=` and parts with an empty name or value are skipped.
pub fn parse_cookie_header(header: &str, domain: &str) -> Vec<BrowserCookie> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some(BrowserCookie {
                name: name.to_string(),
                value: value.to_string(),
                domain: domain.to_string(),
                path: "/".to_string(),
                http_only: false,
                secure: true,
            })
        })
        .collect()
}

/// A live browser page driven by CSS selectors
#[async_trait]
pub trait BrowserSession: Send {
    async fn add_cookies(&mut self, cookies: &[BrowserCookie]) -> crate::Result<()>;

    async fn goto(&mut self, url: &str, timeout: Duration) -> crate::Result<()>;

    /// Wait until an element matching `selector` is displayed
    async fn wait_for_visible(&mut self, selector: &str, timeout: Duration) -> crate::Result<()>;

    /// Wait until an element matching `selector` is enabled
    async fn wait_for_enabled(&mut self, selector: &str, timeout: Duration) -> crate::Result<()>;

    async fn click(&mut self, selector: &str) -> crate::Result<()>;

    /// Release the browser. Called once at the end of every session.
    async fn close(&mut self) -> crate::Result<()>;
}

/// Opens browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync + std::fmt::Debug {
    async fn launch(&self) -> crate::Result<Box<dyn BrowserSession>>;
}

/// Launches Chrome sessions through a WebDriver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    webdriver_url: String,
    headless: bool,
}

impl WebDriverLauncher {
    pub fn new(config: &AutomationConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> crate::Result<Box<dyn BrowserSession>> {
        let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage"];
        if self.headless {
            args.push("--headless=new");
        }
        let mut capabilities = serde_json::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        tracing::debug!("Connecting to WebDriver at {}", self.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                WorldbossError::Browser(format!(
                    "Failed to open session on {}: {}",
                    self.webdriver_url, e
                ))
            })?;

        Ok(Box::new(WebDriverSession {
            client: Some(client),
        }))
    }
}

/// A WebDriver-backed session
pub struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    fn client(&self) -> crate::Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| WorldbossError::Browser("Session already closed".to_string()))
    }

    /// Poll `selector` until the first match satisfies `state` or `timeout` elapses
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
        state: ElementState,
    ) -> crate::Result<()> {
        let client = self.client()?;
        let poll = async {
            loop {
                if let Ok(element) = client.find(Locator::Css(selector)).await {
                    let reached = match state {
                        ElementState::Visible => element.is_displayed().await,
                        ElementState::Enabled => element.is_enabled().await,
                    };
                    if reached.unwrap_or(false) {
                        return;
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.map_err(|_| {
            WorldbossError::Browser(format!(
                "Timed out after {:?} waiting for '{}' to be {}",
                timeout, selector, state
            ))
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum ElementState {
    Visible,
    Enabled,
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementState::Visible => write!(f, "visible"),
            ElementState::Enabled => write!(f, "enabled"),
        }
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn add_cookies(&mut self, cookies: &[BrowserCookie]) -> crate::Result<()> {
        let client = self.client()?;
        // WebDriver only accepts cookies for the domain of the loaded page
        if let Some(first) = cookies.first() {
            let origin = format!("https://{}/", first.domain.trim_start_matches('.'));
            client
                .goto(&origin)
                .await
                .map_err(|e| WorldbossError::Browser(format!("Opening {}: {}", origin, e)))?;
        }

        for cookie in cookies {
            let mut c = Cookie::new(cookie.name.clone(), cookie.value.clone());
            c.set_domain(cookie.domain.clone());
            c.set_path(cookie.path.clone());
            c.set_http_only(cookie.http_only);
            c.set_secure(cookie.secure);
            client.add_cookie(c).await.map_err(|e| {
                WorldbossError::Browser(format!("Adding cookie '{}': {}", cookie.name, e))
            })?;
        }
        Ok(())
    }

    async fn goto(&mut self, url: &str, timeout: Duration) -> crate::Result<()> {
        let client = self.client()?;
        match tokio::time::timeout(timeout, client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WorldbossError::Browser(format!("Navigating to {}: {}", url, e))),
            Err(_) => Err(WorldbossError::Browser(format!(
                "Navigation to {} timed out after {:?}",
                url, timeout
            ))),
        }
    }

    async fn wait_for_visible(&mut self, selector: &str, timeout: Duration) -> crate::Result<()> {
        self.wait_for(selector, timeout, ElementState::Visible)
            .await
    }

    async fn wait_for_enabled(&mut self, selector: &str, timeout: Duration) -> crate::Result<()> {
        self.wait_for(selector, timeout, ElementState::Enabled)
            .await
    }

    async fn click(&mut self, selector: &str) -> crate::Result<()> {
        let client = self.client()?;
        let element = client
            .find(Locator::Css(selector))
            .await
            .map_err(|e| WorldbossError::Browser(format!("Finding '{}': {}", selector, e)))?;
        element
            .click()
            .await
            .map_err(|e| WorldbossError::Browser(format!("Clicking '{}': {}", selector, e)))
    }

    async fn close(&mut self) -> crate::Result<()> {
        match self.client.take() {
            Some(client) => client
                .close()
                .await
                .map_err(|e| WorldbossError::Browser(format!("Closing session: {}", e))),
            None => Ok(()),
        }
    }
}
