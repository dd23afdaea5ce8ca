//! Worldboss - world boss schedule watcher
//!
//! Scrapes the world boss schedule, sends checkpoint alerts for the next boss,
//! serves a dashboard and drives an optional expedition click loop.

pub mod automation;
pub mod boss;
pub mod browser;
pub mod checkpoint;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod eta;
pub mod io;
pub mod notifier;
pub mod poller;
pub mod site;
pub mod state;
pub mod telegram;

pub use config::{load_config, Config};
pub use error::{Result, WorldbossError};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::automation::{AutomationController, AutomationSettings};
use crate::boss::BossSource;
use crate::browser::{BrowserLauncher, WebDriverLauncher};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::notifier::Notifier;
use crate::poller::Poller;
use crate::site::SiteScraper;
use crate::state::StateHandle;
use crate::telegram::TelegramNotifier;

/// Assembles the service from its configuration, with optional replacements
/// for the external collaborators
pub struct WorldbossBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    boss_source: Option<Arc<dyn BossSource>>,
    notifiers: Option<Vec<Arc<dyn Notifier>>>,
    launcher: Option<Arc<dyn BrowserLauncher>>,
    cancel: CancellationToken,
}

impl WorldbossBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            boss_source: None,
            notifiers: None,
            launcher: None,
            cancel: CancellationToken::new(),
        }
    }

    /// HTTP client shared by the site scraper and the Telegram notifier
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_boss_source(mut self, source: Arc<dyn BossSource>) -> Self {
        self.boss_source = Some(source);
        self
    }

    pub fn with_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.notifiers = Some(notifiers);
        self
    }

    pub fn with_browser_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Token that shuts the service down when cancelled
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn build(self) -> Result<Worldboss> {
        let config = self.config;
        let state = state::new_state_handle(config.dashboard.history_size);

        let boss_source: Arc<dyn BossSource> = match self.boss_source {
            Some(source) => source,
            None => {
                let http: Arc<dyn HttpClient> = match &self.http {
                    Some(http) => Arc::clone(http),
                    None => Arc::new(ReqwestHttpClient::with_identity(
                        &config.site.user_agent,
                        config.site.cookie.as_deref(),
                    )?),
                };
                Arc::new(SiteScraper::new(&config.site, &config.poller, http))
            }
        };

        let notifiers = match self.notifiers {
            Some(notifiers) => notifiers,
            None => {
                let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
                if let Some((bot_token, chat_id)) = config.telegram.credentials() {
                    let http: Arc<dyn HttpClient> = match &self.http {
                        Some(http) => Arc::clone(http),
                        None => Arc::new(ReqwestHttpClient::default()),
                    };
                    let telegram = TelegramNotifier::new(bot_token, chat_id, http)
                        .with_timeout(Duration::from_secs(config.telegram.timeout_seconds));
                    notifiers.push(Arc::new(telegram));
                    info!("Telegram notifications enabled");
                } else {
                    info!("Telegram notifications disabled (missing bot token or chat id)");
                }
                notifiers
            }
        };

        let launcher: Arc<dyn BrowserLauncher> = match self.launcher {
            Some(launcher) => launcher,
            None => Arc::new(WebDriverLauncher::new(&config.automation)),
        };
        let automation =
            AutomationController::new(launcher, AutomationSettings::from_config(&config));

        let poller = Poller::new(
            boss_source,
            notifiers,
            &config,
            Arc::clone(&state),
            self.cancel.clone(),
        );

        let listener = if config.dashboard.enabled {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.dashboard.port));
            match TcpListener::bind(addr).await {
                Ok(listener) => Some(listener),
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        config.dashboard.port,
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Worldboss {
            state,
            automation,
            poller,
            listener,
            cancel: self.cancel,
        })
    }
}

/// A fully assembled service, ready to start
pub struct Worldboss {
    state: StateHandle,
    automation: AutomationController,
    poller: Poller,
    listener: Option<TcpListener>,
    cancel: CancellationToken,
}

impl Worldboss {
    pub fn state(&self) -> StateHandle {
        Arc::clone(&self.state)
    }

    pub fn automation(&self) -> AutomationController {
        self.automation.clone()
    }

    /// Address the dashboard is bound to, if it is enabled and bound
    pub fn dashboard_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Run until ctrl-c or until the cancellation token is cancelled
    pub async fn start(self) -> Result<()> {
        let Worldboss {
            state,
            automation,
            poller,
            listener,
            cancel,
        } = self;

        let cancel_for_signal = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!("Failed to listen for ctrl-c: {}", e);
                        return;
                    }
                    info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                _ = cancel_for_signal.cancelled() => {}
            }
        });

        let dashboard = listener.map(|listener| {
            let router = dashboard::build_router(Arc::clone(&state), automation.clone());
            let cancel_for_dashboard = cancel.clone();
            if let Ok(addr) = listener.local_addr() {
                info!("Dashboard listening on http://{}", addr);
            }
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        cancel_for_dashboard.cancelled().await;
                    })
                    .await
                {
                    tracing::error!("Dashboard server failed: {}", e);
                }
                tracing::debug!("Dashboard stopped");
            })
        });

        info!("Worldboss poll loop started");
        poller.run().await;

        automation.stop().await;
        if let Some(handle) = dashboard {
            if let Err(e) = handle.await {
                tracing::warn!("Dashboard task failed: {}", e);
            }
        }
        info!("Worldboss stopped");
        Ok(())
    }
}
