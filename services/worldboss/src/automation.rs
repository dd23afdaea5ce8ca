//! Start/stop-able browser loop that keeps clicking the expedition button

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::boss::time_of_day_after;
use crate::browser::{parse_cookie_header, BrowserCookie, BrowserLauncher, BrowserSession};
use crate::config::Config;

/// Snapshot of the automation state as reported to the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutomationStatus {
    pub active: bool,
    pub last_click: Option<String>,
    pub last_error: Option<String>,
}

/// Timing and targets for one automation run
#[derive(Debug, Clone)]
pub struct AutomationSettings {
    pub expedition_url: String,
    pub cookies: Vec<BrowserCookie>,
    pub begin_selector: String,
    pub perform_selector: String,
    pub navigation_timeout: Duration,
    pub visible_timeout: Duration,
    pub enabled_timeout: Duration,
    pub click_interval: Duration,
    pub retry_delay: Duration,
    pub display_offset_seconds: i64,
}

impl AutomationSettings {
    pub fn from_config(config: &Config) -> Self {
        let automation = &config.automation;
        let cookies = config
            .site
            .cookie
            .as_deref()
            .map(|header| parse_cookie_header(header, &automation.cookie_domain))
            .unwrap_or_default();

        Self {
            expedition_url: automation.expedition_url.clone(),
            cookies,
            begin_selector: automation.begin_selector.clone(),
            perform_selector: automation.perform_selector.clone(),
            navigation_timeout: Duration::from_secs(automation.navigation_timeout_seconds),
            visible_timeout: Duration::from_secs(automation.visible_timeout_seconds),
            enabled_timeout: Duration::from_secs(automation.enabled_timeout_seconds),
            click_interval: Duration::from_secs(automation.click_interval_seconds),
            retry_delay: Duration::from_secs(automation.retry_delay_seconds),
            display_offset_seconds: config.poller.display_offset_seconds,
        }
    }
}

#[derive(Debug, Default)]
struct ControlState {
    active: bool,
    last_click: Option<String>,
    last_error: Option<String>,
    run: Option<CancellationToken>,
}

/// Controls the automation loop.
///
/// Cloning yields another handle to the same controller.
#[derive(Debug, Clone)]
pub struct AutomationController {
    control: Arc<Mutex<ControlState>>,
    run_slot: Arc<Mutex<()>>,
    launcher: Arc<dyn BrowserLauncher>,
    settings: Arc<AutomationSettings>,
}

impl AutomationController {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: AutomationSettings) -> Self {
        Self {
            control: Arc::new(Mutex::new(ControlState::default())),
            run_slot: Arc::new(Mutex::new(())),
            launcher,
            settings: Arc::new(settings),
        }
    }

    /// Start the loop. Returns `false` when it is already running.
    pub async fn start(&self) -> bool {
        let mut control = self.control.lock().await;
        if control.active {
            return false;
        }

        let token = CancellationToken::new();
        control.active = true;
        control.last_error = None;
        control.run = Some(token.clone());
        drop(control);

        let controller = self.clone();
        tokio::spawn(async move { controller.run_loop(token).await });
        tracing::info!("Automation started");
        true
    }

    /// Stop the loop. Returns `false` when it was not running.
    pub async fn stop(&self) -> bool {
        let mut control = self.control.lock().await;
        if !control.active {
            return false;
        }

        control.active = false;
        if let Some(token) = control.run.take() {
            token.cancel();
        }
        tracing::info!("Automation stopped");
        true
    }

    pub async fn status(&self) -> AutomationStatus {
        let control = self.control.lock().await;
        AutomationStatus {
            active: control.active,
            last_click: control.last_click.clone(),
            last_error: control.last_error.clone(),
        }
    }

    async fn run_loop(self, token: CancellationToken) {
        // Wait for any previous loop to release its browser
        let _slot = tokio::select! {
            slot = Arc::clone(&self.run_slot).lock_owned() => slot,
            _ = token.cancelled() => return,
        };

        while !token.is_cancelled() {
            if let Err(e) = self.run_session(&token).await {
                if token.is_cancelled() {
                    break;
                }
                tracing::warn!("Automation session failed: {}", e);
                self.control.lock().await.last_error = Some(e.to_string());

                tokio::select! {
                    _ = tokio::time::sleep(self.settings.retry_delay) => {}
                    _ = token.cancelled() => break,
                }
            }
        }
        tracing::debug!("Automation loop exited");
    }

    /// One browser session, closed on every exit path
    async fn run_session(&self, token: &CancellationToken) -> crate::Result<()> {
        let mut session = self.launcher.launch().await?;

        let result = tokio::select! {
            result = self.drive(session.as_mut(), token) => result,
            _ = token.cancelled() => Ok(()),
        };

        if let Err(e) = session.close().await {
            tracing::debug!("Closing browser session failed: {}", e);
        }
        result
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        token: &CancellationToken,
    ) -> crate::Result<()> {
        let settings = &self.settings;

        if !settings.cookies.is_empty() {
            session.add_cookies(&settings.cookies).await?;
        }
        session
            .goto(&settings.expedition_url, settings.navigation_timeout)
            .await?;

        session
            .wait_for_visible(&settings.begin_selector, settings.visible_timeout)
            .await?;
        session.click(&settings.begin_selector).await?;
        tracing::info!("Expedition opened");

        while !token.is_cancelled() {
            session
                .wait_for_visible(&settings.perform_selector, settings.visible_timeout)
                .await?;
            if let Err(e) = session
                .wait_for_enabled(&settings.perform_selector, settings.enabled_timeout)
                .await
            {
                tracing::debug!("Perform button not enabled in time: {}", e);
            }

            match session.click(&settings.perform_selector).await {
                Ok(()) => {
                    let at = time_of_day_after(Local::now(), 0, settings.display_offset_seconds);
                    tracing::info!("Expedition performed at {}", at.as_deref().unwrap_or("?"));
                    self.control.lock().await.last_click = at;
                }
                Err(e) => tracing::warn!("Perform click failed: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(settings.click_interval) => {}
                _ = token.cancelled() => break,
            }
        }
        Ok(())
    }
}
