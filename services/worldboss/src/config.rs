//! Configuration types for the world boss watcher

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Game website settings shared by the scraper and the browser automation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_world_bosses_path")]
    pub world_bosses_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Raw `Cookie` header of a logged-in session
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "default_page_timeout")]
    pub page_timeout_seconds: u64,
    #[serde(default = "default_detail_timeout")]
    pub detail_timeout_seconds: u64,
    #[serde(default = "default_max_other_bosses")]
    pub max_other_bosses: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            world_bosses_path: default_world_bosses_path(),
            user_agent: default_user_agent(),
            cookie: None,
            page_timeout_seconds: default_page_timeout(),
            detail_timeout_seconds: default_detail_timeout(),
            max_other_bosses: default_max_other_bosses(),
        }
    }
}

impl SiteConfig {
    pub fn world_bosses_url(&self) -> String {
        format!("{}{}", self.base_url, self.world_bosses_path)
    }

    pub fn boss_detail_url(&self, id: u64) -> String {
        format!("{}/worldboss/view/{}", self.base_url, id)
    }
}

/// Poll loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_seconds: u64,
    /// Added to every displayed time of day
    #[serde(default = "default_display_offset")]
    pub display_offset_seconds: i64,
    #[serde(default)]
    pub dump_html_on_failure: bool,
    #[serde(default = "default_html_snapshot_path")]
    pub html_snapshot_path: PathBuf,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval(),
            display_offset_seconds: default_display_offset(),
            dump_html_on_failure: false,
            html_snapshot_path: default_html_snapshot_path(),
        }
    }
}

/// Telegram notifier settings. The notifier is enabled only when both the bot
/// token and the chat id are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Send a diagnostic message once per minute while polling
    #[serde(default)]
    pub test_ping: bool,
    #[serde(default = "default_telegram_timeout")]
    pub timeout_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            test_ping: false,
            timeout_seconds: default_telegram_timeout(),
        }
    }
}

impl TelegramConfig {
    /// Token and chat id, when both are present and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat_id = self.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat_id))
    }
}

/// Browser automation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_expedition_url")]
    pub expedition_url: String,
    #[serde(default = "default_cookie_domain")]
    pub cookie_domain: String,
    #[serde(default = "default_begin_selector")]
    pub begin_selector: String,
    #[serde(default = "default_perform_selector")]
    pub perform_selector: String,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_seconds: u64,
    #[serde(default = "default_visible_timeout")]
    pub visible_timeout_seconds: u64,
    #[serde(default = "default_enabled_timeout")]
    pub enabled_timeout_seconds: u64,
    #[serde(default = "default_click_interval")]
    pub click_interval_seconds: u64,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            expedition_url: default_expedition_url(),
            cookie_domain: default_cookie_domain(),
            begin_selector: default_begin_selector(),
            perform_selector: default_perform_selector(),
            navigation_timeout_seconds: default_navigation_timeout(),
            visible_timeout_seconds: default_visible_timeout(),
            enabled_timeout_seconds: default_enabled_timeout(),
            click_interval_seconds: default_click_interval(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
            history_size: default_history_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://web.simple-mmo.com".to_string()
}

fn default_world_bosses_path() -> String {
    "/battle/world-bosses".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".to_string()
}

fn default_page_timeout() -> u64 {
    10
}

fn default_detail_timeout() -> u64 {
    8
}

fn default_max_other_bosses() -> usize {
    6
}

fn default_poll_interval() -> u64 {
    30
}

fn default_display_offset() -> i64 {
    3600
}

fn default_html_snapshot_path() -> PathBuf {
    PathBuf::from("/tmp/world_bosses.html")
}

fn default_telegram_timeout() -> u64 {
    5
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_expedition_url() -> String {
    "https://web.simple-mmo.com/quests".to_string()
}

fn default_cookie_domain() -> String {
    "web.simple-mmo.com".to_string()
}

fn default_begin_selector() -> String {
    r#"button[x-on\:click*="set-expedition-data"]"#.to_string()
}

fn default_perform_selector() -> String {
    r#"button[x-on\:click*="performExpedition"]"#.to_string()
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_visible_timeout() -> u64 {
    15
}

fn default_enabled_timeout() -> u64 {
    5
}

fn default_click_interval() -> u64 {
    299
}

fn default_retry_delay() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    8000
}

fn default_history_size() -> usize {
    100
}

impl Config {
    /// Apply environment overrides from the process environment
    pub fn resolve_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using the given variable lookup.
    ///
    /// Recognised variables: `COOKIE`, `DUMP_HTML_ON_FAILURE`,
    /// `HTML_SNAPSHOT_PATH`, `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`,
    /// `TELEGRAM_TEST_PING`, `WEBDRIVER_URL`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let trimmed = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(cookie) = trimmed("COOKIE") {
            self.site.cookie = Some(cookie).filter(|c| !c.is_empty());
        }
        if let Some(flag) = lookup("DUMP_HTML_ON_FAILURE") {
            self.poller.dump_html_on_failure = env_flag(&flag);
        }
        if let Some(path) = lookup("HTML_SNAPSHOT_PATH").filter(|p| !p.is_empty()) {
            self.poller.html_snapshot_path = PathBuf::from(path);
        }
        if let Some(token) = trimmed("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(chat_id) = trimmed("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id).filter(|c| !c.is_empty());
        }
        if let Some(flag) = lookup("TELEGRAM_TEST_PING") {
            self.telegram.test_ping = env_flag(&flag);
        }
        if let Some(url) = trimmed("WEBDRIVER_URL").filter(|u| !u.is_empty()) {
            self.automation.webdriver_url = url;
        }
    }
}

/// Environment flags are off for "", "0", "false" and "False"
fn env_flag(value: &str) -> bool {
    !matches!(value, "" | "0" | "false" | "False")
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::WorldbossError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
