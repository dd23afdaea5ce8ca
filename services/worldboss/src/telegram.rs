//! Telegram Bot API notification client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Telegram notification sender
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    timeout: Duration,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str, http: Arc<dyn HttpClient>) -> Self {
        tracing::debug!("Created TelegramNotifier for chat {}", chat_id);

        Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            timeout: DEFAULT_TIMEOUT,
            http,
        }
    }

    /// Bound on each `sendMessage` request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn type_name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", notification.message.as_str()),
        ];

        tracing::debug!("Sending Telegram message to chat {}", self.chat_id);

        let response = self
            .http
            .post_form(&self.send_message_url(), &params, self.timeout)
            .await?;

        if response.status != 200 {
            let body: String = response.body.chars().take(200).collect();
            return Err(crate::WorldbossError::Notifier(format!(
                "Telegram API returned status {}: {}",
                response.status, body
            )));
        }

        tracing::info!("Telegram notification sent: {}", notification.message);
        Ok(())
    }
}
