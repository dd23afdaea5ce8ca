//! Poll loop: refreshes the boss snapshot and dispatches checkpoint alerts

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use crate::boss::{time_of_day_after, BossSnapshot, BossSource};
use crate::checkpoint::{identity_key, CheckpointTracker};
use crate::config::Config;
use crate::eta::parse_eta_seconds;
use crate::notifier::{Notification, NotificationRecord, Notifier};
use crate::state::StateHandle;

const TEST_PING_KEY: &str = "test-ping";

/// Periodically re-scrapes the schedule and alerts on checkpoints of the next boss
#[derive(Debug)]
pub struct Poller {
    source: Arc<dyn BossSource>,
    notifiers: Vec<Arc<dyn Notifier>>,
    state: StateHandle,
    tracker: CheckpointTracker,
    interval: Duration,
    display_offset_seconds: i64,
    test_ping: bool,
    last_ping_minute: Option<u64>,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(
        source: Arc<dyn BossSource>,
        notifiers: Vec<Arc<dyn Notifier>>,
        config: &Config,
        state: StateHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            notifiers,
            state,
            tracker: CheckpointTracker::new(),
            interval: Duration::from_secs(config.poller.interval_seconds),
            display_offset_seconds: config.poller.display_offset_seconds,
            test_ping: config.telegram.test_ping,
            last_ping_minute: None,
            cancel,
        }
    }

    pub fn tracker(&self) -> &CheckpointTracker {
        &self.tracker
    }

    /// Run one refresh cycle, returning the number of bosses now on the board.
    ///
    /// A failed scrape leaves the board untouched.
    pub async fn tick(&mut self) -> crate::Result<usize> {
        let bosses = self.source.fetch().await?;
        let now = Local::now();
        let count = bosses.len();
        let next = bosses.first().cloned();

        self.state
            .write()
            .await
            .replace_board(bosses, time_of_day_after(now, 0, self.display_offset_seconds));
        tracing::info!("Bosses updated ({})", count);

        self.maybe_send_test_ping(now).await;

        if let Some(next) = next {
            self.check_checkpoints(&next).await;
        }

        Ok(count)
    }

    /// Poll until cancelled. Every cycle is followed by the fixed interval,
    /// whether it succeeded or not.
    pub async fn run(mut self) {
        loop {
            if let Err(e) = self.tick().await {
                tracing::error!("Scraping failed: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Poll loop cancelled");
                    break;
                }
            }
        }
    }

    async fn maybe_send_test_ping(&mut self, now: DateTime<Local>) {
        if !self.test_ping || self.notifiers.is_empty() {
            return;
        }
        let now_ms = current_epoch_ms();
        let minute = now_ms / 60_000;
        if self.last_ping_minute == Some(minute) {
            return;
        }
        let message = format!("[TEST] Ping {}", now.format("%H:%M:%S"));
        dispatch_notifications(TEST_PING_KEY, &message, &self.notifiers, &self.state, now_ms)
            .await;
        self.last_ping_minute = Some(minute);
    }

    async fn check_checkpoints(&mut self, next: &BossSnapshot) {
        let eta_seconds = parse_eta_seconds(Some(&next.eta_label));
        tracing::debug!(
            "Next boss={} level={} eta_label={} eta_seconds={:?} notifiers={}",
            next.name,
            next.level_label,
            next.eta_label,
            eta_seconds,
            self.notifiers.len()
        );

        let fired = self
            .tracker
            .observe(&next.name, &next.level_label, eta_seconds);
        if eta_seconds.is_none() {
            tracing::debug!("ETA not parsed, no checkpoint evaluation");
            return;
        }

        let boss_key = identity_key(&next.name, &next.level_label);
        for checkpoint in fired {
            let message = format_alert_message(next, checkpoint.label);
            dispatch_notifications(
                &boss_key,
                &message,
                &self.notifiers,
                &self.state,
                current_epoch_ms(),
            )
            .await;
        }
    }
}

/// Alert text for a boss reaching a checkpoint
pub fn format_alert_message(boss: &BossSnapshot, label: &str) -> String {
    format!(
        "⚔️ Boss: {}\n🏷️ Niveau: {}\n⏳ Statut: {}\n🕒 ETA: {}",
        boss.name, boss.level_label, label, boss.eta_label
    )
}

/// Send a message through every notifier and record each attempt.
/// Failures are logged and recorded, never retried.
pub async fn dispatch_notifications(
    boss_key: &str,
    message: &str,
    notifiers: &[Arc<dyn Notifier>],
    state: &StateHandle,
    now_ms: u64,
) {
    let notification = Notification {
        message: message.to_string(),
    };

    for notifier in notifiers {
        tracing::debug!(
            "Dispatching to '{}' for '{}': {}",
            notifier.type_name(),
            boss_key,
            message
        );

        let result = notifier.notify(&notification).await;
        let record = NotificationRecord {
            boss_key: boss_key.to_string(),
            notifier_type: notifier.type_name().to_string(),
            message: message.to_string(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp_epoch_ms: now_ms,
        };

        if let Err(e) = &result {
            tracing::warn!(
                "Notification via '{}' for '{}' failed: {}",
                notifier.type_name(),
                boss_key,
                e
            );
        }

        state.write().await.add_notification(record);
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
