//! BDD step definitions for the poll loop

use std::collections::VecDeque;
use std::sync::Arc;

use cucumber::{given, then, when};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use worldboss::boss::{BossKind, BossSnapshot, BossSource};
use worldboss::config::Config;
use worldboss::notifier::{Notification, Notifier};
use worldboss::poller::Poller;
use worldboss::state::new_state_handle;
use worldboss::WorldbossError;

use crate::world::WorldbossWorld;

// --- Test doubles ---

/// A boss source that replays scripted results in order
#[derive(Debug, Default)]
pub struct ScriptedSource {
    results: Mutex<VecDeque<worldboss::Result<Vec<BossSnapshot>>>>,
}

impl ScriptedSource {
    pub fn new(results: Vec<worldboss::Result<Vec<BossSnapshot>>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
        }
    }
}

#[async_trait::async_trait]
impl BossSource for ScriptedSource {
    async fn fetch(&self) -> worldboss::Result<Vec<BossSnapshot>> {
        self.results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A notifier that records every message it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub messages: RwLock<Vec<String>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> worldboss::Result<()> {
        self.messages
            .write()
            .await
            .push(notification.message.clone());
        Ok(())
    }
}

pub fn next_boss(name: &str, level: &str, eta: &str) -> BossSnapshot {
    BossSnapshot::new(
        BossKind::Next,
        Some(name.to_string()),
        Some(level.to_string()),
        Some(eta.to_string()),
    )
}

// --- Steps ---

#[given(expr = "the schedule reports the next boss {string} level {string} with ETA {string}")]
fn schedule_reports(world: &mut WorldbossWorld, name: String, level: String, eta: String) {
    world.schedule.push(Ok(vec![next_boss(&name, &level, &eta)]));
}

#[given("the schedule reports no bosses")]
fn schedule_empty(world: &mut WorldbossWorld) {
    world.schedule.push(Ok(Vec::new()));
}

#[given("the schedule fails to load")]
fn schedule_fails(world: &mut WorldbossWorld) {
    world
        .schedule
        .push(Err(WorldbossError::Http("connection reset".to_string())));
}

#[when("the poll loop runs through the schedule")]
async fn run_schedule(world: &mut WorldbossWorld) {
    let results: Vec<_> = world.schedule.drain(..).collect();
    let cycles = results.len();
    let state = new_state_handle(50);
    let notifier = Arc::new(RecordingNotifier::default());
    let notifiers: Vec<Arc<dyn Notifier>> = vec![notifier.clone()];

    let mut poller = Poller::new(
        Arc::new(ScriptedSource::new(results)),
        notifiers,
        &Config::default(),
        Arc::clone(&state),
        CancellationToken::new(),
    );
    for _ in 0..cycles {
        let _ = poller.tick().await;
    }

    world.poll_state = Some(state);
    world.recording_notifier = Some(notifier);
}

#[then(expr = "{int} alert(s) should have been sent")]
async fn alerts_sent(world: &mut WorldbossWorld, expected: usize) {
    let notifier = world.recording_notifier.as_ref().expect("poll loop not run");
    let messages = notifier.messages.read().await;
    assert_eq!(messages.len(), expected, "alerts: {:?}", *messages);
}

#[then(expr = "alert {int} should announce {string} for {string}")]
async fn alert_announces(world: &mut WorldbossWorld, index: usize, label: String, name: String) {
    let notifier = world.recording_notifier.as_ref().expect("poll loop not run");
    let messages = notifier.messages.read().await;
    let message = messages
        .get(index - 1)
        .unwrap_or_else(|| panic!("no alert #{index}"));
    assert!(message.contains(&format!("Statut: {label}")), "{message}");
    assert!(message.contains(&format!("Boss: {name}")), "{message}");
}

#[then(expr = "the board should list {int} boss(es)")]
async fn board_lists(world: &mut WorldbossWorld, expected: usize) {
    let state = world.poll_state.as_ref().expect("poll loop not run");
    assert_eq!(state.read().await.board().bosses.len(), expected);
}

#[then(expr = "the board should show the next boss {string}")]
async fn board_next(world: &mut WorldbossWorld, expected: String) {
    let state = world.poll_state.as_ref().expect("poll loop not run");
    let board = state.read().await.board();
    let next = board.next_boss().expect("board is empty");
    assert_eq!(next.name, expected);
}

#[then(expr = "the notification history should hold {int} record(s)")]
async fn history_holds(world: &mut WorldbossWorld, expected: usize) {
    let state = world.poll_state.as_ref().expect("poll loop not run");
    assert_eq!(state.read().await.history.len(), expected);
}
