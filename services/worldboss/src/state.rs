//! Shared state for the boss snapshot and notification history

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::boss::BossSnapshot;
use crate::notifier::NotificationRecord;

/// The boss list as of one refresh. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BossBoard {
    pub bosses: Vec<BossSnapshot>,
    pub last_update: Option<String>,
}

impl BossBoard {
    pub fn next_boss(&self) -> Option<&BossSnapshot> {
        self.bosses.first()
    }
}

/// Shared state accessible by the poll loop and the dashboard
#[derive(Debug)]
pub struct SharedState {
    board: Arc<BossBoard>,
    pub history: VecDeque<NotificationRecord>,
    pub history_max_size: usize,
}

impl SharedState {
    pub fn new(history_max_size: usize) -> Self {
        Self {
            board: Arc::new(BossBoard::default()),
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
        }
    }

    /// Current board. Readers keep their `Arc` even if a refresh lands meanwhile.
    pub fn board(&self) -> Arc<BossBoard> {
        Arc::clone(&self.board)
    }

    /// Swap in a freshly scraped board
    pub fn replace_board(&mut self, bosses: Vec<BossSnapshot>, last_update: Option<String>) {
        self.board = Arc::new(BossBoard {
            bosses,
            last_update,
        });
    }

    /// Add a notification to history
    pub fn add_notification(&mut self, record: NotificationRecord) {
        if self.history_max_size == 0 {
            return;
        }
        if self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(history_max_size: usize) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(history_max_size)))
}
