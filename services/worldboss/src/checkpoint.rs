//! One-shot alert thresholds for the upcoming boss

use std::collections::BTreeSet;

/// An ETA threshold at which a single alert is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub threshold_seconds: u64,
    pub label: &'static str,
}

/// Checkpoints in evaluation order, largest threshold first
pub const CHECKPOINTS: [Checkpoint; 4] = [
    Checkpoint {
        threshold_seconds: 3_600,
        label: "1 heure",
    },
    Checkpoint {
        threshold_seconds: 900,
        label: "15 minutes",
    },
    Checkpoint {
        threshold_seconds: 120,
        label: "2 minutes",
    },
    Checkpoint {
        threshold_seconds: 0,
        label: "Actif",
    },
];

/// Tracks which checkpoints were already alerted for the current boss occurrence.
///
/// A boss occurrence is identified by `name-level`. When a different boss
/// becomes the next one, every checkpoint becomes eligible again.
#[derive(Debug, Default)]
pub struct CheckpointTracker {
    current_key: Option<String>,
    sent: BTreeSet<u64>,
}

impl CheckpointTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ETA observation and return the checkpoints that fire now.
    ///
    /// Returned checkpoints are marked as sent and will never be returned again
    /// for the same boss key. An unknown ETA fires nothing.
    pub fn observe(
        &mut self,
        name: &str,
        level_label: &str,
        eta_seconds: Option<u64>,
    ) -> Vec<Checkpoint> {
        let key = identity_key(name, level_label);
        if self.current_key.as_deref() != Some(key.as_str()) {
            tracing::debug!("Tracking checkpoints for new boss '{}'", key);
            self.current_key = Some(key);
            self.sent.clear();
        }

        let Some(eta) = eta_seconds else {
            return Vec::new();
        };

        let mut fired = Vec::new();
        for checkpoint in CHECKPOINTS {
            if eta <= checkpoint.threshold_seconds && self.sent.insert(checkpoint.threshold_seconds)
            {
                fired.push(checkpoint);
            }
        }
        fired
    }

    pub fn current_key(&self) -> Option<&str> {
        self.current_key.as_deref()
    }

    pub fn is_sent(&self, threshold_seconds: u64) -> bool {
        self.sent.contains(&threshold_seconds)
    }
}

/// Identity of a boss occurrence
pub fn identity_key(name: &str, level_label: &str) -> String {
    format!("{}-{}", name, level_label)
}
