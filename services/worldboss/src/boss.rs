//! Boss snapshot types and the source trait the poll loop reads from

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_LEVEL: &str = "?";
pub const ACTIVE_ETA: &str = "Active";

/// Position of a boss in the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossKind {
    Next,
    Other,
}

impl fmt::Display for BossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BossKind::Next => write!(f, "Next"),
            BossKind::Other => write!(f, "Other"),
        }
    }
}

/// Combat stats from a boss detail page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossStats {
    pub hp: Option<u64>,
    pub strength: Option<u64>,
    pub dexterity: Option<u64>,
    pub defence: Option<u64>,
}

impl BossStats {
    pub fn is_empty(&self) -> bool {
        self.hp.is_none()
            && self.strength.is_none()
            && self.dexterity.is_none()
            && self.defence.is_none()
    }
}

/// One parsed boss entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossSnapshot {
    pub kind: BossKind,
    pub id: Option<u64>,
    pub name: String,
    pub level_label: String,
    pub eta_label: String,
    pub spawn_at_local: Option<String>,
    pub icon_url: Option<String>,
    pub stats: BossStats,
}

impl BossSnapshot {
    /// Build an entry, substituting placeholders for missing display fields.
    pub fn new(
        kind: BossKind,
        name: Option<String>,
        level_label: Option<String>,
        eta_label: Option<String>,
    ) -> Self {
        Self {
            kind,
            id: None,
            name: non_empty_or(name, UNKNOWN_NAME),
            level_label: non_empty_or(level_label, UNKNOWN_LEVEL),
            eta_label: non_empty_or(eta_label, ACTIVE_ETA),
            spawn_at_local: None,
            icon_url: None,
            stats: BossStats::default(),
        }
    }
}

fn non_empty_or(value: Option<String>, placeholder: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

/// Time of day `offset_seconds + eta_seconds` after `now`, as `HH:MM:SS`.
pub fn time_of_day_after(now: DateTime<Local>, eta_seconds: u64, offset_seconds: i64) -> Option<String> {
    let eta = i64::try_from(eta_seconds).ok()?;
    let delta = TimeDelta::try_seconds(eta.checked_add(offset_seconds)?)?;
    let at = now.checked_add_signed(delta)?;
    Some(at.format("%H:%M:%S").to_string())
}

/// Source of the current boss schedule
#[async_trait]
pub trait BossSource: Send + Sync + std::fmt::Debug {
    /// Fetch the schedule. The `Next` boss, when present, comes first.
    async fn fetch(&self) -> crate::Result<Vec<BossSnapshot>>;
}
