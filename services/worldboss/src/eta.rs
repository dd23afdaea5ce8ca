//! Countdown label parsing
//!
//! The schedule page renders the time until a boss spawns in several shapes
//! depending on how far away it is and on the account language. Every shape is
//! normalised here into seconds remaining.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static DAYS_HOURS_MINS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)\s*days?,\s*)?(?:(\d+)\s*hours?,\s*)?(?:(\d+)\s*mins?(?:ute)?s?)?$")
        .unwrap()
});

static HOURS_MINS_SECS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})$").unwrap());

static MINS_SECS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(?:minutes?|mins?|m)$").unwrap());

static FRENCH_HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*heures?\s*(\d+)?").unwrap());

/// Convert a countdown label into seconds remaining.
///
/// Returns `Some(0)` for anything mentioning "active"/"actif", and `None` when
/// the label is missing or in no recognised shape. Callers treat `None` as an
/// unknown ETA.
pub fn parse_eta_seconds(label: Option<&str>) -> Option<u64> {
    let label = label?;
    let lower = label.trim().to_lowercase();
    let norm = WHITESPACE.replace_all(&lower, " ").into_owned();
    if norm.is_empty() {
        return None;
    }

    if norm.contains("actif") || norm.contains("active") {
        return Some(0);
    }

    if let Some(caps) = DAYS_HOURS_MINS.captures(&norm) {
        return combine(&caps, &[(1, 86_400), (2, 3_600), (3, 60)]);
    }

    if let Some(caps) = HOURS_MINS_SECS.captures(&norm) {
        return combine(&caps, &[(1, 3_600), (2, 60), (3, 1)]);
    }

    if let Some(caps) = MINS_SECS.captures(&norm) {
        return combine(&caps, &[(1, 60), (2, 1)]);
    }

    if let Some(caps) = MINUTES.captures(&norm) {
        return combine(&caps, &[(1, 60)]);
    }

    if let Some(caps) = FRENCH_HOURS.captures(&norm) {
        return combine(&caps, &[(1, 3_600), (2, 60)]);
    }

    None
}

/// Sum of `group * unit` over the given capture groups. `None` when a number
/// does not fit or the total overflows.
fn combine(caps: &regex::Captures<'_>, units: &[(usize, u64)]) -> Option<u64> {
    units.iter().try_fold(0u64, |total, &(index, unit)| {
        group(caps, index)?.checked_mul(unit)?.checked_add(total)
    })
}

/// Numeric capture group, 0 when it did not participate in the match.
fn group(caps: &regex::Captures<'_>, index: usize) -> Option<u64> {
    match caps.get(index) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}
