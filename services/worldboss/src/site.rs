//! World boss schedule scraper
//!
//! Fetches the schedule page, picks the "next boss" card and the list of
//! later bosses out of the markup, and enriches each entry with stats from its
//! detail page. Selectors follow the site's current Tailwind markup, so a
//! redesign degrades to placeholder values rather than errors.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::boss::{time_of_day_after, BossKind, BossSnapshot, BossSource, BossStats};
use crate::config::{PollerConfig, SiteConfig};
use crate::eta::parse_eta_seconds;
use crate::io::HttpClient;

fn css(selector: &str) -> Selector {
    Selector::parse(selector).unwrap()
}

static NEXT_CARD: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    vec![
        css("div.pointer-events-auto div.border-indigo-400"),
        css("div.w-full.bg-white.border-2.border-indigo-400"),
        css("div.w-full.bg-white.border-2"),
        css("div.w-full.bg-white"),
    ]
});
static NEXT_NAME: LazyLock<Selector> =
    LazyLock::new(|| css(r"p.text-xs.sm\:text-sm.font-medium.text-gray-900"));
static NEXT_LEVEL: LazyLock<Selector> =
    LazyLock::new(|| css(r"p.text-xs.sm\:text-sm.text-gray-500"));
static NEXT_TIME: LazyLock<Selector> =
    LazyLock::new(|| css(r"p.text-xs.sm\:text-sm.text-gray-400"));
static NEXT_LINK: LazyLock<Selector> = LazyLock::new(|| css("a[href*='worldboss/view']"));
static OTHER_ROWS: LazyLock<Selector> =
    LazyLock::new(|| css("div.divide-y div.flex.justify-between"));
static OTHER_NAME: LazyLock<Selector> = LazyLock::new(|| css("div.font-bold"));
static OTHER_LEVEL: LazyLock<Selector> = LazyLock::new(|| css("div.text-gray-600.font-normal"));
static OTHER_TIME: LazyLock<Selector> =
    LazyLock::new(|| css(r"div.text-xs.sm\:text-sm.text-gray-500.font-normal"));
static IMG: LazyLock<Selector> = LazyLock::new(|| css("img"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| css("title"));
static STAT_TERMS: LazyLock<Selector> = LazyLock::new(|| css("dl dt"));

static BOSS_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"worldboss/view/(\d+)").unwrap());

static STAT_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    let stat = |labels: &str| {
        Regex::new(&format!(
            r"(?i)(?:{})\s*:?\s*([0-9][0-9\s\u{{00A0}}'.,]*)",
            labels
        ))
        .unwrap()
    };
    [
        stat("Health|Vie|HP"),
        stat("Strength|Force|STR"),
        stat("Dexterity|Dexterité|Dexterite|DEX"),
        stat("Defence|Defense|DEF"),
    ]
});

/// Boss fields as they appear in the markup, before enrichment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBoss {
    pub name: Option<String>,
    pub level: Option<String>,
    pub eta: Option<String>,
    pub icon_url: Option<String>,
    pub id: Option<u64>,
}

/// Everything extracted from one schedule page
#[derive(Debug, Clone, Default)]
pub struct ParsedSchedule {
    pub title: Option<String>,
    pub next_card_found: bool,
    pub next: RawBoss,
    pub others: Vec<RawBoss>,
}

impl ParsedSchedule {
    /// Whether the page looks like an anti-bot interstitial or a login form
    pub fn looks_protected(&self) -> bool {
        self.title.as_deref().is_some_and(|title| {
            title.contains("Just a moment")
                || title.contains("Cloudflare")
                || title.to_lowercase().contains("login")
        })
    }
}

/// Extract the numeric id from a `.../worldboss/view/<id>` link
pub fn extract_boss_id(link: Option<&str>) -> Option<u64> {
    let caps = BOSS_ID.captures(link?)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Resolve a site-relative asset path against the site base URL
pub fn absolutize(src: Option<&str>, base_url: &str) -> Option<String> {
    let src = src.filter(|s| !s.is_empty())?;
    if src.starts_with("http://") || src.starts_with("https://") {
        Some(src.to_string())
    } else {
        Some(format!("{}{}", base_url, src))
    }
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element.text().map(str::trim).collect();
    (!text.is_empty()).then_some(text)
}

fn select_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().and_then(element_text)
}

fn select_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

/// Parse the schedule page markup
pub fn parse_schedule(html: &str, base_url: &str) -> ParsedSchedule {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .and_then(element_text);

    let next_card = NEXT_CARD
        .iter()
        .find_map(|selector| document.select(selector).next());

    let next = match next_card {
        Some(card) => RawBoss {
            name: select_text(card, &NEXT_NAME),
            level: select_text(card, &NEXT_LEVEL),
            eta: select_text(card, &NEXT_TIME),
            icon_url: absolutize(select_attr(card, &IMG, "src").as_deref(), base_url),
            id: extract_boss_id(select_attr(card, &NEXT_LINK, "href").as_deref()),
        },
        None => RawBoss::default(),
    };

    let others = document
        .select(&OTHER_ROWS)
        .map(|row| RawBoss {
            name: select_text(row, &OTHER_NAME),
            level: select_text(row, &OTHER_LEVEL),
            eta: select_text(row, &OTHER_TIME),
            icon_url: absolutize(select_attr(row, &IMG, "src").as_deref(), base_url),
            id: extract_boss_id(row.value().attr("onclick")),
        })
        .collect();

    ParsedSchedule {
        title,
        next_card_found: next_card.is_some(),
        next,
        others,
    }
}

fn clean_number(value: &str) -> Option<u64> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Parse combat stats from a boss detail page.
///
/// Definition-list pairs are read first; any stat still missing is searched
/// for in the page text.
pub fn parse_boss_stats(html: &str) -> BossStats {
    let document = Html::parse_document(html);
    let mut stats = BossStats::default();

    for term in document.select(&STAT_TERMS) {
        let label = element_text(term).unwrap_or_default().to_lowercase();
        let value = term
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "dd")
            .and_then(element_text)
            .and_then(|text| clean_number(&text));

        let slot = if label.starts_with("health") || label.starts_with("vie") {
            &mut stats.hp
        } else if label.starts_with("strength") || label.starts_with("force") {
            &mut stats.strength
        } else if label.starts_with("dexter") {
            &mut stats.dexterity
        } else if label.starts_with("defence") || label.starts_with("defense") {
            &mut stats.defence
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = value;
        }
    }

    let text = document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let grab = |pattern: &Regex| {
        pattern
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| clean_number(m.as_str()))
    };

    let [hp, strength, dexterity, defence] = &*STAT_PATTERNS;
    stats.hp = stats.hp.or_else(|| grab(hp));
    stats.strength = stats.strength.or_else(|| grab(strength));
    stats.dexterity = stats.dexterity.or_else(|| grab(dexterity));
    stats.defence = stats.defence.or_else(|| grab(defence));

    stats
}

/// Scraper for the live game website
pub struct SiteScraper {
    site: SiteConfig,
    display_offset_seconds: i64,
    dump_path: Option<PathBuf>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for SiteScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteScraper")
            .field("url", &self.site.world_bosses_url())
            .finish()
    }
}

impl SiteScraper {
    pub fn new(site: &SiteConfig, poller: &PollerConfig, http: Arc<dyn HttpClient>) -> Self {
        tracing::debug!("Created SiteScraper for {}", site.world_bosses_url());

        Self {
            site: site.clone(),
            display_offset_seconds: poller.display_offset_seconds,
            dump_path: poller
                .dump_html_on_failure
                .then(|| poller.html_snapshot_path.clone()),
            http,
        }
    }

    /// Write the raw markup to the diagnostic snapshot file, if enabled
    async fn dump_html(&self, content: &str, reason: &str) {
        let Some(path) = &self.dump_path else {
            return;
        };
        match tokio::fs::write(path, content).await {
            Ok(()) => tracing::info!(
                "Dumped HTML to {:?} (len={}) reason={}",
                path,
                content.len(),
                reason
            ),
            Err(e) => tracing::warn!("Failed to write HTML snapshot {:?}: {}", path, e),
        }
    }

    async fn fetch_stats(&self, id: u64) -> BossStats {
        let url = self.site.boss_detail_url(id);
        let timeout = Duration::from_secs(self.site.detail_timeout_seconds);
        match self.http.get(&url, timeout).await {
            Ok(response) if response.status == 200 => parse_boss_stats(&response.body),
            Ok(response) => {
                tracing::debug!("Boss {} detail HTTP {}", id, response.status);
                BossStats::default()
            }
            Err(e) => {
                tracing::debug!("Failed to fetch boss {} detail: {}", id, e);
                BossStats::default()
            }
        }
    }

    async fn build_entry(&self, kind: BossKind, raw: RawBoss, now: DateTime<Local>) -> BossSnapshot {
        let stats = match raw.id {
            Some(id) => self.fetch_stats(id).await,
            None => BossStats::default(),
        };
        let spawn_at_local = parse_eta_seconds(raw.eta.as_deref())
            .and_then(|eta| time_of_day_after(now, eta, self.display_offset_seconds));

        let mut boss = BossSnapshot::new(kind, raw.name, raw.level, raw.eta);
        boss.id = raw.id;
        boss.icon_url = raw.icon_url;
        boss.spawn_at_local = spawn_at_local;
        boss.stats = stats;
        boss
    }
}

#[async_trait]
impl BossSource for SiteScraper {
    async fn fetch(&self) -> crate::Result<Vec<BossSnapshot>> {
        let url = self.site.world_bosses_url();
        let timeout = Duration::from_secs(self.site.page_timeout_seconds);
        let response = self.http.get(&url, timeout).await?;

        if response.status != 200 {
            tracing::error!("HTTP {} on {}", response.status, url);
            self.dump_html(&response.body, &format!("http-status-{}", response.status))
                .await;
            return Ok(Vec::new());
        }

        let schedule = parse_schedule(&response.body, &self.site.base_url);
        if let Some(title) = &schedule.title {
            tracing::debug!("Page title: {}", title);
        }
        if schedule.looks_protected() {
            tracing::warn!(
                "Page looks protected (title={:?}); a session cookie or another user agent may be needed",
                schedule.title
            );
        }
        tracing::debug!(
            "Next card found={} name={:?} level={:?} eta={:?} icon={}",
            schedule.next_card_found,
            schedule.next.name,
            schedule.next.level,
            schedule.next.eta,
            schedule.next.icon_url.is_some()
        );
        tracing::debug!("Other rows={}", schedule.others.len());

        let now = Local::now();
        let ParsedSchedule { next, others, .. } = schedule;

        let others: Vec<RawBoss> = others
            .into_iter()
            .take(self.site.max_other_bosses)
            .collect();
        if others.is_empty() {
            tracing::warn!("No other bosses found on the schedule page");
            self.dump_html(&response.body, "missing-other-nodes").await;
        }

        let mut bosses = Vec::with_capacity(others.len() + 1);
        bosses.push(self.build_entry(BossKind::Next, next, now).await);
        for raw in others {
            bosses.push(self.build_entry(BossKind::Other, raw, now).await);
        }

        Ok(bosses)
    }
}
