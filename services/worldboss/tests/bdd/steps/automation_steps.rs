//! BDD step definitions for the expedition automation loop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};

use worldboss::automation::{AutomationController, AutomationSettings};
use worldboss::browser::{parse_cookie_header, BrowserCookie, BrowserLauncher, BrowserSession};
use worldboss::WorldbossError;

use crate::world::WorldbossWorld;

// --- Test doubles ---

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BrowserBehavior {
    #[default]
    Working,
    NoBeginButton,
    Unavailable,
}

/// A browser that tracks how many sessions are open at once
#[derive(Debug, Default)]
pub struct FakeBrowser {
    pub behavior: BrowserBehavior,
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub clicks: AtomicUsize,
}

impl FakeBrowser {
    pub fn new(behavior: BrowserBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct FakeBrowserLauncher(pub Arc<FakeBrowser>);

#[async_trait::async_trait]
impl BrowserLauncher for FakeBrowserLauncher {
    async fn launch(&self) -> worldboss::Result<Box<dyn BrowserSession>> {
        let browser = &self.0;
        if browser.behavior == BrowserBehavior::Unavailable {
            return Err(WorldbossError::Browser("browser unavailable".to_string()));
        }
        browser.launched.fetch_add(1, Ordering::SeqCst);
        let live = browser.live.fetch_add(1, Ordering::SeqCst) + 1;
        browser.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(FakeSession(Arc::clone(browser))))
    }
}

struct FakeSession(Arc<FakeBrowser>);

#[async_trait::async_trait]
impl BrowserSession for FakeSession {
    async fn add_cookies(&mut self, _cookies: &[BrowserCookie]) -> worldboss::Result<()> {
        Ok(())
    }

    async fn goto(&mut self, _url: &str, _timeout: Duration) -> worldboss::Result<()> {
        Ok(())
    }

    async fn wait_for_visible(&mut self, selector: &str, timeout: Duration) -> worldboss::Result<()> {
        if self.0.behavior == BrowserBehavior::NoBeginButton && selector == "#begin" {
            tokio::time::sleep(timeout).await;
            return Err(WorldbossError::Browser(format!(
                "Timed out waiting for '{selector}' to be visible"
            )));
        }
        Ok(())
    }

    async fn wait_for_enabled(&mut self, _selector: &str, _timeout: Duration) -> worldboss::Result<()> {
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> worldboss::Result<()> {
        if selector == "#perform" {
            self.0.clicks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn close(&mut self) -> worldboss::Result<()> {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
        self.0.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn fast_settings() -> AutomationSettings {
    AutomationSettings {
        expedition_url: "https://example.com/quests".to_string(),
        cookies: parse_cookie_header("session=abc", "example.com"),
        begin_selector: "#begin".to_string(),
        perform_selector: "#perform".to_string(),
        navigation_timeout: Duration::from_millis(200),
        visible_timeout: Duration::from_millis(30),
        enabled_timeout: Duration::from_millis(30),
        click_interval: Duration::from_millis(20),
        retry_delay: Duration::from_millis(20),
        display_offset_seconds: 0,
    }
}

fn controller(world: &WorldbossWorld) -> &AutomationController {
    world.automation.as_ref().expect("automation not set up")
}

fn browser(world: &WorldbossWorld) -> &FakeBrowser {
    world.browser.as_ref().expect("browser not set up")
}

async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting until {what}");
}

fn setup(world: &mut WorldbossWorld, behavior: BrowserBehavior) {
    let browser = Arc::new(FakeBrowser::new(behavior));
    let launcher = Arc::new(FakeBrowserLauncher(Arc::clone(&browser)));
    world.automation = Some(AutomationController::new(launcher, fast_settings()));
    world.browser = Some(browser);
}

// --- Steps ---

#[given("a browser that can run expeditions")]
fn working_browser(world: &mut WorldbossWorld) {
    setup(world, BrowserBehavior::Working);
}

#[given("a browser whose expedition page never shows the begin button")]
fn broken_page(world: &mut WorldbossWorld) {
    setup(world, BrowserBehavior::NoBeginButton);
}

#[given("a browser that cannot be launched")]
fn unavailable_browser(world: &mut WorldbossWorld) {
    setup(world, BrowserBehavior::Unavailable);
}

#[when("automation is started")]
async fn start(world: &mut WorldbossWorld) {
    let started = controller(world).start().await;
    world.start_results.push(started);
}

#[when("automation is stopped")]
async fn stop(world: &mut WorldbossWorld) {
    let stopped = controller(world).stop().await;
    world.stop_result = Some(stopped);
}

#[when(expr = "automation is started {int} times concurrently")]
async fn start_concurrently(world: &mut WorldbossWorld, count: usize) {
    let handles: Vec<_> = (0..count)
        .map(|_| {
            let c = controller(world).clone();
            tokio::spawn(async move { c.start().await })
        })
        .collect();
    for handle in handles {
        world.start_results.push(handle.await.expect("start task panicked"));
    }
}

#[when(expr = "automation is restarted {int} times in quick succession")]
async fn restart_repeatedly(world: &mut WorldbossWorld, count: usize) {
    let c = controller(world).clone();
    for _ in 0..count {
        c.stop().await;
        c.start().await;
    }
}

#[then("the last start should be accepted")]
fn start_accepted(world: &mut WorldbossWorld) {
    assert_eq!(world.start_results.last(), Some(&true));
}

#[then("the last start should be refused")]
fn start_refused(world: &mut WorldbossWorld) {
    assert_eq!(world.start_results.last(), Some(&false));
}

#[then(expr = "exactly {int} start(s) should be accepted")]
fn starts_accepted(world: &mut WorldbossWorld, expected: usize) {
    let accepted = world.start_results.iter().filter(|s| **s).count();
    assert_eq!(accepted, expected);
}

#[then("the stop should be accepted")]
fn stop_accepted(world: &mut WorldbossWorld) {
    assert_eq!(world.stop_result, Some(true));
}

#[then("the stop should be refused")]
fn stop_refused(world: &mut WorldbossWorld) {
    assert_eq!(world.stop_result, Some(false));
}

#[then("automation should be active")]
async fn is_active(world: &mut WorldbossWorld) {
    assert!(controller(world).status().await.active);
}

#[then("automation should be inactive")]
async fn is_inactive(world: &mut WorldbossWorld) {
    assert!(!controller(world).status().await.active);
}

#[then("a click should eventually be recorded")]
async fn click_recorded(world: &mut WorldbossWorld) {
    let b = browser(world);
    eventually("a click happens", || b.clicks.load(Ordering::SeqCst) > 0).await;
    let status = controller(world).status().await;
    assert!(status.last_click.is_some());
}

#[then(expr = "the last error should eventually mention {string}")]
async fn error_recorded(world: &mut WorldbossWorld, expected: String) {
    let c = controller(world);
    for _ in 0..200 {
        if let Some(error) = c.status().await.last_error {
            assert!(error.contains(&expected), "last error: {error}");
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no error recorded");
}

#[then(expr = "the browser should eventually have been launched at least {int} times")]
async fn launched_at_least(world: &mut WorldbossWorld, expected: usize) {
    let b = browser(world);
    eventually("enough sessions were launched", || {
        b.launched.load(Ordering::SeqCst) >= expected
    })
    .await;
}

#[then("every browser session should eventually be closed")]
async fn all_closed(world: &mut WorldbossWorld) {
    let b = browser(world);
    eventually("all sessions are closed", || b.live.load(Ordering::SeqCst) == 0).await;
    assert_eq!(
        b.launched.load(Ordering::SeqCst),
        b.closed.load(Ordering::SeqCst)
    );
}

#[then("no two browser sessions should have been open at once")]
fn never_overlapping(world: &mut WorldbossWorld) {
    assert!(browser(world).max_live.load(Ordering::SeqCst) <= 1);
}
