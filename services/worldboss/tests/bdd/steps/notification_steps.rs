//! BDD step definitions for Telegram notifications

use std::sync::Arc;

use cucumber::{given, then, when};
use tokio::sync::RwLock;

use worldboss::io::{HttpClient, HttpResponse};
use worldboss::notifier::Notification;
use worldboss::telegram::TelegramNotifier;
use worldboss::WorldbossError;

use crate::world::WorldbossWorld;

/// A recorded form POST
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub url: String,
    pub params: Vec<(String, String)>,
}

/// An HTTP client that records POSTs and answers with a canned response,
/// or fails when no response is configured
#[derive(Debug, Default)]
pub struct RecordingHttpClient {
    pub response: Option<(u16, String)>,
    pub posts: RwLock<Vec<RecordedPost>>,
}

impl RecordingHttpClient {
    pub fn answering(status: u16, body: &str) -> Self {
        Self {
            response: Some((status, body.to_string())),
            posts: RwLock::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl HttpClient for RecordingHttpClient {
    async fn get(&self, _url: &str, _timeout: std::time::Duration) -> worldboss::Result<HttpResponse> {
        Err(WorldbossError::Http("unexpected GET".to_string()))
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        _timeout: std::time::Duration,
    ) -> worldboss::Result<HttpResponse> {
        self.posts.write().await.push(RecordedPost {
            url: url.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        match &self.response {
            Some((status, body)) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            None => Err(WorldbossError::Http("connection refused".to_string())),
        }
    }
}

fn install(world: &mut WorldbossWorld, http: RecordingHttpClient) {
    let http = Arc::new(http);
    let notifier = TelegramNotifier::new("123:secret", "42", http.clone());
    world.notifier = Some(Box::new(notifier));
    world.notifier_http = Some(http);
}

#[given("a Telegram notifier with valid credentials")]
fn telegram_valid(world: &mut WorldbossWorld) {
    install(world, RecordingHttpClient::answering(200, r#"{"ok":true}"#));
}

#[given("a Telegram notifier that returns an API error")]
fn telegram_api_error(world: &mut WorldbossWorld) {
    install(
        world,
        RecordingHttpClient::answering(401, r#"{"ok":false,"description":"Unauthorized"}"#),
    );
}

#[given("a Telegram notifier that is unreachable")]
fn telegram_unreachable(world: &mut WorldbossWorld) {
    install(world, RecordingHttpClient::unreachable());
}

#[when(expr = "the message {string} is sent")]
async fn send_message(world: &mut WorldbossWorld, message: String) {
    let notifier = world.notifier.as_ref().expect("notifier not set");
    let result = notifier.notify(&Notification { message }).await;
    world.notification_result = Some(result);
}

#[then("the notification should succeed")]
fn notification_succeeds(world: &mut WorldbossWorld) {
    let result = world.notification_result.as_ref().expect("no result");
    result.as_ref().unwrap();
}

#[then("the notification should fail with an error")]
fn notification_fails(world: &mut WorldbossWorld) {
    let result = world.notification_result.as_ref().expect("no result");
    assert!(result.is_err());
}

#[then(expr = "the Telegram API should have received text {string} for chat {string}")]
async fn telegram_received(world: &mut WorldbossWorld, text: String, chat: String) {
    let http = world.notifier_http.as_ref().expect("notifier not set");
    let posts = http.posts.read().await;
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post.url, "https://api.telegram.org/bot123:secret/sendMessage");
    assert!(post.params.contains(&("chat_id".to_string(), chat)));
    assert!(post.params.contains(&("text".to_string(), text)));
}
