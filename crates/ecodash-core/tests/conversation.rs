use async_trait::async_trait;
use ecodash_core::client::{Endpoint, FetchError, StatsApi};
use ecodash_core::config::BotSettings;
use ecodash_core::handlers::{ActionPress, Requester, StatsBot, GENERIC_FAILURE};
use ecodash_core::reply::ButtonMenu;
use ecodash_core::router::{CommandTable, Matcher, Route, TextCommand};
use ecodash_core::transport::{ChatId, ChatTransport, TransportError};
use regex::Regex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct CollectingTransport {
    messages: Mutex<Vec<String>>,
}

impl CollectingTransport {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn push(&self, message: String) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}

#[async_trait]
impl ChatTransport for CollectingTransport {
    async fn send_text(
        &self,
        _chat: ChatId,
        text: &str,
        _menu: Option<ButtonMenu>,
    ) -> Result<(), TransportError> {
        self.push(text.to_string());
        Ok(())
    }

    async fn send_photo(
        &self,
        _chat: ChatId,
        path: &Path,
        _caption: Option<String>,
    ) -> Result<(), TransportError> {
        self.push(format!("photo:{}", path.display()));
        Ok(())
    }

    async fn send_media_group(
        &self,
        _chat: ChatId,
        paths: Vec<PathBuf>,
    ) -> Result<(), TransportError> {
        self.push(format!("album:{}", paths.len()));
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        self.push(format!("ack:{query_id}:{}", text.unwrap_or_default()));
        Ok(())
    }
}

struct UnreachableApi;

#[async_trait]
impl StatsApi for UnreachableApi {
    async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, FetchError> {
        Err(FetchError::Status {
            status: 503,
            url: format!("https://api.invalid/{endpoint}"),
        })
    }
}

struct Co2Only;

#[async_trait]
impl StatsApi for Co2Only {
    async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, FetchError> {
        match endpoint {
            Endpoint::Co2Daily => Ok(json!({"data": []})),
            other => Err(FetchError::Status {
                status: 404,
                url: format!("https://api.invalid/{other}"),
            }),
        }
    }
}

fn requester() -> Requester {
    Requester {
        user_id: 7,
        first_name: "Sam".to_string(),
        username: None,
    }
}

fn bot(api: Arc<dyn StatsApi>) -> StatsBot {
    let settings = BotSettings {
        image_dir: PathBuf::from("/nonexistent/ecodash/img"),
        wait_notice_probability: 0.0,
        ..BotSettings::default()
    };
    StatsBot::new(api, Arc::new(settings))
}

#[tokio::test]
async fn first_matching_route_wins() {
    let commands = CommandTable::new(vec![
        Route::new(Matcher::contains("hello"), TextCommand::Greeting),
        Route::new(Matcher::contains("hello"), TextCommand::News),
        Route::catch_all(
            Matcher::Pattern(Regex::new("(.+)").expect("valid regex")),
            TextCommand::Country,
        ),
    ])
    .expect("catch-all is last");
    let bot = bot(Arc::new(UnreachableApi)).with_commands(commands);

    let greeted = CollectingTransport::default();
    bot.handle_text(&greeted, 1, &requester(), "hello there").await;
    assert_eq!(greeted.messages(), vec!["Hey there".to_string()]);

    let fell_through = CollectingTransport::default();
    bot.handle_text(&fell_through, 1, &requester(), "atlantis").await;
    assert_eq!(fell_through.messages(), vec![GENERIC_FAILURE.to_string()]);
}

#[tokio::test]
async fn unreachable_api_gets_single_apology() {
    let bot = bot(Arc::new(UnreachableApi));
    let transport = CollectingTransport::default();

    let report = bot
        .handle_text(&transport, 1, &requester(), "germany")
        .await;

    assert_eq!(report.sent, 1);
    assert_eq!(transport.messages(), vec![GENERIC_FAILURE.to_string()]);
}

#[tokio::test]
async fn empty_co2_series_is_reported_as_failure() {
    let bot = bot(Arc::new(Co2Only));
    let transport = CollectingTransport::default();

    bot.handle_text(&transport, 1, &requester(), "co2").await;

    let messages = transport.messages();
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages[0].starts_with("Sam, please wait"));
    assert_eq!(messages[1], GENERIC_FAILURE);
}

#[tokio::test]
async fn button_press_without_chat_is_only_acknowledged() {
    let bot = bot(Arc::new(UnreachableApi));
    let transport = CollectingTransport::default();
    let press = ActionPress {
        query_id: "abc".to_string(),
        data: "detail France all".to_string(),
        chat: None,
        from: requester(),
    };

    let report = bot.handle_action(&transport, &press).await;

    assert_eq!(report.sent, 0);
    assert_eq!(transport.messages(), vec!["ack:abc:".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_pending_help_messages() {
    let bot = bot(Arc::new(UnreachableApi));
    let transport = CollectingTransport::default();
    let shutdown = bot.shutdown_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        shutdown.cancel();
    });

    let report = bot.handle_text(&transport, 1, &requester(), "help").await;

    assert!(report.cancelled);
    assert_eq!(report.sent, 2);
    let messages = transport.messages();
    assert_eq!(messages[0], "Hi Sam!");
    assert!(messages[1].starts_with("Here are some commands"));
}
