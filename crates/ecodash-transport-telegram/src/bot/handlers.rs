use crate::bot::TelegramTransport;
use ecodash_core::handlers::{ActionPress, Requester, StatsBot};
use ecodash_core::images::StaticChart;
use ecodash_core::router::Intent;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, User};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

fn requester(user: &User) -> Requester {
    Requester {
        user_id: user.id.0.cast_signed(),
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    }
}

fn message_requester(msg: &Message) -> Requester {
    msg.from.as_ref().map_or_else(
        || Requester {
            user_id: get_user_id_safe(msg),
            ..Requester::default()
        },
        requester,
    )
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Welcome message and command list
    #[command(description = "Start the bot.")]
    Start,
    /// Same as start
    #[command(description = "Show help.")]
    Help,
    /// Latest atmospheric CO2
    #[command(description = "Latest atmospheric CO2.")]
    Co2,
    /// Renewable energy chart
    #[command(description = "Renewable energy chart.")]
    Renewables,
    /// Countries with data
    #[command(description = "List countries with data.")]
    List,
    /// All climate charts
    #[command(description = "Climate charts.")]
    Charts,
}

impl Command {
    /// Flow a command runs
    #[must_use]
    pub const fn intent(&self) -> Intent {
        match self {
            Self::Start | Self::Help => Intent::Help,
            Self::Co2 => Intent::Co2,
            Self::Renewables => Intent::Chart(StaticChart::Renewables),
            Self::List => Intent::List,
            Self::Charts => Intent::Gallery,
        }
    }
}

/// Run a command's flow in the background.
pub fn handle_command(bot: Bot, msg: &Message, cmd: &Command, stats: Arc<StatsBot>) {
    run_intent(bot, msg, cmd.intent(), stats);
}

/// Run the sticker reply in the background.
pub fn handle_sticker(bot: Bot, msg: &Message, stats: Arc<StatsBot>) {
    run_intent(bot, msg, Intent::Sticker, stats);
}

/// Route free text and run the matching flow in the background.
pub fn handle_text(bot: Bot, msg: &Message, stats: Arc<StatsBot>) {
    let Some(text) = msg.text().map(str::to_owned) else {
        return;
    };
    let chat = msg.chat.id.0;
    let from = message_requester(msg);
    let transport = TelegramTransport::new(bot);

    tokio::spawn(async move {
        let report = stats.handle_text(&transport, chat, &from, &text).await;
        debug!(chat, ?report, "Text flow finished");
    });
}

fn run_intent(bot: Bot, msg: &Message, intent: Intent, stats: Arc<StatsBot>) {
    let chat = msg.chat.id.0;
    let from = message_requester(msg);
    let transport = TelegramTransport::new(bot);

    tokio::spawn(async move {
        let report = stats.handle_intent(&transport, chat, &from, intent).await;
        debug!(chat, ?report, "Flow finished");
    });
}

/// Handle an inline button press.
pub fn handle_callback(bot: Bot, q: &CallbackQuery, stats: Arc<StatsBot>) {
    let Some(data) = q.data.clone() else {
        warn!(user_id = q.from.id.0, "Callback query without data");
        let query_id = q.id.0.clone();
        let transport = TelegramTransport::new(bot);
        tokio::spawn(async move {
            stats.acknowledge(&transport, &query_id).await;
        });
        return;
    };
    let press = ActionPress {
        query_id: q.id.0.clone(),
        data,
        chat: q.message.as_ref().map(|msg| msg.chat().id.0),
        from: requester(&q.from),
    };
    info!(user = press.from.display_name(), data = %press.data, "Button pressed");
    let transport = TelegramTransport::new(bot);

    tokio::spawn(async move {
        let report = stats.handle_action(&transport, &press).await;
        debug!(?report, "Action flow finished");
    });
}
