use crate::bot::handlers::{self, Command};
use crate::config::TransportSettings;
use ecodash_core::client::HttpStatsClient;
use ecodash_core::handlers::StatsBot;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::info;

/// Run the Telegram transport runtime until Ctrl-C.
///
/// Pending delayed messages are cancelled once the dispatcher stops.
pub async fn run_bot(settings: Arc<TransportSettings>) {
    let client = HttpStatsClient::new(&settings.bot.api_base_url);
    info!(base_url = %settings.bot.api_base_url, "Statistics client initialized.");

    let stats = Arc::new(StatsBot::new(Arc::new(client), settings.bot.clone()));
    let images = stats.images().count();
    info!(images, "Image store ready.");
    let shutdown = stats.shutdown_token();

    let bot = Bot::new(settings.telegram.telegram_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![stats])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, cancelling pending flows.");
    shutdown.cancel();
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.sticker().is_some())
                        .endpoint(handle_sticker),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    stats: Arc<StatsBot>,
) -> Result<(), teloxide::RequestError> {
    info!(
        user_id = handlers::get_user_id_safe(&msg),
        command = ?cmd,
        "Command received"
    );
    handlers::handle_command(bot, &msg, &cmd, stats);
    respond(())
}

async fn handle_sticker(
    bot: Bot,
    msg: Message,
    stats: Arc<StatsBot>,
) -> Result<(), teloxide::RequestError> {
    handlers::handle_sticker(bot, &msg, stats);
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    stats: Arc<StatsBot>,
) -> Result<(), teloxide::RequestError> {
    handlers::handle_text(bot, &msg, stats);
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    stats: Arc<StatsBot>,
) -> Result<(), teloxide::RequestError> {
    handlers::handle_callback(bot, &q, stats);
    respond(())
}
