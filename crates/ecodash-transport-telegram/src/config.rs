//! Telegram transport settings.

use ecodash_core::config::BotSettings;
use std::fmt;
use std::sync::Arc;

/// Telegram-specific settings. The token is passed on the command line.
#[derive(Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_token: String,
}

impl TelegramSettings {
    /// Settings for the given bot token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            telegram_token: token.into(),
        }
    }
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("telegram_token", &"[REDACTED]")
            .finish()
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Bot settings shared with the conversational flows.
    pub bot: Arc<BotSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl TransportSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(bot: BotSettings, telegram: TelegramSettings) -> Self {
        Self {
            bot: Arc::new(bot),
            telegram: Arc::new(telegram),
        }
    }
}
