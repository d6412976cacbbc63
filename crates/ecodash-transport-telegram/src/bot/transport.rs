//! Telegram rendering of outbound messages.

use async_trait::async_trait;
use ecodash_core::reply::ButtonMenu;
use ecodash_core::transport::{ChatTransport, TransportError};
use std::path::{Path, PathBuf};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia,
    InputMediaPhoto, ParseMode,
};
use tracing::debug;

/// Sends flow output through the Telegram Bot API in HTML parse mode.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot handle.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Render a menu as inline keyboard rows.
#[must_use]
pub fn inline_keyboard(menu: &ButtonMenu) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = menu
        .rows()
        .map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.clone()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

fn attachment(path: &Path) -> Result<InputFile, TransportError> {
    if path.is_file() {
        Ok(InputFile::file(path.to_path_buf()))
    } else {
        Err(TransportError::Attachment(format!(
            "{} is not a readable file",
            path.display()
        )))
    }
}

fn api_error(e: &teloxide::RequestError) -> TransportError {
    TransportError::Api(e.to_string())
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(
        &self,
        chat: i64,
        text: &str,
        menu: Option<ButtonMenu>,
    ) -> Result<(), TransportError> {
        let mut req = self
            .bot
            .send_message(ChatId(chat), text)
            .parse_mode(ParseMode::Html);
        if let Some(menu) = menu {
            req = req.reply_markup(inline_keyboard(&menu));
        }
        req.await.map_err(|e| api_error(&e))?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: i64,
        path: &Path,
        caption: Option<String>,
    ) -> Result<(), TransportError> {
        let mut req = self.bot.send_photo(ChatId(chat), attachment(path)?);
        if let Some(caption) = caption {
            req = req.caption(caption).parse_mode(ParseMode::Html);
        }
        req.await.map_err(|e| api_error(&e))?;
        debug!(chat, path = %path.display(), "Photo sent");
        Ok(())
    }

    async fn send_media_group(
        &self,
        chat: i64,
        paths: Vec<PathBuf>,
    ) -> Result<(), TransportError> {
        let media = paths
            .iter()
            .map(|p| attachment(p).map(|file| InputMedia::Photo(InputMediaPhoto::new(file))))
            .collect::<Result<Vec<_>, _>>()?;
        self.bot
            .send_media_group(ChatId(chat), media)
            .await
            .map_err(|e| api_error(&e))?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        let mut req = self
            .bot
            .answer_callback_query(CallbackQueryId(query_id.to_owned()));
        if let Some(text) = text {
            req = req.text(text);
        }
        req.await.map_err(|e| api_error(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_keyboard_rows() {
        let menu = ButtonMenu::with_columns(2)
            .button("All", "detail France all")
            .and_then(|m| m.button("Alphabetical", "detail France sorted"))
            .and_then(|m| m.button("Top 10", "detail France top"))
            .expect("unique actions");
        let markup = inline_keyboard(&menu);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[1][0].text, "Top 10");
    }

    #[test]
    fn test_missing_attachment_is_rejected() {
        let result = attachment(Path::new("/nonexistent/ecodash/img/covid-France.png"));
        assert!(matches!(result, Err(TransportError::Attachment(_))));
    }
}
