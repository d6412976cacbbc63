//! Chat transport abstraction.
//!
//! The core never talks to a messaging platform directly; it goes through
//! [`ChatTransport`], which the Telegram adapter implements.

use crate::reply::{ButtonMenu, Outbound};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Platform-neutral chat identifier
pub type ChatId = i64;

/// Errors reported by a chat transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The platform API rejected or failed the request
    #[error("Transport API error: {0}")]
    Api(String),
    /// A local file could not be attached
    #[error("Attachment error: {0}")]
    Attachment(String),
}

/// Outbound operations of a messaging platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send HTML text, optionally with inline buttons
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        menu: Option<ButtonMenu>,
    ) -> Result<(), TransportError>;

    /// Send a local image with an optional HTML caption
    async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<String>,
    ) -> Result<(), TransportError>;

    /// Send several local images as one album
    async fn send_media_group(
        &self,
        chat: ChatId,
        paths: Vec<PathBuf>,
    ) -> Result<(), TransportError>;

    /// Acknowledge a button press with a short notice
    async fn answer_callback(&self, query_id: &str, text: Option<String>)
        -> Result<(), TransportError>;
}

/// Send one [`Outbound`] message through a transport.
///
/// # Errors
///
/// Returns the transport's error unchanged.
pub async fn deliver(
    transport: &dyn ChatTransport,
    chat: ChatId,
    message: Outbound,
) -> Result<(), TransportError> {
    match message {
        Outbound::Text { text, menu } => transport.send_text(chat, &text, menu).await,
        Outbound::Photo { path, caption } => transport.send_photo(chat, &path, caption).await,
        Outbound::MediaGroup(paths) => transport.send_media_group(chat, paths).await,
    }
}
