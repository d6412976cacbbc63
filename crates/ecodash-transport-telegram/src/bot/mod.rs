/// Command and message handlers
pub mod handlers;
/// `ChatTransport` implementation over the Telegram Bot API
pub mod transport;

pub use transport::TelegramTransport;
