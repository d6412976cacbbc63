#![deny(missing_docs)]
//! Ecodash bot core library.
//!
//! Transport-agnostic logic for the statistics bot: data fetching, caption
//! formatting, command routing and multi-message flows.

/// Remote statistics API client.
pub mod client;
/// Configuration management.
pub mod config;
/// Delayed message sequences and their playback.
pub mod flow;
/// Caption and number formatting.
pub mod format;
/// Conversational flows selected by the router.
pub mod handlers;
/// Local chart image lookup.
pub mod images;
/// Typed records returned by the statistics API.
pub mod records;
/// Country and region name resolution.
pub mod resolve;
/// Outbound message model (text, photos, button menus).
pub mod reply;
/// Text and button-action routing tables.
pub mod router;
/// Chat transport abstraction.
pub mod transport;

#[cfg(test)]
pub mod testing;
