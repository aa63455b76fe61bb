//! Core parlor library (stream decoding, events, rendering, backend client, config).

pub mod chats;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod exchange;
pub mod logging;
pub mod markdown;
