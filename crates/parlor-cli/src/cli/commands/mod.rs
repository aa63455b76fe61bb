//! CLI command handlers.

pub mod ask;
pub mod chats;
pub mod config;
pub mod mode;
pub mod render;
