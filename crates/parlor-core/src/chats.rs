//! Chat list, history and mode types exchanged with the backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Titles longer than this are cut for display.
pub const TITLE_DISPLAY_LIMIT: usize = 40;

/// One entry of `GET /chats`; the wire shape is `[id, title]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
}

impl From<(String, String)> for ChatSummary {
    fn from((id, title): (String, String)) -> Self {
        Self { id, title }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(value),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
            Role::Other(name) => f.write_str(name),
        }
    }
}

/// One stored message of `GET /history/{id}`; the wire shape is `[role, text]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct HistoryMessage {
    pub role: Role,
    pub text: String,
}

impl From<(String, String)> for HistoryMessage {
    fn from((role, text): (String, String)) -> Self {
        Self {
            role: role.into(),
            text,
        }
    }
}

/// Backend routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Online,
    Offline,
}

impl Mode {
    pub fn toggle(self) -> Self {
        match self {
            Mode::Online => Mode::Offline,
            Mode::Offline => Mode::Online,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Online => "online",
            Mode::Offline => "offline",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Mode::Online),
            "offline" => Ok(Mode::Offline),
            other => Err(format!("unknown mode '{other}' (expected online or offline)")),
        }
    }
}

/// Body of `GET /mode` and `POST /mode`.
///
/// The backend also reports what it detects about its own connectivity,
/// independent of the selected mode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeStatus {
    pub mode: Mode,
    #[serde(default)]
    pub detected_online: Option<bool>,
    #[serde(default)]
    pub detected_status: Option<String>,
}

/// Generates a fresh chat identifier.
pub fn new_chat_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Shortens a title for list display, counting characters rather than bytes.
pub fn display_title(title: &str) -> String {
    if title.chars().count() > TITLE_DISPLAY_LIMIT {
        let cut: String = title.chars().take(TITLE_DISPLAY_LIMIT).collect();
        format!("{cut}...")
    } else {
        title.to_string()
    }
}

/// Case-insensitive title search. An empty query matches everything.
pub fn filter_chats<'a>(chats: &'a [ChatSummary], query: &str) -> Vec<&'a ChatSummary> {
    let needle = query.trim().to_lowercase();
    chats
        .iter()
        .filter(|chat| needle.is_empty() || chat.title.to_lowercase().contains(&needle))
        .collect()
}
