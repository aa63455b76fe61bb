//! Ask command handler.

use std::time::Duration;

use anyhow::{Context, Result};
use parlor_core::chats;
use parlor_core::client::BackendClient;

use crate::modes;

pub struct AskRunOptions<'a> {
    pub client: &'a BackendClient,
    pub message: &'a str,
    pub chat_id: Option<&'a str>,
    pub raw: bool,
    pub watch: bool,
    pub timeout: Option<Duration>,
}

pub async fn run(options: AskRunOptions<'_>) -> Result<()> {
    let message = options.message.trim();
    if message.is_empty() {
        anyhow::bail!("Message cannot be empty");
    }

    let chat_id = match options.chat_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = chats::new_chat_id();
            eprintln!("Chat: {id}");
            id
        }
    };

    let exec_opts = modes::exec::ExecOptions {
        raw: options.raw,
        watch: options.watch,
        timeout: options.timeout,
    };
    modes::exec::run_exec(options.client, message, &chat_id, &exec_opts)
        .await
        .with_context(|| format!("exchange in chat '{chat_id}'"))
}
