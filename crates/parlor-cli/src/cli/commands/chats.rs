//! Chat command handlers.

use anyhow::{Context, Result};
use parlor_core::chats::{self, ChatSummary, Role};
use parlor_core::client::BackendClient;
use parlor_core::markdown;

pub async fn list(client: &BackendClient) -> Result<()> {
    let all = client.list_chats().await.context("list chats")?;
    if all.is_empty() {
        println!("No chats found.");
    } else {
        print_chats(all.iter());
    }
    Ok(())
}

pub async fn search(client: &BackendClient, query: &str) -> Result<()> {
    let all = client.list_chats().await.context("list chats")?;
    let hits = chats::filter_chats(&all, query);
    if hits.is_empty() {
        println!("No chats match '{query}'.");
    } else {
        print_chats(hits.into_iter());
    }
    Ok(())
}

fn print_chats<'a>(items: impl Iterator<Item = &'a ChatSummary>) {
    for chat in items {
        println!("{}  {}", chat.id, chats::display_title(&chat.title));
    }
}

pub async fn show(client: &BackendClient, id: &str, raw: bool) -> Result<()> {
    let messages = client
        .history(id)
        .await
        .with_context(|| format!("load chat '{id}'"))?;
    if messages.is_empty() {
        println!("Chat '{id}' is empty or not found.");
        return Ok(());
    }

    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("[{}]", message.role);
        if message.role == Role::Assistant && !raw {
            println!("{}", markdown::render(&message.text));
        } else {
            println!("{}", message.text);
        }
    }
    Ok(())
}

pub async fn delete(client: &BackendClient, id: &str) -> Result<()> {
    client
        .delete_chat(id)
        .await
        .with_context(|| format!("delete chat '{id}'"))?;
    println!("Deleted chat {id}");
    Ok(())
}

pub async fn clear(client: &BackendClient, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!("Refusing to delete all chats without --yes");
    }

    let all = client.list_chats().await.context("list chats")?;
    let mut failed = 0usize;
    for chat in &all {
        if let Err(err) = client.delete_chat(&chat.id).await {
            tracing::warn!(chat_id = %chat.id, error = %err, "failed to delete chat");
            failed += 1;
        }
    }

    println!("Deleted {} of {} chats.", all.len() - failed, all.len());
    if failed > 0 {
        anyhow::bail!("{failed} chat(s) could not be deleted");
    }
    Ok(())
}
