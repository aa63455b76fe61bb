//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use parlor_core::chats::Mode;
use parlor_core::client::BackendClient;
use parlor_core::config::{self, BASE_URL_ENV, TOKEN_ENV};
use parlor_core::logging;

mod commands;

#[derive(Parser)]
#[command(name = "parlor")]
#[command(version)]
#[command(about = "Terminal client for a streaming chat backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides config)
    #[arg(long, global = true, env = BASE_URL_ENV, value_name = "URL")]
    base_url: Option<String>,

    /// Bearer token (overrides config)
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sends a message and streams the reply
    Ask {
        /// The message to send
        message: String,

        /// Continue an existing chat (a new one is created otherwise)
        #[arg(long, value_name = "ID")]
        chat: Option<String>,

        /// Print the raw reply text instead of rendered markup
        #[arg(long)]
        raw: bool,

        /// Print every intermediate render while the reply streams
        #[arg(long)]
        watch: bool,
    },

    /// Manage chats stored by the backend
    Chats {
        #[command(subcommand)]
        command: ChatCommands,
    },

    /// Show or change the backend's routing mode
    Mode {
        #[command(subcommand)]
        command: ModeCommands,
    },

    /// Renders a markdown file (or stdin) to HTML
    Render {
        /// File to render; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ChatCommands {
    /// Lists chats
    List,
    /// Lists chats whose title contains QUERY (case-insensitive)
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Shows the messages of a chat
    Show {
        /// The ID of the chat to show
        #[arg(value_name = "CHAT_ID")]
        id: String,

        /// Print assistant messages without rendering
        #[arg(long)]
        raw: bool,
    },
    /// Deletes a chat
    Delete {
        #[arg(value_name = "CHAT_ID")]
        id: String,
    },
    /// Deletes every chat
    Clear {
        /// Confirm deleting all chats
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand)]
enum ModeCommands {
    /// Shows the current mode
    Get,
    /// Sets the mode
    Set {
        /// online or offline
        #[arg(value_name = "MODE")]
        mode: Mode,
    },
    /// Switches between online and offline
    Toggle,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: config::Config) -> Result<()> {
    let Cli {
        command,
        base_url,
        token,
    } = cli;

    let backend = || -> Result<BackendClient> {
        let base_url = match base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => config.effective_base_url()?,
        };
        let token = token.clone().or_else(|| config.effective_token());
        BackendClient::new(&base_url, token).context("create backend client")
    };

    match command {
        Commands::Ask {
            message,
            chat,
            raw,
            watch,
        } => {
            let client = backend()?;
            commands::ask::run(commands::ask::AskRunOptions {
                client: &client,
                message: &message,
                chat_id: chat.as_deref(),
                raw,
                watch,
                timeout: config.request_timeout(),
            })
            .await
        }

        Commands::Chats { command } => {
            let client = backend()?;
            match command {
                ChatCommands::List => commands::chats::list(&client).await,
                ChatCommands::Search { query } => commands::chats::search(&client, &query).await,
                ChatCommands::Show { id, raw } => commands::chats::show(&client, &id, raw).await,
                ChatCommands::Delete { id } => commands::chats::delete(&client, &id).await,
                ChatCommands::Clear { yes } => commands::chats::clear(&client, yes).await,
            }
        }

        Commands::Mode { command } => {
            let client = backend()?;
            match command {
                ModeCommands::Get => commands::mode::get(&client).await,
                ModeCommands::Set { mode } => commands::mode::set(&client, mode).await,
                ModeCommands::Toggle => commands::mode::toggle(&client).await,
            }
        }

        Commands::Render { file } => commands::render::run(file.as_deref()),

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
