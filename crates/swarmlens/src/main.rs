mod api;
mod config;
mod serve;
mod sessions;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use swarmlens_logging::{init_tracing, LogFormat};
use swarmlens_sessions::SessionStore;

use crate::sessions::SourceChoice;

#[derive(Parser, Debug)]
#[command(
    name = "swarmlens",
    about = "Unified view of agent sessions across swarm and conversation stores",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a swarmlens.toml (default: user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "compact")]
    log_format: LogFormatChoice,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List sessions, active first then newest first
    List {
        /// Which stores to include
        #[arg(long, value_enum, default_value = "all")]
        source: SourceChoice,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one session with its events
    Show {
        /// Session id as printed by `list` (e.g. structured:project/session)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Only show the last N events
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Serve the session API over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 3100)]
        port: u16,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli.log_level, cli.log_format.into());

    let engine_config = config::resolve(cli.config.as_deref())?;
    tracing::debug!(?engine_config, "resolved configuration");
    let store = SessionStore::new(&engine_config);

    match cli.command {
        Command::List { source, json } => sessions::handle_list(&store, source, json).await,
        Command::Show { id, json, limit } => sessions::handle_show(&store, &id, json, limit).await,
        Command::Serve { host, port } => serve::handle_serve_command(store, &host, port).await,
    }
}
