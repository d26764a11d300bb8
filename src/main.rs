use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use drivers_friend::api::SearchParams;
use drivers_friend::commands;
use drivers_friend::config::Config;
use drivers_friend::language::Language;
use drivers_friend::logging::{self, LogSink};

#[derive(Parser)]
#[command(name = "drivers-friend")]
#[command(version)]
#[command(about = "Ask Driver's Friend about driving rules and regulations", long_about = None)]
struct Cli {
    /// Backend base URL (overrides config and DRIVERS_FRIEND_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Response language: en-US, en-UK, en-IN or de
    #[arg(long, short, global = true)]
    language: Option<Language>,

    /// Read configuration from this file instead of ~/.drivers-friend/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question, words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Check whether the backend is reachable
    Health,
    /// List regulation categories
    Categories,
    /// Search the regulation corpus
    Search {
        query: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(url) = &cli.api_url {
        config.set_api_base_url(url.clone());
    }
    if let Some(language) = cli.language {
        config.default_language = language;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let language = config.default_language;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let log_path = config.log_path();
            logging::init(cli.debug, LogSink::File(&log_path))?;
            commands::chat(&config).await
        }
        Commands::Ask { question } => {
            logging::init(cli.debug, LogSink::Stderr)?;
            commands::ask(&config, &question.join(" "), language).await
        }
        Commands::Health => {
            logging::init(cli.debug, LogSink::Stderr)?;
            commands::health(&config).await
        }
        Commands::Categories => {
            logging::init(cli.debug, LogSink::Stderr)?;
            commands::categories(&config, language).await
        }
        Commands::Search { query, category, limit } => {
            logging::init(cli.debug, LogSink::Stderr)?;
            let params = SearchParams {
                query,
                language,
                category,
                limit,
            };
            commands::search(&config, params).await
        }
    }
}
