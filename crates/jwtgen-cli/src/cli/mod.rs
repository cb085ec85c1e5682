//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use jwtgen_core::config;
use jwtgen_core::logging::{self, LogTarget};

mod commands;

#[derive(Parser)]
#[command(name = "jwtgen")]
#[command(version)]
#[command(about = "JWT Generator for Firebase: sign in or sign up and get an ID token")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in (or sign up) without the UI and print the ID token
    Token {
        /// Account e-mail
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long)]
        password: String,

        /// Web API key (defaults to the key cached by the last run)
        #[arg(long, env = "JWTGEN_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Create the account instead of signing in
        #[arg(long)]
        sign_up: bool,

        /// Print token, user ID, e-mail and lifetime as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Write a commented default config file
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    // The UI owns the terminal, so it logs to a file.
    let target = if cli.command.is_none() {
        LogTarget::File
    } else {
        LogTarget::Stderr
    };
    let _log_guard = logging::init(&config, target).unwrap_or_else(|e| {
        eprintln!("Warning: logging disabled: {e:#}");
        logging::LogGuard::disabled()
    });

    // default to the interactive UI
    let Some(command) = cli.command else {
        return commands::tui::run(&config);
    };

    match command {
        Commands::Token {
            email,
            password,
            api_key,
            sign_up,
            json,
        } => {
            commands::token::run(
                &config,
                commands::token::TokenOptions {
                    email: &email,
                    password: &password,
                    api_key: api_key.as_deref(),
                    sign_up,
                    json,
                },
            )
            .await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
