use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ll_core::{CallerRole, HttpMethod, OutputFormat};

#[derive(Parser)]
#[command(name = "ll")]
#[command(about = "LootLocker client: authenticated game-backend calls driven by a tick loop")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Write logs to a file in this directory instead of stderr
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a settings file for a game
    Init {
        /// Game API key
        #[arg(long)]
        api_key: String,

        /// Game version reported at session start
        #[arg(long, default_value = "1.0.0.0")]
        game_version: String,

        /// Domain key prefixed to the API host
        #[arg(long)]
        domain_key: Option<String>,

        /// Never re-authenticate on 401/403
        #[arg(long)]
        no_token_refresh: bool,

        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// Show/manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },

    /// Send one request through the authenticated pipeline
    Request {
        /// Endpoint path relative to the role's base URL (e.g. v1/player/info)
        endpoint: String,

        #[arg(long, value_enum, default_value = "get")]
        method: HttpMethod,

        /// JSON body, sent as-is
        #[arg(long)]
        body: Option<String>,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,

        /// Extra header as name=value (repeatable)
        #[arg(long = "header", value_parser = parse_key_value)]
        headers: Vec<(String, String)>,

        #[arg(long, value_enum, default_value = "user")]
        role: CallerRole,

        /// Do not attach the stored session token
        #[arg(long)]
        no_auth: bool,
    },

    /// Start a guest session and store it in the settings file
    GuestLogin {
        /// Reuse this player identifier instead of the stored one
        #[arg(long)]
        player_identifier: Option<String>,
    },

    /// Forget the stored session
    Logout {
        /// Also end the session on the backend
        #[arg(long)]
        remote: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Print the settings file path
    Path,
    /// Forget game identity and session, keeping the server location
    Clear,
}

pub(crate) fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
