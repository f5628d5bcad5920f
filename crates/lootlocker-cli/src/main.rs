use anyhow::Result;
use clap::Parser;

mod cli;
mod config_cmds;
mod guest;
mod host;
mod logging;
mod output;
mod request_cmd;
mod session_cmds;

use cli::{Cli, Commands, ConfigCommands};
use ll_config::{DebugLevel, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let exit_code = run(cli).await?;
    std::process::exit(exit_code);
}

/// Runs one command; the log guard lives exactly as long as this call.
async fn run(cli: Cli) -> Result<i32> {
    let Cli {
        command,
        config,
        format,
        log_dir,
    } = cli;
    let settings_path = match config {
        Some(path) => path,
        None => Settings::default_path()?,
    };

    match command {
        Commands::Init {
            api_key,
            game_version,
            domain_key,
            no_token_refresh,
            force,
        } => {
            let _log_guard = logging::init(DebugLevel::default(), log_dir.as_deref())?;
            config_cmds::handle_init(
                &settings_path,
                config_cmds::InitArgs {
                    api_key,
                    game_version,
                    domain_key,
                    allow_token_refresh: !no_token_refresh,
                    force,
                },
            )
        }
        Commands::Config {
            cmd: ConfigCommands::Path,
        } => {
            println!("{}", settings_path.display());
            Ok(0)
        }
        command => {
            let settings = Settings::load_or_init(&settings_path)?;
            let _log_guard = logging::init(settings.client.debug_level, log_dir.as_deref())?;
            match command {
                Commands::Config { cmd } => {
                    config_cmds::handle_config(cmd, settings, &settings_path, format)
                }
                Commands::Request {
                    endpoint,
                    method,
                    body,
                    query,
                    headers,
                    role,
                    no_auth,
                } => {
                    request_cmd::handle_request(
                        settings,
                        &settings_path,
                        request_cmd::RequestArgs {
                            endpoint,
                            method,
                            body,
                            query,
                            headers,
                            role,
                            no_auth,
                        },
                        format,
                    )
                    .await
                }
                Commands::GuestLogin { player_identifier } => {
                    session_cmds::handle_guest_login(
                        settings,
                        &settings_path,
                        player_identifier,
                        format,
                    )
                    .await
                }
                Commands::Logout { remote } => {
                    session_cmds::handle_logout(settings, &settings_path, remote, format).await
                }
                Commands::Init { .. } => {
                    anyhow::bail!("init must not run against an existing settings load")
                }
            }
        }
    }
}
