use std::path::Path;

use anyhow::Result;
use ll_client::ServerRequest;
use ll_client::endpoints::END_SESSION;
use ll_config::Settings;
use ll_core::{OutputFormat, Platform};
use serde_json::json;
use tracing::{info, warn};

use crate::{guest, host, output};

pub(crate) async fn handle_guest_login(
    settings: Settings,
    settings_path: &Path,
    player_identifier: Option<String>,
    format: OutputFormat,
) -> Result<i32> {
    let api = host::build_api(settings.clone());
    let identifier =
        player_identifier.or_else(|| api.session().current().player_identifier.clone());
    let request = guest::session_request(api.settings(), identifier.as_deref())?;
    let response = host::run_request(&api, request).await?;

    let result = guest::session_result_from(&response);
    if !result.success {
        output::print_response(&response, format)?;
        return Ok(1);
    }
    api.session().apply(Platform::Guest, &result);
    host::persist_session(&api, settings, settings_path)?;

    let player = result.player_identifier.as_deref().unwrap_or_default();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "platform": Platform::Guest,
                "player_identifier": result.player_identifier,
                "player_id": result.player_id,
            }))?
        ),
        OutputFormat::Text => println!("Guest session started for player {player}"),
    }
    Ok(0)
}

pub(crate) async fn handle_logout(
    settings: Settings,
    settings_path: &Path,
    remote: bool,
    format: OutputFormat,
) -> Result<i32> {
    let api = host::build_api(settings.clone());
    if remote {
        if api.session().current().has_token() {
            let response = host::run_request(&api, ServerRequest::to(&END_SESSION, &[])).await?;
            if response.success {
                info!("session ended on the backend");
            } else {
                warn!(
                    status = response.status_code,
                    error = response.error_message().unwrap_or_default(),
                    "backend did not end the session; clearing it locally anyway"
                );
            }
        } else {
            info!("no stored session to end remotely");
        }
    }

    api.session().clear();
    host::persist_session(&api, settings, settings_path)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "cleared": true })),
        OutputFormat::Text => println!("Session cleared"),
    }
    Ok(0)
}
