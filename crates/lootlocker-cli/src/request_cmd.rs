use std::path::Path;

use anyhow::{Context, Result};
use ll_client::ServerRequest;
use ll_client::endpoints::GAME_ID_PLACEHOLDER;
use ll_config::Settings;
use ll_core::{CallerRole, HttpMethod, OutputFormat};

use crate::{host, output};

pub(crate) struct RequestArgs {
    pub endpoint: String,
    pub method: HttpMethod,
    pub body: Option<String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub role: CallerRole,
    pub no_auth: bool,
}

pub(crate) fn build_request(settings: &Settings, args: RequestArgs) -> Result<ServerRequest> {
    let endpoint = args
        .endpoint
        .replace(GAME_ID_PLACEHOLDER, &settings.game.game_id.to_string());
    let mut request = ServerRequest::new(endpoint, args.method).as_role(args.role);
    if let Some(body) = args.body {
        serde_json::from_str::<serde_json::Value>(&body).context("--body must be valid JSON")?;
        request = request.with_raw_json(body);
    }
    for (key, value) in args.query {
        request = request.with_query(key, value);
    }
    for (name, value) in args.headers {
        request = request.with_header(name, value);
    }
    if args.no_auth {
        request = request.without_auth();
    }
    Ok(request)
}

pub(crate) async fn handle_request(
    settings: Settings,
    settings_path: &Path,
    args: RequestArgs,
    format: OutputFormat,
) -> Result<i32> {
    let request = build_request(&settings, args)?;
    let api = host::build_api(settings.clone());
    let response = host::run_request(&api, request).await?;
    // A re-authentication during the call leaves a new session behind.
    host::persist_session(&api, settings, settings_path)?;
    output::print_response(&response, format)?;
    Ok(if response.success { 0 } else { 1 })
}
