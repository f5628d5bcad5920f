use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ll_session::{NoTokenRefresh, SessionGrant, SessionProvider};
use reqwest::header::{HeaderValue, RETRY_AFTER};

use super::*;
use crate::endpoints::{GUEST_SESSION, LEADERBOARD_LIST, PLAYER_INFO, SUBMIT_SCORE};
use crate::multipart::{FileUpload, MultipartForm};
use crate::wire::{INSTANCE_ID_HEADER, SESSION_TOKEN_HEADER, WireRequest};

/// Plays back outcomes in order, repeating the last one forever.
struct ScriptedTransport {
    script: Mutex<VecDeque<AttemptOutcome>>,
    seen: Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<AttemptOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<WireRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: WireRequest) -> AttemptOutcome {
        self.seen.lock().unwrap().push(request);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
    grants: Mutex<Vec<SessionGrant>>,
}

impl CountingProvider {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for CountingProvider {
    async fn start_session(&self, _platform: Platform, grant: SessionGrant) -> SessionResult {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.grants.lock().unwrap().push(grant);
        SessionResult::granted(format!("token-{n}"))
    }
}

fn ok(body: &str) -> AttemptOutcome {
    AttemptOutcome::Completed(RawResponse::new(200, body))
}

fn status(code: u16, body: &str) -> AttemptOutcome {
    AttemptOutcome::Completed(RawResponse::new(code, body))
}

fn settings(platform: Platform) -> Settings {
    let mut settings = Settings::default();
    settings.game.api_key = Some("dev_key".into());
    settings.session.token = Some("stale-token".into());
    settings.session.platform = platform;
    settings.session.player_identifier = Some("player-1".into());
    settings
}

fn api_for(
    settings: Settings,
    transport: &Arc<ScriptedTransport>,
    provider: &Arc<CountingProvider>,
) -> ServerApi {
    ServerApi::builder(settings)
        .transport(transport.clone())
        .dispatch(PlatformDispatch::standard(provider.clone()))
        .build()
}

/// Send `request`, tick until idle and return everything the callback received.
async fn run(api: &ServerApi, request: ServerRequest) -> Vec<Response> {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    api.send(request, move |response| sink.lock().unwrap().push(response))
        .await
        .unwrap();
    api.scheduler().run_until_idle(32).await.unwrap();
    let responses = delivered.lock().unwrap().clone();
    responses
}

fn player_info() -> ServerRequest {
    ServerRequest::to(&PLAYER_INFO, &[])
}

#[tokio::test]
async fn test_nothing_is_sent_before_the_first_tick() {
    let transport = ScriptedTransport::new(vec![ok("{}")]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let handle = api.send(player_info(), |_| {}).await.unwrap();
    assert_eq!(transport.calls(), 0);
    assert!(!handle.is_finished());

    api.scheduler().tick().await.unwrap();
    assert_eq!(transport.calls(), 1);
    assert!(handle.is_finished());
}

#[tokio::test]
async fn test_success_is_delivered_once() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"items":[]}"#)]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let request = ServerRequest::to(&LEADERBOARD_LIST, &["gl_leaderboard"]);
    let responses = run(&api, request).await;
    assert_eq!(responses.len(), 1);
    assert!(responses[0].success);
    assert_eq!(responses[0].status_code, 200);
    assert_eq!(responses[0].text, r#"{"items":[]}"#);
    assert!(responses[0].error_data.is_none());
    assert_eq!(provider.calls(), 0);

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, Method::GET);
    assert!(sent[0].url.ends_with("/game/v1/leaderboards/gl_leaderboard/list"));
}

#[tokio::test]
async fn test_unauthorized_then_refresh_then_success() {
    let transport = ScriptedTransport::new(vec![status(401, ""), ok(r#"{"id":7}"#)]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert_eq!(responses.len(), 1);
    assert!(responses[0].success);
    assert_eq!(transport.calls(), 2);
    assert_eq!(provider.calls(), 1);
    assert_eq!(
        provider.grants.lock().unwrap()[0],
        SessionGrant::NewSession {
            identifier: Some("player-1".into())
        }
    );
    assert_eq!(api.session().current().token.as_deref(), Some("token-1"));

    let sent = transport.requests();
    assert_eq!(sent[0].header(SESSION_TOKEN_HEADER), Some("stale-token"));
    assert_eq!(sent[1].header(SESSION_TOKEN_HEADER), Some("token-1"));
}

#[tokio::test]
async fn test_sustained_unauthorized_gives_up_with_token_expired() {
    let transport = ScriptedTransport::new(vec![status(401, "")]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(transport.calls(), 4);
    assert_eq!(provider.calls(), 3);

    let response = &responses[0];
    assert!(!response.success);
    assert_eq!(response.status_code, 401);
    assert_eq!(response.error_message(), Some("Token Expired"));
    assert_eq!(response.failure, Some(FailureKind::TokenExpired));
}

#[tokio::test]
async fn test_forbidden_also_triggers_refresh() {
    let transport = ScriptedTransport::new(vec![status(403, ""), ok("{}")]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert!(responses[0].success);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_steam_reports_the_failure_without_refreshing() {
    let body = r#"{"code":"unauthorized","message":"session not valid"}"#;
    let transport = ScriptedTransport::new(vec![status(401, body)]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Steam), &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(provider.calls(), 0);
    assert_eq!(responses[0].status_code, 401);
    assert_eq!(responses[0].failure, Some(FailureKind::Http));
    assert_eq!(responses[0].error_message(), Some("session not valid"));
}

#[tokio::test]
async fn test_disabled_refresh_reports_the_failure() {
    let transport = ScriptedTransport::new(vec![status(401, "")]);
    let provider = Arc::new(CountingProvider::default());
    let mut settings = settings(Platform::Guest);
    settings.client.allow_token_refresh = false;
    let api = api_for(settings, &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(provider.calls(), 0);
    assert_eq!(responses[0].status_code, 401);
    assert_eq!(responses[0].failure, Some(FailureKind::Http));
}

#[tokio::test]
async fn test_platform_without_session_reports_unsupported() {
    let transport = ScriptedTransport::new(vec![status(401, "")]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::None), &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(responses[0].status_code, 401);
    assert_eq!(
        responses[0].error_message(),
        Some("Token refresh for platform None not supported")
    );
    assert_eq!(responses[0].failure, Some(FailureKind::RefreshUnsupported));
}

#[tokio::test]
async fn test_platform_without_refresh_reports_token_expired() {
    let transport = ScriptedTransport::new(vec![status(401, "")]);
    let api = ServerApi::builder(settings(Platform::Guest))
        .transport(transport.clone())
        .dispatch(PlatformDispatch::empty().with(Platform::Guest, Arc::new(NoTokenRefresh)))
        .build();

    let responses = run(&api, player_info()).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(responses[0].failure, Some(FailureKind::TokenExpired));
    assert_eq!(responses[0].error_message(), Some("Token Expired"));
}

#[tokio::test]
async fn test_replay_limit_stops_resubmission() {
    let transport = ScriptedTransport::new(vec![status(401, ""), ok("{}")]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let mut request = player_info();
    request.replay_count = 4;
    let responses = run(&api, request).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(provider.calls(), 1);
    assert_eq!(responses[0].failure, Some(FailureKind::TokenExpired));
}

#[tokio::test]
async fn test_replay_sends_identical_body_with_fresh_credentials() {
    #[derive(serde::Serialize)]
    struct Score {
        member_id: &'static str,
        score: u32,
    }

    let transport = ScriptedTransport::new(vec![status(401, ""), ok("{}")]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let request = ServerRequest::to(&SUBMIT_SCORE, &["gl_leaderboard"])
        .with_json(&Score {
            member_id: "p1",
            score: 1200,
        })
        .unwrap();
    let responses = run(&api, request).await;
    assert!(responses[0].success);

    let sent = transport.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].url, sent[1].url);
    assert_eq!(sent[0].body, sent[1].body);
    assert_ne!(
        sent[0].header(SESSION_TOKEN_HEADER),
        sent[1].header(SESSION_TOKEN_HEADER)
    );
    assert_ne!(
        sent[0].header(INSTANCE_ID_HEADER),
        sent[1].header(INSTANCE_ID_HEADER)
    );
}

#[tokio::test]
async fn test_timeout_names_the_endpoint() {
    let transport = ScriptedTransport::new(vec![AttemptOutcome::TimedOut]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let request = ServerRequest::to(&crate::endpoints::LEADERBOARD_LIST, &["gl_leaderboard"]);
    let endpoint = request.endpoint.clone();
    let responses = run(&api, request).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(responses[0].status_code, 0);
    assert_eq!(responses[0].failure, Some(FailureKind::Timeout));
    assert_eq!(
        responses[0].error_message(),
        Some(format!("{endpoint} timed out.").as_str())
    );
}

#[tokio::test]
async fn test_transport_failure_has_no_status() {
    let transport = ScriptedTransport::new(vec![AttemptOutcome::Failed("connection refused".into())]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert_eq!(responses[0].status_code, 0);
    assert_eq!(responses[0].failure, Some(FailureKind::Transport));
}

#[tokio::test]
async fn test_markup_error_body_becomes_the_message() {
    let body = "<html><body>503 Service Temporarily Unavailable</body></html>";
    let transport = ScriptedTransport::new(vec![status(503, body)]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let responses = run(&api, player_info()).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(responses[0].status_code, 503);
    assert_eq!(responses[0].failure, Some(FailureKind::Http));
    assert_eq!(responses[0].error_message(), Some(body));
}

#[tokio::test]
async fn test_retry_after_is_attached_to_error_data() {
    let mut raw = RawResponse::new(429, r#"{"code":"rate_limited","message":"slow down"}"#);
    raw.headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
    let transport = ScriptedTransport::new(vec![AttemptOutcome::Completed(raw)]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let responses = run(&api, player_info()).await;
    let error = responses[0].error_data.as_ref().unwrap();
    assert_eq!(error.retry_after_seconds, Some(7));
    assert_eq!(error.code.as_deref(), Some("rate_limited"));
}

#[tokio::test]
async fn test_enqueue_resolves_after_ticking() {
    let transport = ScriptedTransport::new(vec![ok(r#"{"id":7}"#)]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let mut pending = api.enqueue(player_info()).await.unwrap();
    assert!(pending.try_take().is_none());

    api.scheduler().run_until_idle(8).await.unwrap();
    let response = pending.await;
    assert!(response.success);
}

#[test]
fn test_dropped_completion_reports_abandonment() {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    let completion = Completion::new(
        "v1/player/info",
        Box::new(move |response: Response| sink.lock().unwrap().push(response)),
    );
    drop(completion);

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].failure, Some(FailureKind::Abandoned));
    assert_eq!(
        delivered[0].error_message(),
        Some("v1/player/info was abandoned before completing.")
    );
}

#[test]
fn test_delivered_completion_does_not_fire_again() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let completion = Completion::new(
        "v1/player/info",
        Box::new(move |_: Response| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    completion.deliver(Response::success(200, "{}"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// Starts guest sessions through the same pipeline it refreshes.
struct PipelineProvider {
    api: ServerApi,
}

#[async_trait]
impl SessionProvider for PipelineProvider {
    async fn start_session(&self, _platform: Platform, grant: SessionGrant) -> SessionResult {
        let SessionGrant::NewSession { identifier } = grant else {
            return SessionResult::failed("unexpected grant");
        };
        let request = ServerRequest::to(&GUEST_SESSION, &[])
            .without_auth()
            .with_raw_json(format!(
                r#"{{"game_key":"dev_key","player_identifier":"{}"}}"#,
                identifier.unwrap_or_default()
            ));
        let pending = match self.api.enqueue(request).await {
            Ok(pending) => pending,
            Err(err) => return SessionResult::failed(err.to_string()),
        };
        let response = pending.await;
        response
            .parse::<SessionResult>()
            .unwrap_or_else(|err| SessionResult::failed(err.to_string()))
    }
}

#[tokio::test]
async fn test_provider_may_call_through_the_pipeline() {
    let transport = ScriptedTransport::new(vec![
        status(401, ""),
        ok(r#"{"success":true,"session_token":"fresh","player_identifier":"player-1"}"#),
        ok(r#"{"id":7}"#),
    ]);
    let base = ServerApi::builder(settings(Platform::Guest))
        .transport(transport.clone())
        .build();
    let provider = Arc::new(PipelineProvider { api: base.clone() });
    let api = base.with_dispatch(PlatformDispatch::standard(provider));

    let responses = run(&api, player_info()).await;
    assert_eq!(responses.len(), 1);
    assert!(responses[0].success);
    assert_eq!(responses[0].text, r#"{"id":7}"#);

    let sent = transport.requests();
    assert_eq!(sent.len(), 3);
    assert!(sent[1].url.ends_with("/game/v2/session/guest"));
    assert_eq!(sent[1].header(SESSION_TOKEN_HEADER), None);
    assert_eq!(sent[2].header(SESSION_TOKEN_HEADER), Some("fresh"));
    assert_eq!(base.session().current().token.as_deref(), Some("fresh"));
}

#[test]
fn test_builder_defaults() {
    let api = ServerApi::builder(settings(Platform::Guest)).build();
    assert!(api.scheduler().is_empty().unwrap());
    assert_eq!(api.session().current().token.as_deref(), Some("stale-token"));
    assert_eq!(api.settings().game.api_key.as_deref(), Some("dev_key"));
}

#[tokio::test]
async fn test_multipart_replay_resends_identical_bytes() {
    let transport = ScriptedTransport::new(vec![status(401, ""), ok("{}")]);
    let provider = Arc::new(CountingProvider::default());
    let api = api_for(settings(Platform::Guest), &transport, &provider);

    let form = MultipartForm::new()
        .text("purpose", "savegame")
        .file(
            "file",
            FileUpload::new("slot1.sav", "application/octet-stream", b"SAVE".to_vec()),
        );
    let request =
        ServerRequest::new("v1/player/files", ll_core::HttpMethod::UploadFile).with_form(form);
    let responses = run(&api, request).await;
    assert!(responses[0].success);

    let sent = transport.requests();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].body.is_some());
    assert_eq!(sent[0].body, sent[1].body);
    assert_eq!(sent[0].header("Content-Type"), sent[1].header("Content-Type"));
    assert_eq!(sent[0].header(SESSION_TOKEN_HEADER), Some("stale-token"));
    assert_eq!(sent[1].header(SESSION_TOKEN_HEADER), Some("token-1"));
}
