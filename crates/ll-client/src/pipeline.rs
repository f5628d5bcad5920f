//! The retry pipeline.
//!
//! Every logical call runs as one or more [`SendRoutine`]s on the shared
//! scheduler:
//!
//! ```text
//! Deferred -> Sending -> timeout / transport failure   -> deliver, done
//!                     -> 2xx                           -> deliver, done
//!                     -> 401/403 -> Reauthenticating   -> new routine (replay), done
//!                                -> (no refresh)       -> deliver failure, done
//!                     -> other                         -> deliver failure, done
//! ```
//!
//! The first step always yields so the caller's own stack unwinds before any
//! I/O. Re-authentication is polled once per tick instead of awaited, so a
//! session provider may itself issue calls through this pipeline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use ll_config::Settings;
use ll_core::{ApiError, FailureKind, Platform};
use ll_scheduler::{AsyncRoutine, OperationHandle, Scheduler, SchedulerError, Yield};
use ll_session::{AuthSnapshot, PlatformDispatch, ReauthContext, SessionResult, SessionStore};
use reqwest::Method;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::classify::{Verdict, classify};
use crate::obfuscate::obfuscate_for_logging;
use crate::request::ServerRequest;
use crate::response::{Response, parse_error_body};
use crate::retry::{AuthDecision, RetryPolicy, parse_retry_after};
use crate::transport::{AttemptOutcome, HttpTransport, RawResponse, ReqwestTransport};
use crate::wire::{auth_header_name, build_wire_request};

type Callback = Box<dyn FnOnce(Response) + Send>;

fn abandoned(endpoint: &str) -> Response {
    Response::client_error(
        format!("{endpoint} was abandoned before completing."),
        FailureKind::Abandoned,
    )
}

/// The caller's completion callback. Fires exactly once: on delivery, or
/// with an abandoned-call error if it is dropped undelivered.
struct Completion {
    endpoint: String,
    callback: Option<Callback>,
}

impl Completion {
    fn new(endpoint: &str, callback: Callback) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            callback: Some(callback),
        }
    }

    fn deliver(mut self, response: Response) {
        if let Some(callback) = self.callback.take() {
            callback(response);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            warn!(endpoint = %self.endpoint, "request dropped before completing");
            callback(abandoned(&self.endpoint));
        }
    }
}

struct ApiInner {
    settings: Settings,
    session: SessionStore,
    transport: Arc<dyn HttpTransport>,
    dispatch: Arc<PlatformDispatch>,
    scheduler: Scheduler,
    policy: RetryPolicy,
}

/// Entry point for backend calls. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct ServerApi {
    inner: Arc<ApiInner>,
}

pub struct ServerApiBuilder {
    settings: Settings,
    session: Option<SessionStore>,
    transport: Option<Arc<dyn HttpTransport>>,
    dispatch: PlatformDispatch,
    scheduler: Option<Scheduler>,
    policy: RetryPolicy,
}

impl ServerApiBuilder {
    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn dispatch(mut self, dispatch: PlatformDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> ServerApi {
        let session = self
            .session
            .unwrap_or_else(|| SessionStore::from_settings(&self.settings));
        ServerApi {
            inner: Arc::new(ApiInner {
                session,
                transport: self
                    .transport
                    .unwrap_or_else(|| Arc::new(ReqwestTransport::new())),
                dispatch: Arc::new(self.dispatch),
                scheduler: self.scheduler.unwrap_or_default(),
                policy: self.policy,
                settings: self.settings,
            }),
        }
    }
}

impl ServerApi {
    /// Starts with an empty dispatch table, the reqwest transport, a fresh
    /// scheduler and a session store seeded from `settings`.
    pub fn builder(settings: Settings) -> ServerApiBuilder {
        ServerApiBuilder {
            settings,
            session: None,
            transport: None,
            dispatch: PlatformDispatch::empty(),
            scheduler: None,
            policy: RetryPolicy::default(),
        }
    }

    /// Same scheduler, session, transport and settings; different dispatch table.
    pub fn with_dispatch(&self, dispatch: PlatformDispatch) -> Self {
        Self {
            inner: Arc::new(ApiInner {
                settings: self.inner.settings.clone(),
                session: self.inner.session.clone(),
                transport: self.inner.transport.clone(),
                dispatch: Arc::new(dispatch),
                scheduler: self.inner.scheduler.clone(),
                policy: self.inner.policy,
            }),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Queue `request`; `on_complete` is invoked exactly once when the call
    /// reaches a final outcome. Nothing touches the network until the next tick.
    ///
    /// If registration fails the callback still fires, with an abandoned-call error.
    pub async fn send<F>(
        &self,
        request: ServerRequest,
        on_complete: F,
    ) -> Result<OperationHandle, SchedulerError>
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let completion = Completion::new(&request.endpoint, Box::new(on_complete));
        submit(self, request, completion, 0).await
    }

    /// Like [`send`](Self::send), handing back a future for the response.
    /// Something else must keep ticking the scheduler for it to resolve.
    pub async fn enqueue(&self, request: ServerRequest) -> Result<PendingResponse, SchedulerError> {
        let (sender, receiver) = oneshot::channel();
        let endpoint = request.endpoint.clone();
        self.send(request, move |response| {
            // Receiver may already be gone; the response is then simply unobserved.
            let _ = sender.send(response);
        })
        .await?;
        Ok(PendingResponse { endpoint, receiver })
    }
}

impl std::fmt::Debug for ServerApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerApi")
            .field("user_url", &self.inner.settings.urls().user)
            .field("dispatch", &self.inner.dispatch)
            .field("policy", &self.inner.policy)
            .finish()
    }
}

/// Response of a call queued with [`ServerApi::enqueue`].
pub struct PendingResponse {
    endpoint: String,
    receiver: oneshot::Receiver<Response>,
}

impl PendingResponse {
    /// The response, if it has already been delivered.
    pub fn try_take(&mut self) -> Option<Response> {
        self.receiver.try_recv().ok()
    }
}

impl Future for PendingResponse {
    type Output = Response;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Response> {
        let polled = Pin::new(&mut self.receiver).poll(cx);
        match polled {
            Poll::Ready(Ok(response)) => Poll::Ready(response),
            Poll::Ready(Err(_)) => Poll::Ready(abandoned(&self.endpoint)),
            Poll::Pending => Poll::Pending,
        }
    }
}

async fn submit(
    api: &ServerApi,
    request: ServerRequest,
    completion: Completion,
    auth_retries: u32,
) -> Result<OperationHandle, SchedulerError> {
    let routine = SendRoutine {
        api: api.clone(),
        request,
        completion: Some(completion),
        auth_retries,
        stage: Stage::Deferred,
    };
    api.inner.scheduler.start_async(routine).await
}

type ReauthFuture = BoxFuture<'static, Result<SessionResult, ApiError>>;

enum Stage {
    Deferred,
    Sending,
    Reauthenticating {
        platform: Platform,
        future: ReauthFuture,
    },
    Done,
}

struct SendRoutine {
    api: ServerApi,
    request: ServerRequest,
    completion: Option<Completion>,
    /// Re-authentications already performed for this logical call.
    auth_retries: u32,
    stage: Stage,
}

#[async_trait]
impl AsyncRoutine for SendRoutine {
    async fn resume(&mut self) -> Option<Yield> {
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Deferred => {
                self.stage = Stage::Sending;
                Some(Yield::Tick)
            }
            Stage::Sending => self.send_once().await,
            Stage::Reauthenticating { platform, future } => {
                self.poll_reauth(platform, future).await
            }
            Stage::Done => None,
        }
    }
}

impl SendRoutine {
    fn finish(&mut self, response: Response) -> Option<Yield> {
        self.stage = Stage::Done;
        if let Some(completion) = self.completion.take() {
            completion.deliver(response);
        }
        None
    }

    async fn send_once(&mut self) -> Option<Yield> {
        self.request.pin_boundary();
        let api = self.api.clone();
        let snapshot = api.inner.session.current();
        let wire = build_wire_request(&self.request, &api.inner.settings, &snapshot);
        let method = wire.method.clone();
        let url = wire.url.clone();

        debug!(%method, url = %url, "ServerRequest");
        if let Some(body) = self.request.json_body() {
            debug!(body = %obfuscate_for_logging(body), "request body");
        }

        let started = Instant::now();
        let outcome = api.inner.transport.execute(wire).await;
        log_outcome(&method, &url, &outcome, started.elapsed());

        let endpoint = self.request.endpoint.clone();
        match (classify(&outcome), outcome) {
            (Verdict::Success, AttemptOutcome::Completed(raw)) => {
                self.finish(Response::success(raw.status, raw.body))
            }
            (Verdict::AuthFailure, AttemptOutcome::Completed(raw)) => {
                self.on_auth_failure(snapshot, raw).await
            }
            (_, AttemptOutcome::TimedOut) => {
                warn!(%method, url = %url, "Exceeded timeout waiting for a response");
                self.finish(Response::from_error(&ApiError::TransportTimeout { endpoint }))
            }
            (_, AttemptOutcome::Failed(message)) => {
                warn!(%method, url = %url, error = %message, "request failed before a response");
                self.finish(Response::from_error(&ApiError::TransportFailure {
                    endpoint,
                    message,
                }))
            }
            (_, AttemptOutcome::Completed(raw)) => {
                let response = failure_response(&endpoint, raw);
                self.finish(response)
            }
        }
    }

    async fn on_auth_failure(
        &mut self,
        snapshot: Arc<AuthSnapshot>,
        raw: RawResponse,
    ) -> Option<Yield> {
        let endpoint = self.request.endpoint.clone();
        match self.api.inner.policy.decide(&snapshot, self.auth_retries) {
            AuthDecision::ReportFailure => {
                let response = failure_response(&endpoint, raw);
                self.finish(response)
            }
            AuthDecision::BudgetExhausted => {
                let err = ApiError::RetryBudgetExceeded {
                    attempts: self.auth_retries,
                };
                error!(endpoint = %endpoint, error = %err, "giving up on re-authentication");
                self.finish(Response::token_expired())
            }
            AuthDecision::Reauthenticate => {
                let platform = snapshot.platform;
                info!(
                    endpoint = %endpoint,
                    %platform,
                    status = raw.status,
                    attempt = self.auth_retries + 1,
                    "session rejected, re-authenticating"
                );
                let ctx = ReauthContext {
                    platform,
                    snapshot,
                    failed_request_was_refresh: self.request.is_refresh_request(),
                };
                let dispatch = self.api.inner.dispatch.clone();
                let future: ReauthFuture =
                    Box::pin(async move { dispatch.reauthenticate(&ctx).await });
                self.poll_reauth(platform, future).await
            }
        }
    }

    async fn poll_reauth(&mut self, platform: Platform, mut future: ReauthFuture) -> Option<Yield> {
        let polled = future.as_mut().now_or_never();
        match polled {
            None => {
                self.stage = Stage::Reauthenticating { platform, future };
                Some(Yield::Tick)
            }
            Some(Err(err)) => self.finish(Response::from_error(&err)),
            Some(Ok(session)) => self.replay(platform, session).await,
        }
    }

    /// Resubmit the cached request with the refreshed token.
    async fn replay(&mut self, platform: Platform, session: SessionResult) -> Option<Yield> {
        let snapshot = self.api.inner.session.apply(platform, &session);
        if !self.api.inner.policy.replay_allowed(self.request.replay_count) {
            warn!(
                endpoint = %self.request.endpoint,
                replay_count = self.request.replay_count,
                "Session refresh failed: request replay limit reached"
            );
            return self.finish(Response::token_expired());
        }

        let mut replay = self.request.clone();
        if let Some(token) = &snapshot.token {
            replay
                .extra_headers
                .insert(auth_header_name(replay.caller_role).to_string(), token.clone());
        }
        replay.replay_count += 1;
        info!(
            endpoint = %replay.endpoint,
            replay = replay.replay_count,
            "replaying request with refreshed session"
        );

        self.stage = Stage::Done;
        let Some(completion) = self.completion.take() else {
            return None;
        };
        let api = self.api.clone();
        if let Err(err) = submit(&api, replay, completion, self.auth_retries + 1).await {
            error!(error = %err, "could not resubmit request after refresh");
        }
        None
    }
}

fn failure_response(endpoint: &str, raw: RawResponse) -> Response {
    let mut error_data = parse_error_body(raw.status, &raw.body);
    match parse_retry_after(&raw.headers) {
        Ok(Some(seconds)) => error_data.retry_after_seconds = Some(seconds),
        Ok(None) => {}
        Err(err) => error!(endpoint, error = %err, "unusable retry hint from server"),
    }
    error!(
        endpoint,
        status = raw.status,
        error = %obfuscate_for_logging(&error_data.to_string()),
        "request failed"
    );
    Response::http_failure(raw.status, raw.body, error_data)
}

fn log_outcome(method: &Method, url: &str, outcome: &AttemptOutcome, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match outcome {
        AttemptOutcome::Completed(raw) => debug!(
            %method,
            url,
            status = raw.status,
            elapsed_ms,
            body = %obfuscate_for_logging(&raw.body),
            "Server Response"
        ),
        AttemptOutcome::TimedOut => debug!(%method, url, elapsed_ms, "request timed out"),
        AttemptOutcome::Failed(message) => {
            debug!(%method, url, elapsed_ms, error = %message, "web request failed")
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
