use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::wire::WireRequest;

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// What a single network attempt produced.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The hard timeout elapsed first.
    TimedOut,
    /// Connection-level failure; no HTTP status was received.
    Failed(String),
    Completed(RawResponse),
}

/// Executes one wire request. Implementations never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: WireRequest) -> AttemptOutcome;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: WireRequest) -> AttemptOutcome {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return AttemptOutcome::TimedOut,
            Err(err) => return AttemptOutcome::Failed(err.to_string()),
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        match response.text().await {
            Ok(body) => AttemptOutcome::Completed(RawResponse {
                status,
                headers,
                body,
            }),
            Err(err) if err.is_timeout() => AttemptOutcome::TimedOut,
            Err(err) => AttemptOutcome::Failed(format!("failed to read response body: {err}")),
        }
    }
}
