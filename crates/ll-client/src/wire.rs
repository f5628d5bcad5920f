//! Turns a [`ServerRequest`] plus the current settings and session snapshot
//! into the exact bytes and headers that go on the wire.

use std::collections::BTreeMap;
use std::time::Duration;

use ll_config::Settings;
use ll_core::{CallerRole, HttpMethod};
use ll_session::AuthSnapshot;
use reqwest::Method;

use crate::multipart::{content_type_for, frame_single_file, timestamp_boundary};
use crate::request::{RequestBody, ServerRequest};

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

const BASE_HEADERS: &[(&str, &str)] = &[
    ("Accept", JSON_CONTENT_TYPE),
    ("Content-Type", JSON_CONTENT_TYPE),
    ("Access-Control-Allow-Credentials", "true"),
    (
        "Access-Control-Allow-Headers",
        "Accept, X-Access-Token, X-Application-Name, X-Request-Sent-Time",
    ),
    (
        "Access-Control-Allow-Methods",
        "GET, POST, DELETE, PUT, OPTIONS, HEAD",
    ),
    ("Access-Control-Allow-Origin", "*"),
];

pub const INSTANCE_ID_HEADER: &str = "LL-Instance-Identifier";
pub const SDK_VERSION_HEADER: &str = "LL-SDK-Version";
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";
pub const ADMIN_TOKEN_HEADER: &str = "x-auth-token";

/// A fully built request, fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl WireRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Header carrying the session token for `role`.
pub fn auth_header_name(role: CallerRole) -> &'static str {
    match role {
        CallerRole::Admin => ADMIN_TOKEN_HEADER,
        _ => SESSION_TOKEN_HEADER,
    }
}

/// `{base}{/endpoint}{?query}` with the endpoint normalized to a leading `/`.
pub fn build_url(base: &str, endpoint: &str, query: &BTreeMap<String, String>) -> String {
    let endpoint = endpoint.trim();
    let mut url = String::with_capacity(base.len() + endpoint.len() + 1);
    url.push_str(base);
    if !endpoint.starts_with('/') {
        url.push('/');
    }
    url.push_str(endpoint);
    for (idx, (key, value)) in query.iter().enumerate() {
        url.push(if idx == 0 { '?' } else { '&' });
        url.push_str(&urlencoding::encode(key));
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
    url
}

fn wire_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post | HttpMethod::UploadFile => Method::POST,
        HttpMethod::Put | HttpMethod::UpdateFile => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

/// Replace any header named `name` (case-insensitively), keeping insertion order otherwise.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: impl Into<String>) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.into()));
}

fn boundary_for(request: &ServerRequest) -> String {
    request.boundary.clone().unwrap_or_else(timestamp_boundary)
}

/// Body bytes and, for multipart bodies, their content type.
fn encode_body(request: &ServerRequest) -> (Option<Vec<u8>>, Option<String>) {
    match (&request.body, request.method) {
        (RequestBody::Form(form), _) => {
            let boundary = boundary_for(request);
            (Some(form.encode(&boundary)), Some(content_type_for(&boundary)))
        }
        (RequestBody::Upload(upload), method)
            if method.carries_payload() || method.is_form_upload() =>
        {
            let boundary = boundary_for(request);
            (
                Some(frame_single_file(upload, &boundary)),
                Some(content_type_for(&boundary)),
            )
        }
        (_, method) if method.is_form_upload() => (None, None),
        (RequestBody::Json(json), method) if method.carries_payload() && !json.is_empty() => {
            (Some(json.clone().into_bytes()), None)
        }
        (_, method) if method.carries_payload() => (Some(b"{}".to_vec()), None),
        _ => (None, None),
    }
}

pub fn build_wire_request(
    request: &ServerRequest,
    settings: &Settings,
    snapshot: &AuthSnapshot,
) -> WireRequest {
    let url = build_url(
        &settings.base_url(request.caller_role),
        &request.endpoint,
        &request.query,
    );
    let (body, multipart_type) = encode_body(request);
    let is_upload = request.is_upload();

    let mut headers: Vec<(String, String)> = BASE_HEADERS
        .iter()
        .filter(|(name, _)| !(is_upload && *name == "Content-Type"))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    if let Some(content_type) = multipart_type {
        set_header(&mut headers, "Content-Type", content_type);
    }
    set_header(&mut headers, INSTANCE_ID_HEADER, uuid::Uuid::new_v4().to_string());
    if let Some(sdk_version) = settings.sdk_version() {
        set_header(&mut headers, SDK_VERSION_HEADER, sdk_version);
    }
    if request.use_auth_token
        && let Some(token) = &snapshot.token
    {
        set_header(&mut headers, auth_header_name(request.caller_role), token.as_str());
    }
    for (name, value) in &request.extra_headers {
        set_header(&mut headers, name, value.as_str());
    }

    WireRequest {
        method: wire_method(request.method),
        url,
        headers,
        body,
        timeout: settings.request_timeout(),
    }
}
