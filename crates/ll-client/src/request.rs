use std::collections::BTreeMap;

use ll_core::{CallerRole, HttpMethod};
use serde::Serialize;

use crate::endpoints::Endpoint;
use crate::multipart::{FileUpload, MultipartForm, timestamp_boundary};

/// Request payload. Exactly one shape applies to a request.
///
/// Structured payloads are serialized once, when they are attached, so a
/// replay after re-authentication sends the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(String),
    Upload(FileUpload),
    Form(MultipartForm),
}

/// One outbound call, as described by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRequest {
    pub endpoint: String,
    pub method: HttpMethod,
    pub body: RequestBody,
    pub query: BTreeMap<String, String>,
    /// Applied after the base headers; may override them.
    pub extra_headers: BTreeMap<String, String>,
    pub caller_role: CallerRole,
    /// Attach the current session token when building the request.
    pub use_auth_token: bool,
    /// Times this request has been resubmitted after a session refresh.
    pub replay_count: u32,
    /// Multipart boundary, chosen once so every send of this request frames
    /// the body identically.
    pub boundary: Option<String>,
}

impl ServerRequest {
    pub fn new(endpoint: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: RequestBody::Empty,
            query: BTreeMap::new(),
            extra_headers: BTreeMap::new(),
            caller_role: CallerRole::User,
            use_auth_token: true,
            replay_count: 0,
            boundary: None,
        }
    }

    pub fn to(endpoint: &Endpoint, args: &[&str]) -> Self {
        Self::new(endpoint.with_args(args), endpoint.method)
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, payload: &T) -> serde_json::Result<Self> {
        self.body = RequestBody::Json(serde_json::to_string(payload)?);
        Ok(self)
    }

    pub fn with_raw_json(mut self, json: impl Into<String>) -> Self {
        self.body = RequestBody::Json(json.into());
        self
    }

    pub fn with_upload(mut self, upload: FileUpload) -> Self {
        self.body = RequestBody::Upload(upload);
        self.pin_boundary();
        self
    }

    pub fn with_form(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Form(form);
        self.pin_boundary();
        self
    }

    /// Fix the multipart boundary if the body needs one and none is set yet.
    pub fn pin_boundary(&mut self) -> Option<&str> {
        let multipart = matches!(self.body, RequestBody::Upload(_) | RequestBody::Form(_));
        if multipart && self.boundary.is_none() {
            self.boundary = Some(timestamp_boundary());
        }
        self.boundary.as_deref()
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn as_role(mut self, role: CallerRole) -> Self {
        self.caller_role = role;
        self
    }

    pub fn without_auth(mut self) -> Self {
        self.use_auth_token = false;
        self
    }

    pub fn json_body(&self) -> Option<&str> {
        match &self.body {
            RequestBody::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Whether this call is itself a refresh-token exchange.
    pub fn is_refresh_request(&self) -> bool {
        self.json_body()
            .is_some_and(|json| json.contains("refresh_token"))
    }

    pub fn is_upload(&self) -> bool {
        self.method.is_form_upload()
            || matches!(self.body, RequestBody::Upload(_) | RequestBody::Form(_))
    }
}
