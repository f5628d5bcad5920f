//! Authenticated request pipeline: request/response model, wire building,
//! HTTP transport, response classification and the re-authenticating retry
//! loop that runs on the cooperative scheduler.

pub mod classify;
pub mod endpoints;
pub mod multipart;
pub mod obfuscate;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod wire;

pub use classify::{Verdict, classify};
pub use endpoints::Endpoint;
pub use multipart::{FileUpload, MultipartForm};
pub use obfuscate::obfuscate_for_logging;
pub use pipeline::{PendingResponse, ServerApi, ServerApiBuilder};
pub use request::{RequestBody, ServerRequest};
pub use response::{ErrorData, Response};
pub use retry::{AuthDecision, RetryPolicy};
pub use transport::{AttemptOutcome, HttpTransport, RawResponse, ReqwestTransport};
pub use wire::{WireRequest, build_url, build_wire_request};
