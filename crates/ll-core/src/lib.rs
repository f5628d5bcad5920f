//! Shared vocabulary for the game-backend client: caller roles, HTTP verbs,
//! identity platforms and the error kinds surfaced by the request pipeline.

pub mod error;
pub mod types;

pub use error::{ApiError, FailureKind};
pub use types::{CallerRole, HttpMethod, OutputFormat, Platform};
