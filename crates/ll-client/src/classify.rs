//! Response classification.

use crate::transport::AttemptOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Timeout,
    TransportFailure,
    Success,
    /// 401/403: possibly recoverable by re-authenticating.
    AuthFailure,
    Failure,
}

/// Classify one attempt.
///
/// Precedence: timeout, then the 2xx range, then 401/403, then everything
/// else. Pure, so classifying the same outcome twice gives the same verdict.
pub fn classify(outcome: &AttemptOutcome) -> Verdict {
    match outcome {
        AttemptOutcome::TimedOut => Verdict::Timeout,
        AttemptOutcome::Failed(_) => Verdict::TransportFailure,
        AttemptOutcome::Completed(raw) => classify_status(raw.status),
    }
}

pub fn classify_status(status: u16) -> Verdict {
    match status {
        200..=299 => Verdict::Success,
        401 | 403 => Verdict::AuthFailure,
        _ => Verdict::Failure,
    }
}
