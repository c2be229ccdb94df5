use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

pub const MAX_RETRY: u32 = 2;
pub const BACKOFF_STEP: Duration = Duration::from_millis(500);

static TRANSIENT_SIGNATURES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)network|timeout|timed out|connection reset|connection aborted|dns error|failed to lookup address|ECONNRESET|ECONNABORTED|ETIMEDOUT|ENOTFOUND|EAI_AGAIN",
    )
    .expect("transient signature pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Unauthorized,
    ServerError,
    ClientError,
    Success,
}

pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        401 | 403 => ResponseClass::Unauthorized,
        500.. => ResponseClass::ServerError,
        400..=499 => ResponseClass::ClientError,
        _ => ResponseClass::Success,
    }
}

pub fn is_transient_message(message: &str) -> bool {
    TRANSIENT_SIGNATURES.is_match(message)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Response(ResponseClass),
    TransportFailure { transient: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Proceed,
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: MAX_RETRY,
            backoff_step: BACKOFF_STEP,
        }
    }
}

impl RetryPolicy {
    /// `attempt` is zero-based; the delay before retry `n` is `step * n`.
    pub fn decide(&self, attempt: u32, outcome: AttemptOutcome) -> RetryDecision {
        let retryable = match outcome {
            AttemptOutcome::Response(ResponseClass::Success) => return RetryDecision::Proceed,
            AttemptOutcome::Response(ResponseClass::ServerError) => true,
            AttemptOutcome::TransportFailure { transient } => transient,
            AttemptOutcome::Response(ResponseClass::Unauthorized)
            | AttemptOutcome::Response(ResponseClass::ClientError) => false,
        };
        if retryable && attempt < self.max_retry {
            RetryDecision::Retry(self.backoff(attempt))
        } else {
            RetryDecision::GiveUp
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * (attempt + 1)
    }
}
