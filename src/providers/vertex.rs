//! Google Vertex AI (Gemini) failure knowledge.
//!
//! Vertex reports input overflow with explicit token counts:
//!
//! ```text
//! Unable to submit request because the input token count is larger
//! than supported. Max input tokens: 1048576, request input token
//! count: 1049999.
//! ```
//!
//! Overload shows up as `RESOURCE_EXHAUSTED` (429), `UNAVAILABLE` (503),
//! or `DEADLINE_EXCEEDED`. Generation can also stop with a safety
//! finish reason; `RECITATION` in particular is a per-sample artifact of
//! a degraded generation, so it is treated as overload ("ask again")
//! rather than a permanent rejection.

use once_cell::sync::Lazy;

use crate::error::{FailureKind, ProviderFailure};

use super::ErrorPattern;

static ERROR_PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(|| {
    vec![ErrorPattern::tokens(
        r"[Mm]ax input tokens:?\s*(\d+)\D+input token count:?\s*(\d+)",
    )]
});

/// Ordered limit-message patterns.
pub fn error_patterns() -> &'static [ErrorPattern] {
    &ERROR_PATTERNS
}

// ============================================================================
// Classification Predicates
// ============================================================================

/// Transient overload, including recitation-blocked generations.
pub fn is_overloaded(failure: &ProviderFailure) -> bool {
    if matches!(
        failure.kind,
        FailureKind::RateLimited
            | FailureKind::ServerError
            | FailureKind::ServiceUnavailable
            | FailureKind::Timeout
            | FailureKind::Network
    ) {
        return true;
    }
    if matches!(failure.status, Some(429 | 500 | 503 | 504)) {
        return true;
    }
    if failure.kind == FailureKind::ContentFiltered && failure.message_contains("recitation") {
        return true;
    }
    failure.message_contains("resource_exhausted")
        || failure.message_contains("deadline_exceeded")
        || failure.message_contains("model is overloaded")
}

/// Token budget exceeded: INVALID_ARGUMENT rejections naming token counts.
pub fn is_token_limit(failure: &ProviderFailure) -> bool {
    if !matches!(failure.kind, FailureKind::Validation | FailureKind::Other) {
        return false;
    }
    failure.message_contains("input token count is larger than supported")
        || failure.message_contains("max input tokens")
        || failure.message_contains("exceeds the maximum number of tokens")
}
