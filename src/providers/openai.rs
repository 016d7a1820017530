//! OpenAI failure knowledge.
//!
//! OpenAI reports context overflow with explicit token counts:
//!
//! ```text
//! This model's maximum context length is 8192 tokens. However, your
//! messages resulted in 10000 tokens. Please reduce the length of the
//! messages.
//! ```
//!
//! Sometimes only the limit appears ("maximum context length is 8192
//! tokens" with no actual count); the reconciler then estimates the
//! prompt side and clamps it above the limit.

use once_cell::sync::Lazy;

use crate::error::{FailureKind, ProviderFailure};

use super::ErrorPattern;

static ERROR_PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(|| {
    vec![ErrorPattern::tokens(
        r"maximum context length is (\d+) tokens(?:\D+(\d+) tokens)?",
    )]
});

/// Ordered limit-message patterns.
pub fn error_patterns() -> &'static [ErrorPattern] {
    &ERROR_PATTERNS
}

// ============================================================================
// Classification Predicates
// ============================================================================

/// Transient overload: rate limits, 5xx responses, timeouts.
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
    if matches!(failure.status, Some(429 | 500 | 502 | 503 | 504)) {
        return true;
    }
    failure.message_contains("rate limit")
        || failure.message_contains("server is overloaded")
        || failure.message_contains("internal server error")
}

/// Token budget exceeded: validation rejections naming the context limit.
pub fn is_token_limit(failure: &ProviderFailure) -> bool {
    if !matches!(
        failure.kind,
        FailureKind::Validation | FailureKind::Other
    ) {
        return false;
    }
    failure.message_contains("maximum context length")
        || failure.message_contains("reduce the length of the messages")
        || failure.message_contains("too many tokens")
}
