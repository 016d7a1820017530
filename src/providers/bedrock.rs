//! AWS Bedrock failure knowledge, per hosted model family.
//!
//! Bedrock wraps every model behind the same runtime API, but the limit
//! messages come from the underlying model family and differ in shape:
//!
//! | Family | Limit message | Numbers |
//! |--------|---------------|---------|
//! | Titan | `Too many input tokens. Max input tokens: 8192, request input token count: 9200` | tokens |
//! | Titan | `Malformed input request: expected maxLength: 42000, actual: 150000` | characters |
//! | Claude | `Input is too long for requested model.` | none |
//! | Llama | `Prompt validation failed ... please reduce the length of the prompt.` | none |
//!
//! Claude and Llama report no counts at all, so their pattern tables are
//! empty and the reconciler falls back to estimation. Overload signals
//! (`ThrottlingException`, `ModelTimeoutException`,
//! `ServiceUnavailableException`, `ModelNotReadyException`) are shared
//! across the families.

use once_cell::sync::Lazy;

use crate::error::{FailureKind, ProviderFailure};

use super::ErrorPattern;

static TITAN_PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(|| {
    vec![
        ErrorPattern::tokens(r"[Mm]ax input tokens:?\s*(\d+)\D+input token count:?\s*(\d+)"),
        ErrorPattern::chars(r"expected maxLength:?\s*(\d+)\D+actual(?: length)?:?\s*(\d+)"),
    ]
});

static NO_PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(Vec::new);

/// Ordered limit-message patterns for Titan models.
pub fn titan_error_patterns() -> &'static [ErrorPattern] {
    &TITAN_PATTERNS
}

/// Claude on Bedrock reports no counts; the reconciler estimates.
pub fn claude_error_patterns() -> &'static [ErrorPattern] {
    &NO_PATTERNS
}

/// Llama on Bedrock reports no counts; the reconciler estimates.
pub fn llama_error_patterns() -> &'static [ErrorPattern] {
    &NO_PATTERNS
}

// ============================================================================
// Classification Predicates
// ============================================================================

/// Transient overload, shared across Bedrock model families.
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
    for exception in [
        "ThrottlingException",
        "ModelTimeoutException",
        "ServiceUnavailableException",
        "ModelNotReadyException",
        "InternalServerException",
    ] {
        if failure.error_type_is(exception) || failure.message_contains(exception) {
            return true;
        }
    }
    matches!(failure.status, Some(429 | 500 | 503 | 504))
}

fn is_validation(failure: &ProviderFailure) -> bool {
    matches!(failure.kind, FailureKind::Validation | FailureKind::Other)
        || failure.error_type_is("ValidationException")
        || failure.message_contains("ValidationException")
}

/// Titan token-limit rejections, token- or character-denominated.
pub fn titan_is_token_limit(failure: &ProviderFailure) -> bool {
    is_validation(failure)
        && (failure.message_contains("too many input tokens")
            || failure.message_contains("expected maxlength"))
}

/// Claude-on-Bedrock token-limit rejections.
pub fn claude_is_token_limit(failure: &ProviderFailure) -> bool {
    is_validation(failure)
        && (failure.message_contains("input is too long")
            || failure.message_contains("prompt is too long"))
}

/// Llama-on-Bedrock token-limit rejections.
pub fn llama_is_token_limit(failure: &ProviderFailure) -> bool {
    is_validation(failure) && failure.message_contains("reduce the length of the prompt")
}
