//! Azure-hosted OpenAI failure knowledge.
//!
//! Azure deployments speak the OpenAI API, so context-overflow messages
//! use the same wording and the same pattern table applies. What differs
//! is the throttling surface: Azure throttles per deployment with its
//! own message ("have exceeded call rate limit of your current
//! AOAI ... tier") and adds a content-management filter that rejects
//! with a 400 rather than a 429.

use crate::error::ProviderFailure;

use super::{openai, ErrorPattern};

/// Ordered limit-message patterns. Identical wording to OpenAI.
pub fn error_patterns() -> &'static [ErrorPattern] {
    openai::error_patterns()
}

// ============================================================================
// Classification Predicates
// ============================================================================

/// Transient overload: deployment throttling on top of the OpenAI signals.
pub fn is_overloaded(failure: &ProviderFailure) -> bool {
    openai::is_overloaded(failure)
        || failure.message_contains("exceeded call rate limit")
        || failure.message_contains("exceeded token rate limit")
}

/// Token budget exceeded. Same wording as OpenAI.
pub fn is_token_limit(failure: &ProviderFailure) -> bool {
    openai::is_token_limit(failure)
}
