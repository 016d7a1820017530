//! Provider-failure classification.
//!
//! Maps a [`ProviderFailure`] onto the three-way taxonomy using the
//! predicate pair of the model's provider family. The overload check
//! runs before the token-limit check: several providers raise the same
//! generic exception type for both, and the message-substring scan for
//! token limits is the more specific (and slower) of the two.
//!
//! A failure matching neither predicate is [`ErrorClass::Fatal`]; the
//! caller must propagate the original failure object unchanged.

use tracing::debug;

use crate::catalog::ProviderFamily;
use crate::error::{ErrorClass, FailureKind, ProviderFailure};
use crate::providers::{azure_openai, bedrock, openai, vertex};

/// Classify a provider failure for the given family.
pub fn classify(failure: &ProviderFailure, family: ProviderFamily) -> ErrorClass {
    let (overloaded, token_limit): (
        fn(&ProviderFailure) -> bool,
        fn(&ProviderFailure) -> bool,
    ) = match family {
        ProviderFamily::OpenAi => (openai::is_overloaded, openai::is_token_limit),
        ProviderFamily::AzureOpenAi => (azure_openai::is_overloaded, azure_openai::is_token_limit),
        ProviderFamily::VertexAi => (vertex::is_overloaded, vertex::is_token_limit),
        ProviderFamily::BedrockTitan => (bedrock::is_overloaded, bedrock::titan_is_token_limit),
        ProviderFamily::BedrockClaude => (bedrock::is_overloaded, bedrock::claude_is_token_limit),
        ProviderFamily::BedrockLlama => (bedrock::is_overloaded, bedrock::llama_is_token_limit),
        ProviderFamily::Unspecified => (generic_is_overloaded, generic_is_token_limit),
    };

    let class = if overloaded(failure) {
        ErrorClass::Overloaded
    } else if token_limit(failure) {
        ErrorClass::TokenExceeded
    } else {
        ErrorClass::Fatal
    };
    debug!(%family, %class, kind = %failure.kind, "classified provider failure");
    class
}

/// Kind-tag-only predicates for models without a configured family.
fn generic_is_overloaded(failure: &ProviderFailure) -> bool {
    matches!(
        failure.kind,
        FailureKind::RateLimited
            | FailureKind::ServerError
            | FailureKind::ServiceUnavailable
            | FailureKind::Timeout
            | FailureKind::Network
    ) || matches!(failure.status, Some(429 | 500 | 502 | 503 | 504))
}

fn generic_is_token_limit(failure: &ProviderFailure) -> bool {
    failure.kind == FailureKind::Validation
        && (failure.message_contains("token") || failure.message_contains("too long"))
}
