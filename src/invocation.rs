//! Invocation outcomes and per-attempt resolution.
//!
//! The retry layer owns the loop, the backoff, and the decision to
//! escalate to a larger-context model. This module owns the per-attempt
//! decision: given what one backend invocation produced, it runs the
//! classifier / post-processor pair and hands back a single
//! [`InvocationOutcome`] the retry layer can act on deterministically.
//!
//! Outcomes are created per attempt and never mutated after
//! construction.

use std::collections::HashMap;

use crate::catalog::ModelCatalog;
use crate::classifier;
use crate::error::{ErrorClass, ProviderFailure};
use crate::postprocess::{post_process, PostProcessed};
use crate::shrink::ShrinkConfig;
use crate::traits::ProviderResponse;
use crate::usage::{self, TokenUsage};

/// Opaque caller-supplied key/value bag, echoed back unmodified in the
/// outcome for logging and correlation.
pub type CallContext = HashMap<String, String>;

// ============================================================================
// Outcome
// ============================================================================

/// Content a completed invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    /// Completion text.
    Text(String),
    /// Parsed JSON completion.
    Json(serde_json::Value),
    /// Embedding vector.
    Vector(Vec<f32>),
}

/// Terminal state of one invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Usable content was produced.
    Completed,
    /// The token budget was exceeded; resolved usage is attached.
    Exceeded,
    /// Transient overload; retry as-is.
    Overloaded,
    /// No attempt produced a decision (e.g. the retry layer gave up
    /// before invoking).
    Unknown,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Completed => write!(f, "completed"),
            OutcomeStatus::Exceeded => write!(f, "exceeded"),
            OutcomeStatus::Overloaded => write!(f, "overloaded"),
            OutcomeStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// What one invocation attempt came to.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    /// Terminal state.
    pub status: OutcomeStatus,
    /// Model key the attempt ran against.
    pub model_key: String,
    /// The request text as submitted (pre-shrink for this attempt).
    pub request_text: String,
    /// Caller context, echoed back unmodified.
    pub context: CallContext,
    /// Generated content, for `Completed`.
    pub generated: Option<GeneratedContent>,
    /// Resolved usage, for `Exceeded`.
    pub usage: Option<TokenUsage>,
}

impl InvocationOutcome {
    /// A completed outcome carrying content.
    pub fn completed(
        model_key: impl Into<String>,
        request_text: impl Into<String>,
        context: CallContext,
        generated: GeneratedContent,
    ) -> Self {
        Self {
            status: OutcomeStatus::Completed,
            model_key: model_key.into(),
            request_text: request_text.into(),
            context,
            generated: Some(generated),
            usage: None,
        }
    }

    /// An exceeded outcome carrying the resolved usage.
    pub fn exceeded(
        model_key: impl Into<String>,
        request_text: impl Into<String>,
        context: CallContext,
        usage: TokenUsage,
    ) -> Self {
        Self {
            status: OutcomeStatus::Exceeded,
            model_key: model_key.into(),
            request_text: request_text.into(),
            context,
            generated: None,
            usage: Some(usage),
        }
    }

    /// An overloaded outcome.
    pub fn overloaded(
        model_key: impl Into<String>,
        request_text: impl Into<String>,
        context: CallContext,
    ) -> Self {
        Self {
            status: OutcomeStatus::Overloaded,
            model_key: model_key.into(),
            request_text: request_text.into(),
            context,
            generated: None,
            usage: None,
        }
    }

    /// An unknown outcome.
    pub fn unknown(
        model_key: impl Into<String>,
        request_text: impl Into<String>,
        context: CallContext,
    ) -> Self {
        Self {
            status: OutcomeStatus::Unknown,
            model_key: model_key.into(),
            request_text: request_text.into(),
            context,
            generated: None,
            usage: None,
        }
    }
}

// ============================================================================
// Attempt Resolution
// ============================================================================

/// Resolve one attempt's raw result into an outcome.
///
/// Success goes through the post-processor; a degraded generation
/// (unparsable JSON) resolves to `Overloaded`. Failure goes through the
/// classifier: overload resolves to `Overloaded`, a token-limit failure
/// resolves to `Exceeded` with usage reconciled from the error message,
/// and anything else re-raises the original failure unchanged.
pub fn resolve_attempt(
    catalog: &ModelCatalog,
    config: &ShrinkConfig,
    model_key: &str,
    prompt: &str,
    want_json: bool,
    context: CallContext,
    attempt: Result<ProviderResponse, ProviderFailure>,
) -> Result<InvocationOutcome, ProviderFailure> {
    let descriptor = catalog.get(model_key);
    match attempt {
        Ok(response) => {
            match post_process(response.content, descriptor.purpose, want_json) {
                PostProcessed::Completed(generated) => Ok(InvocationOutcome::completed(
                    model_key, prompt, context, generated,
                )),
                PostProcessed::Overloaded => {
                    Ok(InvocationOutcome::overloaded(model_key, prompt, context))
                }
            }
        }
        Err(failure) => match classifier::classify(&failure, descriptor.provider_family) {
            ErrorClass::Overloaded => {
                Ok(InvocationOutcome::overloaded(model_key, prompt, context))
            }
            ErrorClass::TokenExceeded => {
                let usage =
                    usage::from_error_message(catalog, model_key, prompt, &failure.message, config);
                Ok(InvocationOutcome::exceeded(model_key, prompt, context, usage))
            }
            ErrorClass::Fatal => Err(failure),
        },
    }
}
