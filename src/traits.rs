//! Backend trait definitions.
//!
//! One flat capability interface per provider, composed by the retry
//! layer rather than inherited: a backend can invoke a model, classify
//! its own failures, and describe the models it serves. Transport,
//! authentication, and request construction live entirely behind
//! `invoke`; this crate only ever sees the extracted response fields or
//! a [`ProviderFailure`].

use async_trait::async_trait;

use crate::catalog::{ModelDescriptor, ModelPurpose, ProviderFamily};
use crate::classifier;
use crate::error::{ErrorClass, ProviderFailure};
use crate::usage::RawTokenCounts;

// ============================================================================
// Response Payload
// ============================================================================

/// Raw content a backend produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseContent {
    /// Completion text.
    Text(String),
    /// Embedding vector.
    Vector(Vec<f32>),
}

/// One successful backend invocation, fields already extracted from the
/// vendor response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// Generated content.
    pub content: ResponseContent,
    /// Vendor finish reason, if reported (e.g. `stop`, `length`).
    pub finish_reason: Option<String>,
    /// Token counts as the vendor reported them, sentinels preserved.
    pub token_counts: RawTokenCounts,
}

impl ProviderResponse {
    /// A text response with unreported token counts.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: ResponseContent::Text(content.into()),
            finish_reason: None,
            token_counts: RawTokenCounts::unreported(),
        }
    }

    /// An embedding response with unreported token counts.
    pub fn vector(values: Vec<f32>) -> Self {
        Self {
            content: ResponseContent::Vector(values),
            finish_reason: None,
            token_counts: RawTokenCounts::unreported(),
        }
    }

    /// Attach the vendor finish reason.
    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    /// Attach reported token counts.
    pub fn with_token_counts(mut self, counts: RawTokenCounts) -> Self {
        self.token_counts = counts;
        self
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// A provider integration.
///
/// Implementations are `Send + Sync` so the retry layer can fan out
/// concurrent invocations freely.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// The provider family this backend belongs to.
    fn family(&self) -> ProviderFamily;

    /// Invoke a model. `model_id` is the provider-side identifier from
    /// the catalog descriptor, not the caller-facing key.
    async fn invoke(
        &self,
        purpose: ModelPurpose,
        model_id: &str,
        prompt: &str,
    ) -> Result<ProviderResponse, ProviderFailure>;

    /// Classify a failure this backend produced.
    fn classify_error(&self, failure: &ProviderFailure) -> ErrorClass {
        classifier::classify(failure, self.family())
    }

    /// Descriptors for the models this backend serves. Backends that
    /// rely entirely on the shared catalog may return nothing.
    fn describe_models(&self) -> Vec<ModelDescriptor> {
        Vec::new()
    }
}
