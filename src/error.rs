//! Error types and the provider-failure taxonomy.
//!
//! # Error Handling Philosophy
//!
//! Every backend reports limits and overload differently, or not at all.
//! This crate reduces all of them to a three-way taxonomy the retry layer
//! can act on deterministically:
//!
//! | Class | Meaning | Caller action |
//! |-------|---------|---------------|
//! | `Overloaded` | Transient throttling/timeout/5xx | Retry as-is after backoff |
//! | `TokenExceeded` | Prompt over the token budget | Shrink the prompt or step up to a larger-context model |
//! | `Fatal` | Auth, malformed request, permanent rejection | Propagate unchanged, never retry |
//!
//! A failure that matches neither the overload nor the token-limit
//! predicates is `Fatal` and the original [`ProviderFailure`] is re-raised
//! untouched so the caller keeps full diagnostic detail.

use thiserror::Error;

use crate::catalog::CatalogError;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, LlmError>;

// ============================================================================
// Failure Description
// ============================================================================

/// Coarse tag for what kind of failure a vendor SDK reported.
///
/// Provider integrations map their SDK's exception types onto these tags
/// before handing the failure to the classifier, so classification never
/// depends on any vendor's exception hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Rate limit / throttling response.
    RateLimited,
    /// Internal server error (5xx-style).
    ServerError,
    /// Service temporarily unavailable.
    ServiceUnavailable,
    /// Request or model timeout.
    Timeout,
    /// Request validation rejected by the provider.
    Validation,
    /// Authentication or authorization failure.
    Auth,
    /// Generation blocked by a safety/content filter.
    ContentFiltered,
    /// Transport-level failure.
    Network,
    /// Anything the integration could not tag more precisely.
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::RateLimited => "rate-limited",
            FailureKind::ServerError => "server-error",
            FailureKind::ServiceUnavailable => "service-unavailable",
            FailureKind::Timeout => "timeout",
            FailureKind::Validation => "validation",
            FailureKind::Auth => "auth",
            FailureKind::ContentFiltered => "content-filtered",
            FailureKind::Network => "network",
            FailureKind::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// A structured description of a raw provider failure.
///
/// This is the classifier's only input: a kind tag, the vendor's error
/// type name if it exposes one (e.g. `ThrottlingException`), the
/// HTTP-like status if present, and the free-text message. Integrations
/// build one of these from whatever their SDK threw; the original object
/// never crosses into this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Coarse failure tag.
    pub kind: FailureKind,
    /// Vendor exception/type name, if the SDK exposes one.
    pub error_type: Option<String>,
    /// HTTP-like status code, if present.
    pub status: Option<u16>,
    /// Free-text error message as reported by the provider.
    pub message: String,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} failure (status {status}): {}", self.kind, self.message),
            None => write!(f, "{} failure: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ProviderFailure {}

impl ProviderFailure {
    /// Create a failure description from a kind tag and message.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            error_type: None,
            status: None,
            message: message.into(),
        }
    }

    /// Attach the HTTP-like status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the vendor's error type name.
    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// True if the vendor error type name matches (case-insensitive).
    pub fn error_type_is(&self, name: &str) -> bool {
        self.error_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(name))
    }

    /// True if the message contains the needle, ignoring ASCII case.
    pub fn message_contains(&self, needle: &str) -> bool {
        self.message
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }
}

// ============================================================================
// Classification Taxonomy
// ============================================================================

/// The three-way classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient overload; retry the same request after a delay.
    Overloaded,
    /// Token budget exceeded; shrink the prompt or escalate the model.
    TokenExceeded,
    /// Permanent failure; propagate to the caller unchanged.
    Fatal,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Overloaded => write!(f, "overloaded"),
            ErrorClass::TokenExceeded => write!(f, "token-exceeded"),
            ErrorClass::Fatal => write!(f, "fatal"),
        }
    }
}

// ============================================================================
// Library Error Type
// ============================================================================

/// Errors surfaced by this crate.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Model catalog failed validation at load time. The process must
    /// not start serving with a partially valid table.
    #[error("model catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A provider failure classified as fatal, propagated unchanged.
    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid library configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
