//! llm-backstop - Resilience Layer for Interchangeable LLM Backends
//!
//! A uniform way to request text embeddings and text completions from
//! interchangeable LLM backends while absorbing each backend's
//! inconsistent, often undocumented failure and limit-reporting
//! behavior.
//!
//! This crate owns the per-attempt decision; the retry loop, backoff
//! delays, and model escalation belong to the caller. From inconsistent
//! provider signals it produces exactly one of: retry, shrink and retry,
//! escalate to a larger model, or give up.
//!
//! # Components
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`catalog`] | Validated, frozen per-model capability facts |
//! | [`usage`] | Reconcile token counts from metadata or error text |
//! | [`classifier`] | Overloaded / token-exceeded / fatal taxonomy |
//! | [`shrink`] | Ratio-based prompt reduction for retries |
//! | [`postprocess`] | JSON extraction with retryable parse failures |
//! | [`stats`] | Atomic outcome counters with progress symbols |
//! | [`invocation`] | Per-attempt outcome resolution |
//! | [`traits`] | The backend capability interface |
//!
//! # Providers
//!
//! | Family | Limit reporting | Overload reporting |
//! |--------|-----------------|--------------------|
//! | OpenAI | token counts in message | 429 / 5xx |
//! | Azure OpenAI | token counts in message | deployment rate limits |
//! | Vertex AI | token counts in message | RESOURCE_EXHAUSTED, recitation blocks |
//! | Bedrock Titan | token or character counts | ThrottlingException et al. |
//! | Bedrock Claude | no counts (estimated) | ThrottlingException et al. |
//! | Bedrock Llama | no counts (estimated) | ThrottlingException et al. |
//!
//! # Example
//!
//! ```
//! use llm_backstop::{
//!     resolve_attempt, CallContext, FailureKind, ModelCatalog, OutcomeStatus,
//!     ProviderFailure, ShrinkConfig,
//! };
//!
//! let catalog = ModelCatalog::builtin().unwrap();
//! let config = ShrinkConfig::default();
//!
//! // A provider rejected the prompt for length; resolve the attempt.
//! let failure = ProviderFailure::new(
//!     FailureKind::Validation,
//!     "This model's maximum context length is 8192 tokens.",
//! );
//! let outcome = resolve_attempt(
//!     &catalog,
//!     &config,
//!     "openai/gpt-4o",
//!     "a very long prompt",
//!     false,
//!     CallContext::new(),
//!     Err(failure),
//! )
//! .unwrap();
//! assert_eq!(outcome.status, OutcomeStatus::Exceeded);
//! ```
//!
//! # Concurrency
//!
//! Every component is a pure function over its inputs plus frozen shared
//! state (the catalog, the per-family pattern tables). The only mutable
//! shared state is [`stats::InvocationStats`], whose counters are
//! atomic. Arbitrary fan-out is safe without locking.

pub mod catalog;
pub mod classifier;
pub mod error;
pub mod invocation;
pub mod postprocess;
pub mod providers;
pub mod shrink;
pub mod stats;
pub mod traits;
pub mod usage;

pub use catalog::{
    CatalogError, ModelCatalog, ModelDescriptor, ModelPurpose, ProviderFamily,
    UNSPECIFIED_MAX_TOTAL_TOKENS, UNSPECIFIED_MODEL_KEY,
};
pub use classifier::classify;
pub use error::{ErrorClass, FailureKind, LlmError, ProviderFailure, Result};
pub use invocation::{
    resolve_attempt, CallContext, GeneratedContent, InvocationOutcome, OutcomeStatus,
};
pub use postprocess::{post_process, PostProcessed};
pub use providers::{error_patterns, ErrorPattern, LimitUnits, MockBackend};
pub use shrink::{reduce, ShrinkConfig};
pub use stats::{InvocationStats, StatEvent, StatsSnapshot};
pub use traits::{ModelBackend, ProviderResponse, ResponseContent};
pub use usage::{from_error_message, from_metadata, RawTokenCounts, TokenUsage, UNREPORTED};
