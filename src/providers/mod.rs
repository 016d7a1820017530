//! Per-provider failure knowledge.
//!
//! Each module here carries two things for its provider family:
//!
//! 1. An ordered [`ErrorPattern`] list used by the token-usage
//!    reconciler to scrape counts out of free-text limit errors.
//!    First match wins.
//! 2. A pair of classification predicates (`is_overloaded`,
//!    `is_token_limit`) consumed by [`crate::classifier`].
//!
//! Vendors report limit overflows in at least three shapes: explicit
//! token counts, explicit character counts, or no counts at all. The
//! pattern tables normalize the first two; families that report nothing
//! numeric (Bedrock Claude and Llama) carry empty tables and rely on the
//! reconciler's estimate fallback.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::ProviderFamily;

pub mod azure_openai;
pub mod bedrock;
pub mod mock;
pub mod openai;
pub mod vertex;

pub use mock::MockBackend;

// ============================================================================
// Error Message Patterns
// ============================================================================

/// Unit a limit-overflow message is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitUnits {
    /// The message reports token counts directly.
    Tokens,
    /// The message reports a character limit and actual character count;
    /// the reconciler converts to tokens against the model's published
    /// budget.
    Chars,
}

/// One pattern in a provider family's ordered pattern list.
///
/// For `Tokens` patterns, capture groups 1..3 map to max total tokens,
/// prompt tokens, and completion tokens; groups 2 and 3 are optional.
/// For `Chars` patterns, groups 1..2 map to the character limit and the
/// actual character count.
#[derive(Debug)]
pub struct ErrorPattern {
    /// Compiled pattern matched against the raw error message.
    pub regex: Regex,
    /// How captured numbers are interpreted.
    pub units: LimitUnits,
}

impl ErrorPattern {
    fn tokens(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("invalid built-in token pattern"),
            units: LimitUnits::Tokens,
        }
    }

    fn chars(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("invalid built-in chars pattern"),
            units: LimitUnits::Chars,
        }
    }
}

static NO_PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(Vec::new);

/// The ordered pattern list for a provider family.
pub fn error_patterns(family: ProviderFamily) -> &'static [ErrorPattern] {
    match family {
        ProviderFamily::OpenAi => openai::error_patterns(),
        ProviderFamily::AzureOpenAi => azure_openai::error_patterns(),
        ProviderFamily::VertexAi => vertex::error_patterns(),
        ProviderFamily::BedrockTitan => bedrock::titan_error_patterns(),
        ProviderFamily::BedrockClaude => bedrock::claude_error_patterns(),
        ProviderFamily::BedrockLlama => bedrock::llama_error_patterns(),
        ProviderFamily::Unspecified => &NO_PATTERNS,
    }
}
