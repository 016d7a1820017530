//! Token usage reconciliation.
//!
//! Providers report token consumption three ways: complete metadata,
//! partial metadata with negative "unreported" sentinels, or nothing but
//! a free-text error message. Both entry points here normalize all of
//! that to a fully resolved [`TokenUsage`] triple, so the shrink logic
//! downstream is provider-agnostic.
//!
//! Reconciliation never fails: missing data is filled with worst-case
//! assumptions, because an unresolved triple would block the retry
//! layer's decision entirely.
//!
//! # Overflow invariant
//!
//! When usage is derived from a limit-error message, the resolved prompt
//! count is clamped strictly above the resolved budget. The message was
//! about an overflow, so the derived estimate must itself overflow;
//! otherwise the caller would compute a zero shrink requirement and
//! retry the identical request forever.

use tracing::{debug, warn};

use crate::catalog::ModelCatalog;
use crate::providers::{error_patterns, LimitUnits};
use crate::shrink::ShrinkConfig;

/// Sentinel providers use for a count they did not report.
pub const UNREPORTED: i64 = -1;

// ============================================================================
// Raw and Resolved Counts
// ============================================================================

/// Token counts as a provider reported them, sentinels and all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTokenCounts {
    /// Prompt-side tokens, or negative if unreported.
    pub prompt_tokens: i64,
    /// Completion-side tokens, or negative if unreported.
    pub completion_tokens: i64,
    /// Total budget the provider claims, or negative if unreported.
    pub max_total_tokens: i64,
}

impl Default for RawTokenCounts {
    fn default() -> Self {
        Self::unreported()
    }
}

impl RawTokenCounts {
    /// Counts with every field unreported.
    pub fn unreported() -> Self {
        Self {
            prompt_tokens: UNREPORTED,
            completion_tokens: UNREPORTED,
            max_total_tokens: UNREPORTED,
        }
    }

    /// Fully reported counts.
    pub fn reported(prompt_tokens: i64, completion_tokens: i64, max_total_tokens: i64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            max_total_tokens,
        }
    }
}

/// A fully resolved usage triple. No sentinel escapes the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u64,
    /// Tokens consumed by the completion.
    pub completion_tokens: u64,
    /// Total token budget in effect.
    pub max_total_tokens: u64,
}

impl TokenUsage {
    /// Prompt plus completion tokens.
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// True if the total exceeds the budget.
    pub fn exceeds_budget(&self) -> bool {
        self.total() > self.max_total_tokens
    }
}

impl std::fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}+{} of {} tokens",
            self.prompt_tokens, self.completion_tokens, self.max_total_tokens
        )
    }
}

// ============================================================================
// Reconciliation from Metadata
// ============================================================================

/// Resolve a usage triple from provider-reported metadata.
///
/// - unreported completion tokens default to 0;
/// - an unreported budget defaults to the model's published limit;
/// - an unreported prompt count is assumed to have consumed whatever the
///   completion did not, plus one: `max(1, budget - completion + 1)`.
///   The bias to at least one token keeps downstream ratio math away
///   from division by zero and reports some overage whenever the
///   provider's accounting is incomplete.
pub fn from_metadata(catalog: &ModelCatalog, model_key: &str, raw: RawTokenCounts) -> TokenUsage {
    let descriptor = catalog.get(model_key);

    let completion_tokens = raw.completion_tokens.max(0);
    let max_total_tokens = if raw.max_total_tokens < 0 {
        descriptor.max_total_tokens as i64
    } else {
        raw.max_total_tokens
    };
    let prompt_tokens = if raw.prompt_tokens < 0 {
        (max_total_tokens - completion_tokens + 1).max(1)
    } else {
        raw.prompt_tokens
    };

    TokenUsage {
        prompt_tokens: prompt_tokens as u64,
        completion_tokens: completion_tokens as u64,
        max_total_tokens: max_total_tokens as u64,
    }
}

// ============================================================================
// Reconciliation from Error Messages
// ============================================================================

/// Resolve a usage triple from a limit-error message.
///
/// Walks the model family's ordered pattern list; the first matching
/// pattern determines how captured numbers are interpreted (see
/// [`crate::providers`]). Anything the message does not resolve is
/// filled in: the budget from the published limit, the completion with
/// zero, and the prompt with a character-ratio estimate clamped strictly
/// above the budget.
pub fn from_error_message(
    catalog: &ModelCatalog,
    model_key: &str,
    prompt_text: &str,
    error_text: &str,
    config: &ShrinkConfig,
) -> TokenUsage {
    let descriptor = catalog.get(model_key);
    let published = descriptor.max_total_tokens as i64;

    let mut max_total_tokens: i64 = UNREPORTED;
    let mut prompt_tokens: i64 = UNREPORTED;
    let mut completion_tokens: i64 = UNREPORTED;

    for pattern in error_patterns(descriptor.provider_family) {
        let Some(caps) = pattern.regex.captures(error_text) else {
            continue;
        };
        match pattern.units {
            LimitUnits::Tokens => {
                max_total_tokens = capture_count(&caps, 1);
                prompt_tokens = capture_count(&caps, 2);
                completion_tokens = capture_count(&caps, 3).max(0);
            }
            LimitUnits::Chars => {
                // The message is denominated in characters; convert the
                // overflow proportion onto the published token budget.
                let chars_limit = capture_count(&caps, 1);
                let chars_actual = capture_count(&caps, 2);
                max_total_tokens = published;
                if chars_limit > 0 && chars_actual >= 0 {
                    let scaled =
                        (chars_actual as f64 / chars_limit as f64 * published as f64).ceil() as i64;
                    prompt_tokens = scaled.max(published + 1);
                }
                completion_tokens = 0;
            }
        }
        debug!(
            model_key,
            family = %descriptor.provider_family,
            units = ?pattern.units,
            "limit-error pattern matched"
        );
        break;
    }

    if max_total_tokens < 0 {
        max_total_tokens = published;
    }
    if completion_tokens < 0 {
        completion_tokens = 0;
    }
    if prompt_tokens < 0 {
        let estimated =
            (prompt_text.chars().count() as f64 / config.chars_per_token).floor() as i64;
        prompt_tokens = estimated.max(max_total_tokens + 1);
        warn!(
            model_key,
            estimated,
            resolved = prompt_tokens,
            "no usable counts in limit error, estimated prompt tokens"
        );
    }

    TokenUsage {
        prompt_tokens: prompt_tokens as u64,
        completion_tokens: completion_tokens as u64,
        max_total_tokens: max_total_tokens as u64,
    }
}

fn capture_count(caps: &regex::Captures<'_>, group: usize) -> i64 {
    caps.get(group)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(UNREPORTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;

    fn catalog() -> ModelCatalog {
        ModelCatalog::from_toml_str(
            r#"
            [[models]]
            key = "openai/small"
            provider_model_id = "gpt-4o-mini"
            purpose = "completions"
            provider_family = "openai"
            max_total_tokens = 8192
            max_completion_tokens = 4096

            [[models]]
            key = "vertex/pro"
            provider_model_id = "gemini-1.5-pro"
            purpose = "completions"
            provider_family = "vertex-ai"
            max_total_tokens = 1048576
            max_completion_tokens = 8192

            [[models]]
            key = "titan/express"
            provider_model_id = "amazon.titan-text-express-v1"
            purpose = "completions"
            provider_family = "bedrock-titan"
            max_total_tokens = 8192
            max_completion_tokens = 8192

            [[models]]
            key = "claude/sonnet"
            provider_model_id = "anthropic.claude-3-5-sonnet-20241022-v2:0"
            purpose = "completions"
            provider_family = "bedrock-claude"
            max_total_tokens = 200000
            max_completion_tokens = 8192
            "#,
        )
        .unwrap()
    }

    // ------------------------------------------------------------------
    // from_metadata
    // ------------------------------------------------------------------

    #[test]
    fn test_metadata_complete_passthrough() {
        let usage = from_metadata(
            &catalog(),
            "openai/small",
            RawTokenCounts::reported(100, 20, 8192),
        );
        assert_eq!(
            usage,
            TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                max_total_tokens: 8192
            }
        );
    }

    #[test]
    fn test_metadata_negative_completion_defaults_to_zero() {
        let usage = from_metadata(
            &catalog(),
            "openai/small",
            RawTokenCounts::reported(100, UNREPORTED, 8192),
        );
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.prompt_tokens, 100);
    }

    #[test]
    fn test_metadata_negative_budget_uses_published_limit() {
        let usage = from_metadata(
            &catalog(),
            "openai/small",
            RawTokenCounts::reported(100, 20, UNREPORTED),
        );
        assert_eq!(usage.max_total_tokens, 8192);
    }

    #[test]
    fn test_metadata_negative_prompt_derived_from_remainder() {
        let usage = from_metadata(
            &catalog(),
            "openai/small",
            RawTokenCounts::reported(UNREPORTED, 20, 8192),
        );
        assert_eq!(usage.prompt_tokens, 8192 - 20 + 1);
    }

    #[test]
    fn test_metadata_everything_unreported() {
        let usage = from_metadata(&catalog(), "openai/small", RawTokenCounts::unreported());
        assert_eq!(usage.max_total_tokens, 8192);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.prompt_tokens, 8193);
        assert!(usage.exceeds_budget());
    }

    #[test]
    fn test_metadata_prompt_bias_never_below_one() {
        // Completion above the budget would derive a non-positive prompt.
        let usage = from_metadata(
            &catalog(),
            "openai/small",
            RawTokenCounts::reported(UNREPORTED, 9000, 8192),
        );
        assert_eq!(usage.prompt_tokens, 1);
    }

    // ------------------------------------------------------------------
    // from_error_message
    // ------------------------------------------------------------------

    #[test]
    fn test_error_message_limit_only_clamps_above_budget() {
        let usage = from_error_message(
            &catalog(),
            "openai/small",
            "hello world",
            "...maximum context length is 8192 tokens...",
            &ShrinkConfig::default(),
        );
        assert_eq!(
            usage,
            TokenUsage {
                prompt_tokens: 8193,
                completion_tokens: 0,
                max_total_tokens: 8192
            }
        );
    }

    #[test]
    fn test_error_message_with_actual_count() {
        let usage = from_error_message(
            &catalog(),
            "openai/small",
            "hello",
            "This model's maximum context length is 8192 tokens. However, your \
             messages resulted in 10000 tokens. Please reduce the length of the messages.",
            &ShrinkConfig::default(),
        );
        assert_eq!(usage.max_total_tokens, 8192);
        assert_eq!(usage.prompt_tokens, 10000);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn test_vertex_input_token_counts() {
        let usage = from_error_message(
            &catalog(),
            "vertex/pro",
            "hello",
            "...Max input tokens: 1048576, request input token count: 1049999",
            &ShrinkConfig::default(),
        );
        assert_eq!(
            usage,
            TokenUsage {
                prompt_tokens: 1049999,
                completion_tokens: 0,
                max_total_tokens: 1048576
            }
        );
    }

    #[test]
    fn test_titan_chars_message_scales_onto_budget() {
        let usage = from_error_message(
            &catalog(),
            "titan/express",
            "irrelevant",
            "Malformed input request: expected maxLength: 40000, actual: 50000",
            &ShrinkConfig::default(),
        );
        assert_eq!(usage.max_total_tokens, 8192);
        // ceil(50000/40000 * 8192) = 10240
        assert_eq!(usage.prompt_tokens, 10240);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn test_chars_overflow_invariant_holds_even_for_tiny_overage() {
        // actual barely over the char limit: the scaled estimate rounds
        // to the budget itself, and the clamp pushes it one past.
        let usage = from_error_message(
            &catalog(),
            "titan/express",
            "irrelevant",
            "expected maxLength: 40000, actual: 40001",
            &ShrinkConfig::default(),
        );
        assert!(usage.prompt_tokens > usage.max_total_tokens);
    }

    #[test]
    fn test_no_pattern_falls_back_to_estimate() {
        // Claude on Bedrock reports no numbers at all.
        let prompt = "x".repeat(1_000_000);
        let usage = from_error_message(
            &catalog(),
            "claude/sonnet",
            &prompt,
            "Input is too long for requested model.",
            &ShrinkConfig::default(),
        );
        assert_eq!(usage.max_total_tokens, 200000);
        // 1,000,000 chars / 4.0 = 250,000 estimated prompt tokens.
        assert_eq!(usage.prompt_tokens, 250000);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn test_short_prompt_estimate_still_exceeds_budget() {
        let usage = from_error_message(
            &catalog(),
            "claude/sonnet",
            "short prompt",
            "Input is too long for requested model.",
            &ShrinkConfig::default(),
        );
        assert_eq!(usage.prompt_tokens, 200001);
        assert!(usage.exceeds_budget());
    }

    #[test]
    fn test_unknown_model_resolves_against_unspecified_budget() {
        let usage = from_error_message(
            &catalog(),
            "not-configured",
            "prompt",
            "something went wrong",
            &ShrinkConfig::default(),
        );
        assert_eq!(
            usage.max_total_tokens,
            crate::catalog::UNSPECIFIED_MAX_TOTAL_TOKENS
        );
        assert!(usage.prompt_tokens > usage.max_total_tokens);
    }

    #[test]
    fn test_display_format() {
        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 2,
            max_total_tokens: 100,
        };
        assert_eq!(usage.to_string(), "10+2 of 100 tokens");
    }
}
