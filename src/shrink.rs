//! Prompt size reduction.
//!
//! After a token-limit failure the retry layer shrinks the prompt by a
//! computed ratio and tries again. Two independent triggers, evaluated
//! in order:
//!
//! 1. The model enforces a completion-token ceiling and the observed
//!    completion ran into it. Shrinking the prompt cannot directly fix a
//!    truncated completion, but a shorter prompt nudges the model toward
//!    a shorter answer on retry.
//! 2. Total usage exceeds the model's budget, or trigger 1 did not fire.
//!
//! The smaller applicable ratio wins and the prompt is prefix-truncated
//! to `floor(char_len * ratio)` characters. No semantic-boundary
//! trimming: content past the cut is discarded. One shrink is not
//! assumed sufficient; the retry layer loops, re-measuring usage each
//! attempt.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::ModelCatalog;
use crate::usage::TokenUsage;

// ============================================================================
// Configuration
// ============================================================================

/// Tunable shrink and estimation constants.
///
/// These are deliberately configuration, not invariants: providers drift,
/// and the right aggressiveness is workload-dependent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShrinkConfig {
    /// Characters per token assumed when estimating usage from raw text.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,

    /// Ratio cap when the completion ceiling triggered the shrink.
    #[serde(default = "default_completion_min_ratio")]
    pub completion_min_ratio: f64,

    /// Ratio cap when the total budget triggered the shrink.
    #[serde(default = "default_prompt_min_ratio")]
    pub prompt_min_ratio: f64,

    /// Completion counts within this many tokens of the ceiling are
    /// treated as having hit it.
    #[serde(default = "default_completion_buffer")]
    pub completion_buffer: u64,
}

fn default_chars_per_token() -> f64 {
    4.0
}

fn default_completion_min_ratio() -> f64 {
    0.75
}

fn default_prompt_min_ratio() -> f64 {
    0.9
}

fn default_completion_buffer() -> u64 {
    16
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            chars_per_token: default_chars_per_token(),
            completion_min_ratio: default_completion_min_ratio(),
            prompt_min_ratio: default_prompt_min_ratio(),
            completion_buffer: default_completion_buffer(),
        }
    }
}

// ============================================================================
// Reduction
// ============================================================================

/// Shrink a prompt according to the resolved usage for one attempt.
///
/// The returned string is a prefix of the input; its character length is
/// exactly `floor(char_len * ratio)` for the computed ratio, and never
/// exceeds the input length.
pub fn reduce(
    prompt: &str,
    catalog: &ModelCatalog,
    model_key: &str,
    usage: &TokenUsage,
    config: &ShrinkConfig,
) -> String {
    let descriptor = catalog.get(model_key);
    let mut ratio: Option<f64> = None;
    let mut ceiling_triggered = false;

    if let Some(ceiling) = descriptor.max_completion_tokens {
        if usage.completion_tokens + config.completion_buffer >= ceiling {
            let r = (ceiling as f64 / (usage.completion_tokens + 1) as f64)
                .min(config.completion_min_ratio);
            ratio = Some(r);
            ceiling_triggered = true;
        }
    }

    if usage.total() > usage.max_total_tokens || !ceiling_triggered {
        let r = (usage.max_total_tokens as f64 / (usage.total() + 1) as f64)
            .min(config.prompt_min_ratio);
        ratio = Some(match ratio {
            Some(existing) => existing.min(r),
            None => r,
        });
    }

    let ratio = ratio.unwrap_or(1.0);
    let char_len = prompt.chars().count();
    let new_len = (char_len as f64 * ratio).floor() as usize;
    if new_len >= char_len {
        return prompt.to_string();
    }

    debug!(
        model_key,
        ratio,
        from = char_len,
        to = new_len,
        "cropping prompt"
    );
    prompt.chars().take(new_len).collect()
}
