//! Response post-processing.
//!
//! Completions that were asked for JSON rarely come back as bare JSON:
//! models wrap the object in prose, code fences, or stray control
//! characters. The post-processor slices from the first `{` to the last
//! `}`, treats control characters as whitespace, and parses strictly.
//!
//! A parse failure is not surfaced as an error. Malformed JSON from a
//! model that was explicitly asked for JSON is evidence of a degraded
//! generation, and a retry has a reasonable chance of producing valid
//! output, so the failure is downgraded to "overloaded, ask again".

use tracing::warn;

use crate::catalog::ModelPurpose;
use crate::invocation::GeneratedContent;
use crate::traits::ResponseContent;

/// Result of post-processing one raw response.
#[derive(Debug, Clone, PartialEq)]
pub enum PostProcessed {
    /// Usable content, possibly parsed.
    Completed(GeneratedContent),
    /// The generation looked degraded; retry as if overloaded.
    Overloaded,
}

/// Post-process a raw provider response.
///
/// Embeddings and plain-text completions pass through unchanged. JSON
/// extraction applies only to completions requested with `want_json`.
pub fn post_process(
    raw: ResponseContent,
    purpose: ModelPurpose,
    want_json: bool,
) -> PostProcessed {
    match raw {
        ResponseContent::Vector(vector) => {
            PostProcessed::Completed(GeneratedContent::Vector(vector))
        }
        ResponseContent::Text(text) => {
            if purpose != ModelPurpose::Completions || !want_json {
                return PostProcessed::Completed(GeneratedContent::Text(text));
            }
            match extract_json(&text) {
                Some(value) => PostProcessed::Completed(GeneratedContent::Json(value)),
                None => {
                    warn!(
                        raw_len = text.len(),
                        "completion did not contain parsable JSON, downgrading to overloaded"
                    );
                    PostProcessed::Overloaded
                }
            }
        }
    }
}

/// Slice between the first `{` and last `}` and parse strictly, with
/// control characters treated as whitespace.
fn extract_json(raw: &str) -> Option<serde_json::Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let cleaned: String = raw[start..=end]
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    serde_json::from_str(&cleaned).ok()
}
