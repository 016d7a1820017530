//! Model Metadata Catalog
//!
//! Static, validated lookup of per-model capability facts: purpose,
//! token budgets, embedding dimensionality, and provider family. Every
//! other component consults the catalog; nothing else in the crate knows
//! a model identifier means anything.
//!
//! # Lifecycle
//!
//! The catalog is built once at process start from a TOML table (or the
//! embedded default) and frozen thereafter. Validation runs over the
//! whole table before any entry is exposed; one invalid entry fails the
//! entire load.
//!
//! # Example Configuration
//!
//! ```toml
//! [[models]]
//! key = "openai/gpt-4o"
//! provider_model_id = "gpt-4o"
//! purpose = "completions"
//! provider_family = "openai"
//! max_total_tokens = 128000
//! max_completion_tokens = 16384
//!
//! [[models]]
//! key = "openai/text-embedding-3-small"
//! provider_model_id = "text-embedding-3-small"
//! purpose = "embeddings"
//! provider_family = "openai"
//! max_total_tokens = 8191
//! dimensions = 1536
//! ```
//!
//! # Unknown Keys
//!
//! `get` on an unknown key returns a synthetic "unspecified" descriptor
//! with an effectively unbounded token budget, so callers that have not
//! configured a given quality tier degrade gracefully instead of failing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token budget of the synthetic "unspecified" descriptor. Large enough
/// that budget math never trips on it.
pub const UNSPECIFIED_MAX_TOTAL_TOKENS: u64 = 2_147_483_647;

/// Key reported by the unspecified descriptor.
pub const UNSPECIFIED_MODEL_KEY: &str = "unspecified";

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while loading the model table.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The TOML table could not be parsed.
    #[error("failed to parse model table: {0}")]
    Parse(String),

    /// An entry violated a validation invariant. The whole load fails.
    #[error("invalid model table entry '{key}': {reason}")]
    Validation {
        /// Key of the offending entry.
        key: String,
        /// Which invariant was violated.
        reason: String,
    },
}

// ============================================================================
// Enumerations
// ============================================================================

/// What a model is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPurpose {
    /// Vector embedding generation.
    Embeddings,
    /// Text completion / chat generation.
    Completions,
}

impl std::fmt::Display for ModelPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelPurpose::Embeddings => write!(f, "embeddings"),
            ModelPurpose::Completions => write!(f, "completions"),
        }
    }
}

/// Provider family a model belongs to.
///
/// Each family has its own error-message pattern set and classification
/// predicates; the Bedrock model families differ enough in failure
/// texture to warrant separate variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderFamily {
    /// OpenAI API.
    #[serde(rename = "openai")]
    OpenAi,
    /// Azure-hosted OpenAI deployments.
    #[serde(rename = "azure-openai")]
    AzureOpenAi,
    /// Google Vertex AI (Gemini family).
    #[serde(rename = "vertex-ai")]
    VertexAi,
    /// AWS Bedrock, Amazon Titan models.
    #[serde(rename = "bedrock-titan")]
    BedrockTitan,
    /// AWS Bedrock, Anthropic Claude models.
    #[serde(rename = "bedrock-claude")]
    BedrockClaude,
    /// AWS Bedrock, Meta Llama models.
    #[serde(rename = "bedrock-llama")]
    BedrockLlama,
    /// Family of the synthetic unspecified descriptor. Not valid in a
    /// model table.
    #[serde(skip)]
    Unspecified,
}

impl std::fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderFamily::OpenAi => "openai",
            ProviderFamily::AzureOpenAi => "azure-openai",
            ProviderFamily::VertexAi => "vertex-ai",
            ProviderFamily::BedrockTitan => "bedrock-titan",
            ProviderFamily::BedrockClaude => "bedrock-claude",
            ProviderFamily::BedrockLlama => "bedrock-llama",
            ProviderFamily::Unspecified => "unspecified",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Model Descriptor
// ============================================================================

/// Capability facts for one model. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Opaque key callers use to select this model.
    pub key: String,

    /// Identifier the provider integration passes to the vendor API.
    pub provider_model_id: String,

    /// What the model is for.
    pub purpose: ModelPurpose,

    /// Provider family, selects pattern sets and predicates.
    pub provider_family: ProviderFamily,

    /// Maximum total tokens (prompt + completion) the model accepts.
    pub max_total_tokens: u64,

    /// Maximum completion tokens. Completions models only.
    #[serde(default)]
    pub max_completion_tokens: Option<u64>,

    /// Embedding vector dimensionality. Embeddings models only.
    #[serde(default)]
    pub dimensions: Option<u32>,
}

impl ModelDescriptor {
    /// The synthetic descriptor returned for unknown keys.
    fn unspecified() -> Self {
        Self {
            key: UNSPECIFIED_MODEL_KEY.to_string(),
            provider_model_id: UNSPECIFIED_MODEL_KEY.to_string(),
            purpose: ModelPurpose::Completions,
            provider_family: ProviderFamily::Unspecified,
            max_total_tokens: UNSPECIFIED_MAX_TOTAL_TOKENS,
            max_completion_tokens: None,
            dimensions: None,
        }
    }

    /// True for the synthetic unspecified descriptor.
    pub fn is_unspecified(&self) -> bool {
        self.provider_family == ProviderFamily::Unspecified
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let fail = |reason: String| CatalogError::Validation {
            key: self.key.clone(),
            reason,
        };

        if self.key.is_empty() {
            return Err(fail("key must not be empty".to_string()));
        }
        if self.provider_model_id.is_empty() {
            return Err(fail("provider_model_id must not be empty".to_string()));
        }
        if self.max_total_tokens == 0 {
            return Err(fail("max_total_tokens must be positive".to_string()));
        }
        if let Some(0) = self.max_completion_tokens {
            return Err(fail("max_completion_tokens must be positive".to_string()));
        }
        if let Some(0) = self.dimensions {
            return Err(fail("dimensions must be positive".to_string()));
        }

        match self.purpose {
            ModelPurpose::Embeddings => {
                if self.dimensions.is_none() {
                    return Err(fail(
                        "dimensions is required for embeddings models".to_string(),
                    ));
                }
            }
            ModelPurpose::Completions => {
                let Some(max_completion) = self.max_completion_tokens else {
                    return Err(fail(
                        "max_completion_tokens is required for completions models".to_string(),
                    ));
                };
                if max_completion > self.max_total_tokens {
                    return Err(fail(format!(
                        "max_completion_tokens ({max_completion}) exceeds max_total_tokens ({})",
                        self.max_total_tokens
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModelTable {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

/// Frozen lookup of model descriptors, keyed by caller-facing key.
#[derive(Debug)]
pub struct ModelCatalog {
    models: HashMap<String, ModelDescriptor>,
    unspecified: ModelDescriptor,
}

impl ModelCatalog {
    /// Build a catalog from already-parsed descriptors.
    ///
    /// Validates every entry before exposing any; a single invalid entry
    /// or duplicate key fails the whole load.
    pub fn load(descriptors: Vec<ModelDescriptor>) -> Result<Self, CatalogError> {
        for descriptor in &descriptors {
            descriptor.validate()?;
        }

        let mut models = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let key = descriptor.key.clone();
            if models.insert(key.clone(), descriptor).is_some() {
                return Err(CatalogError::Validation {
                    key,
                    reason: "duplicate model key".to_string(),
                });
            }
        }

        Ok(Self {
            models,
            unspecified: ModelDescriptor::unspecified(),
        })
    }

    /// Parse and load a TOML model table.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CatalogError> {
        let table: ModelTable =
            toml::from_str(toml_str).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::load(table.models)
    }

    /// Load the embedded default model table.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(DEFAULT_MODELS_TOML)
    }

    /// Look up a descriptor by key.
    ///
    /// Unknown keys return the unspecified descriptor rather than
    /// failing, so unconfigured quality tiers degrade gracefully.
    pub fn get(&self, key: &str) -> &ModelDescriptor {
        self.models.get(key).unwrap_or(&self.unspecified)
    }

    /// True if the key names a configured model.
    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    /// Number of configured models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True if no models are configured.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterate over configured descriptors, in no particular order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }
}

/// Built-in model table covering the four provider surfaces.
const DEFAULT_MODELS_TOML: &str = r#"
[[models]]
key = "openai/gpt-4o"
provider_model_id = "gpt-4o"
purpose = "completions"
provider_family = "openai"
max_total_tokens = 128000
max_completion_tokens = 16384

[[models]]
key = "openai/gpt-4o-mini"
provider_model_id = "gpt-4o-mini"
purpose = "completions"
provider_family = "openai"
max_total_tokens = 128000
max_completion_tokens = 16384

[[models]]
key = "openai/text-embedding-3-small"
provider_model_id = "text-embedding-3-small"
purpose = "embeddings"
provider_family = "openai"
max_total_tokens = 8191
dimensions = 1536

[[models]]
key = "azure/gpt-4o"
provider_model_id = "gpt-4o"
purpose = "completions"
provider_family = "azure-openai"
max_total_tokens = 128000
max_completion_tokens = 16384

[[models]]
key = "azure/text-embedding-3-small"
provider_model_id = "text-embedding-3-small"
purpose = "embeddings"
provider_family = "azure-openai"
max_total_tokens = 8191
dimensions = 1536

[[models]]
key = "vertex/gemini-1.5-pro"
provider_model_id = "gemini-1.5-pro"
purpose = "completions"
provider_family = "vertex-ai"
max_total_tokens = 1048576
max_completion_tokens = 8192

[[models]]
key = "vertex/text-embedding-004"
provider_model_id = "text-embedding-004"
purpose = "embeddings"
provider_family = "vertex-ai"
max_total_tokens = 2048
dimensions = 768

[[models]]
key = "bedrock/titan-text-express"
provider_model_id = "amazon.titan-text-express-v1"
purpose = "completions"
provider_family = "bedrock-titan"
max_total_tokens = 8192
max_completion_tokens = 8192

[[models]]
key = "bedrock/titan-embed-text"
provider_model_id = "amazon.titan-embed-text-v1"
purpose = "embeddings"
provider_family = "bedrock-titan"
max_total_tokens = 8192
dimensions = 1536

[[models]]
key = "bedrock/claude-3-5-sonnet"
provider_model_id = "anthropic.claude-3-5-sonnet-20241022-v2:0"
purpose = "completions"
provider_family = "bedrock-claude"
max_total_tokens = 200000
max_completion_tokens = 8192

[[models]]
key = "bedrock/llama3-70b"
provider_model_id = "meta.llama3-70b-instruct-v1:0"
purpose = "completions"
provider_family = "bedrock-llama"
max_total_tokens = 8192
max_completion_tokens = 2048
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn completion_model(key: &str) -> ModelDescriptor {
        ModelDescriptor {
            key: key.to_string(),
            provider_model_id: "gpt-4o".to_string(),
            purpose: ModelPurpose::Completions,
            provider_family: ProviderFamily::OpenAi,
            max_total_tokens: 128000,
            max_completion_tokens: Some(16384),
            dimensions: None,
        }
    }

    fn embedding_model(key: &str) -> ModelDescriptor {
        ModelDescriptor {
            key: key.to_string(),
            provider_model_id: "text-embedding-3-small".to_string(),
            purpose: ModelPurpose::Embeddings,
            provider_family: ProviderFamily::OpenAi,
            max_total_tokens: 8191,
            max_completion_tokens: None,
            dimensions: Some(1536),
        }
    }

    #[test]
    fn test_valid_table_loads() {
        let catalog =
            ModelCatalog::load(vec![completion_model("a"), embedding_model("b")]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").max_completion_tokens, Some(16384));
        assert_eq!(catalog.get("b").dimensions, Some(1536));
    }

    #[test]
    fn test_unknown_key_returns_unspecified() {
        let catalog = ModelCatalog::load(vec![completion_model("a")]).unwrap();
        let descriptor = catalog.get("never-configured");
        assert!(descriptor.is_unspecified());
        assert_eq!(descriptor.max_total_tokens, UNSPECIFIED_MAX_TOTAL_TOKENS);
    }

    #[test]
    fn test_embeddings_without_dimensions_fails() {
        let mut model = embedding_model("e");
        model.dimensions = None;
        let err = ModelCatalog::load(vec![model]).unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[test]
    fn test_completions_without_ceiling_fails() {
        let mut model = completion_model("c");
        model.max_completion_tokens = None;
        let err = ModelCatalog::load(vec![model]).unwrap_err();
        assert!(err.to_string().contains("max_completion_tokens"));
    }

    #[test]
    fn test_completion_ceiling_above_total_fails() {
        let mut model = completion_model("c");
        model.max_total_tokens = 1000;
        model.max_completion_tokens = Some(2000);
        assert!(ModelCatalog::load(vec![model]).is_err());
    }

    #[test]
    fn test_zero_budget_fails() {
        let mut model = completion_model("c");
        model.max_total_tokens = 0;
        assert!(ModelCatalog::load(vec![model]).is_err());
    }

    #[test]
    fn test_single_bad_entry_fails_whole_load() {
        let mut bad = embedding_model("bad");
        bad.dimensions = Some(0);
        let err = ModelCatalog::load(vec![completion_model("good"), bad]).unwrap_err();
        match err {
            CatalogError::Validation { key, .. } => assert_eq!(key, "bad"),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_duplicate_key_fails() {
        let err =
            ModelCatalog::load(vec![completion_model("dup"), completion_model("dup")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_toml_round_trip() {
        let catalog = ModelCatalog::from_toml_str(
            r#"
            [[models]]
            key = "tiny"
            provider_model_id = "tiny-1"
            purpose = "completions"
            provider_family = "bedrock-titan"
            max_total_tokens = 8
            max_completion_tokens = 8
            "#,
        )
        .unwrap();
        let descriptor = catalog.get("tiny");
        assert_eq!(descriptor.provider_family, ProviderFamily::BedrockTitan);
        assert_eq!(descriptor.max_total_tokens, 8);
    }

    #[test]
    fn test_unknown_family_rejected_at_parse() {
        let result = ModelCatalog::from_toml_str(
            r#"
            [[models]]
            key = "x"
            provider_model_id = "x"
            purpose = "completions"
            provider_family = "unspecified"
            max_total_tokens = 8
            max_completion_tokens = 8
            "#,
        );
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let catalog = ModelCatalog::builtin().unwrap();
        assert!(catalog.contains("openai/gpt-4o"));
        assert!(catalog.contains("vertex/gemini-1.5-pro"));
        assert!(catalog.contains("bedrock/claude-3-5-sonnet"));
        assert_eq!(catalog.get("vertex/gemini-1.5-pro").max_total_tokens, 1048576);
    }

    #[test]
    fn test_garbled_toml_is_parse_error() {
        assert!(matches!(
            ModelCatalog::from_toml_str("[[models"),
            Err(CatalogError::Parse(_))
        ));
    }
}
