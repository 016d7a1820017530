//! End-to-end reconciliation scenarios.
//!
//! These drive the classifier, reconciler, reducer, and post-processor
//! together the way a retry layer would, including a scripted
//! shrink-and-retry loop over the mock backend.

use llm_backstop::{
    from_error_message, from_metadata, reduce, resolve_attempt, CallContext, FailureKind,
    GeneratedContent, MockBackend, ModelBackend, ModelCatalog, ModelPurpose, OutcomeStatus,
    ProviderFailure, ProviderFamily, ProviderResponse, RawTokenCounts, ShrinkConfig, StatEvent,
    InvocationStats, TokenUsage,
};

fn catalog() -> ModelCatalog {
    ModelCatalog::from_toml_str(
        r#"
        [[models]]
        key = "tiny-embed"
        provider_model_id = "tiny-embed-1"
        purpose = "embeddings"
        provider_family = "bedrock-titan"
        max_total_tokens = 8
        dimensions = 256

        [[models]]
        key = "capped"
        provider_model_id = "capped-1"
        purpose = "completions"
        provider_family = "openai"
        max_total_tokens = 8192
        max_completion_tokens = 8192

        [[models]]
        key = "gemini"
        provider_model_id = "gemini-1.5-pro"
        purpose = "completions"
        provider_family = "vertex-ai"
        max_total_tokens = 1048576
        max_completion_tokens = 8192
        "#,
    )
    .unwrap()
}

#[test]
fn oversized_prompt_is_cropped_to_exact_ratio() {
    // 20-character prompt against a budget of 8 tokens with no reported
    // prompt count: the reconciler derives 9 prompt tokens, the reducer
    // applies ratio 8/10 and keeps floor(20 * 0.8) = 16 characters.
    let catalog = catalog();
    let config = ShrinkConfig::default();

    let usage = from_metadata(
        &catalog,
        "tiny-embed",
        RawTokenCounts::reported(-1, 0, 8),
    );
    assert_eq!(usage.prompt_tokens, 9);

    let prompt = "1234 1234 1234 1234 ";
    assert_eq!(prompt.chars().count(), 20);
    let reduced = reduce(prompt, &catalog, "tiny-embed", &usage, &config);
    assert_eq!(reduced, "1234 1234 1234 1");
}

#[test]
fn completion_at_ceiling_crops_prompt_by_min_ratio() {
    let catalog = catalog();
    let usage = from_metadata(
        &catalog,
        "capped",
        RawTokenCounts::reported(-1, 8192, 8192),
    );
    let prompt = "x".repeat(200);
    let reduced = reduce(&prompt, &catalog, "capped", &usage, &ShrinkConfig::default());
    assert_eq!(reduced.len(), 150);
}

#[test]
fn openai_limit_message_without_counts_resolves_one_over() {
    let usage = from_error_message(
        &catalog(),
        "capped",
        "short prompt",
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
fn vertex_limit_message_resolves_reported_counts() {
    let usage = from_error_message(
        &catalog(),
        "gemini",
        "short prompt",
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
fn shrink_loop_converges_below_budget_estimate() {
    // Repeated reduce calls must shrink monotonically; the retry layer
    // loops exactly like this, re-measuring usage per attempt.
    let catalog = catalog();
    let config = ShrinkConfig::default();
    let mut prompt: String = "word ".repeat(500);

    for _ in 0..10 {
        let usage = from_error_message(
            &catalog,
            "tiny-embed",
            &prompt,
            "Input was rejected for length.",
            &config,
        );
        let reduced = reduce(&prompt, &catalog, "tiny-embed", &usage, &config);
        assert!(reduced.chars().count() <= prompt.chars().count());
        prompt = reduced;
    }
    assert!(prompt.chars().count() < 2500);
}

#[tokio::test]
async fn scripted_retry_run_resolves_each_attempt() {
    // Throttle, then a token-limit rejection, then valid JSON: the
    // resolution sequence is overloaded -> exceeded -> completed, and the
    // counters record one retry, one crop, one success.
    let catalog = catalog();
    let config = ShrinkConfig::default();
    let stats = InvocationStats::new();
    let context = CallContext::from([("job".to_string(), "batch-7".to_string())]);

    let backend = MockBackend::new(ProviderFamily::OpenAi)
        .enqueue_failure(
            ProviderFailure::new(FailureKind::RateLimited, "rate limit reached").with_status(429),
        )
        .enqueue_failure(ProviderFailure::new(
            FailureKind::Validation,
            "This model's maximum context length is 8192 tokens. However, your \
             messages resulted in 9000 tokens.",
        ))
        .enqueue_response(ProviderResponse::text("{\"summary\": \"done\"}"));

    let mut prompt: String = "fill ".repeat(200);
    let mut completed = None;

    for _ in 0..5 {
        let attempt = backend
            .invoke(ModelPurpose::Completions, "capped-1", &prompt)
            .await;
        let outcome = resolve_attempt(
            &catalog,
            &config,
            "capped",
            &prompt,
            true,
            context.clone(),
            attempt,
        )
        .expect("no fatal failures scripted");

        match outcome.status {
            OutcomeStatus::Completed => {
                stats.record(StatEvent::Success);
                completed = outcome.generated;
                break;
            }
            OutcomeStatus::Overloaded => {
                stats.record(StatEvent::Retry);
            }
            OutcomeStatus::Exceeded => {
                let usage = outcome.usage.expect("exceeded outcome carries usage");
                prompt = reduce(&prompt, &catalog, "capped", &usage, &config);
                stats.record(StatEvent::Crop);
            }
            OutcomeStatus::Unknown => unreachable!("loop never constructs unknown"),
        }
    }

    match completed {
        Some(GeneratedContent::Json(value)) => assert_eq!(value["summary"], "done"),
        other => panic!("expected parsed JSON, got {other:?}"),
    }
    assert_eq!(backend.call_count(), 3);

    let snapshot = stats.snapshot(true);
    assert_eq!(snapshot.get("RETRY"), 1);
    assert_eq!(snapshot.get("CROP"), 1);
    assert_eq!(snapshot.get("SUCCESS"), 1);
    assert_eq!(snapshot.get("TOTAL"), 1);
}

#[tokio::test]
async fn fatal_failure_propagates_unchanged_through_the_loop() {
    let catalog = catalog();
    let config = ShrinkConfig::default();
    let original = ProviderFailure::new(FailureKind::Auth, "Incorrect API key provided")
        .with_status(401)
        .with_error_type("AuthenticationError");

    let backend =
        MockBackend::new(ProviderFamily::OpenAi).enqueue_failure(original.clone());
    let attempt = backend
        .invoke(ModelPurpose::Completions, "capped-1", "prompt")
        .await;

    let err = resolve_attempt(
        &catalog,
        &config,
        "capped",
        "prompt",
        false,
        CallContext::new(),
        attempt,
    )
    .unwrap_err();
    assert_eq!(err, original);
}
