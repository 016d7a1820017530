//! Mock backend for tests.
//!
//! Plays back a scripted queue of responses and failures without any
//! network access, so retry behavior can be exercised deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::{ModelDescriptor, ModelPurpose, ProviderFamily};
use crate::error::{FailureKind, ProviderFailure};
use crate::traits::{ModelBackend, ProviderResponse};

/// Scripted backend. Responses are served in FIFO order; an exhausted
/// script fails with a `server-error` tagged failure.
pub struct MockBackend {
    family: ProviderFamily,
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderFailure>>>,
    calls: AtomicUsize,
    models: Vec<ModelDescriptor>,
}

impl MockBackend {
    /// Create an empty-scripted mock for a family.
    pub fn new(family: ProviderFamily) -> Self {
        Self {
            family,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            models: Vec::new(),
        }
    }

    /// Queue a successful response.
    pub fn enqueue_response(self, response: ProviderResponse) -> Self {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Ok(response));
        self
    }

    /// Queue a failure.
    pub fn enqueue_failure(self, failure: ProviderFailure) -> Self {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Err(failure));
        self
    }

    /// Set the descriptors returned by `describe_models`.
    pub fn with_models(mut self, models: Vec<ModelDescriptor>) -> Self {
        self.models = models;
        self
    }

    /// Number of `invoke` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn family(&self) -> ProviderFamily {
        self.family
    }

    async fn invoke(
        &self,
        _purpose: ModelPurpose,
        _model_id: &str,
        _prompt: &str,
    ) -> Result<ProviderResponse, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderFailure::new(
                    FailureKind::ServerError,
                    "mock script exhausted",
                ))
            })
    }

    fn describe_models(&self) -> Vec<ModelDescriptor> {
        self.models.clone()
    }
}
