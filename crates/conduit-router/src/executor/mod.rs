//! Execution Coordinator
//!
//! Runs the fallback chain for one request:
//!
//! ```text
//! selecting -> invoking -> succeeded
//!                       -> failed -> exclude provider -> selecting
//! selecting (nothing left) -> exhausted
//! ```
//!
//! The chain is an explicit loop bounded by the registry size. Each attempt
//! re-reads health verdicts, asks the selector for the best provider not yet
//! excluded, invokes it under a timeout, and classifies the output. Every
//! completed attempt is written to the usage log and fed back to the health
//! monitor before the next one starts.
//!
//! # Module Structure
//!
//! - `quality`: heuristic output quality estimate

mod quality;

#[cfg(test)]
mod tests;

pub use quality::estimate_quality;

use crate::adapter::{AdapterResponse, InvokeOptions, ProviderAdapter};
use crate::analyzer::RequestAnalysis;
use crate::classify::{ClassifierChain, RefusalClassifier};
use crate::context::RouteContext;
use crate::error::{Error, Result};
use crate::health::HealthMonitor;
use crate::registry::{CapabilityRegistry, ProviderCapability};
use crate::requirements::Requirements;
use crate::selector::{SelectionResult, Selector};
use crate::task::TaskType;
use crate::usage::{UsageAttempt, UsageTracker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

// ============================================================================
// Config
// ============================================================================

/// Execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Per-invocation timeout in milliseconds
    pub invoke_timeout_ms: u64,
    /// Tasks whose output must look like JSON
    pub structured_tasks: Vec<TaskType>,
    /// Require parseable JSON rather than a JSON-like prefix
    pub strict_json: bool,
    /// Provider tried once when the pipeline fails unexpectedly
    pub emergency_provider: Option<String>,
    /// Literal phrases treated as refusals in addition to the built-in set
    pub refusal_phrases: Vec<String>,
    /// System prompts by task name, used when the caller sends none
    pub system_prompts: BTreeMap<String, String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            invoke_timeout_ms: 60_000,
            structured_tasks: vec![TaskType::Roadmap],
            strict_json: false,
            emergency_provider: Some("gpt-4o".to_string()),
            refusal_phrases: Vec::new(),
            system_prompts: BTreeMap::new(),
        }
    }
}

impl ExecutionConfig {
    /// Invocation timeout
    #[must_use]
    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms)
    }
}

// ============================================================================
// Request / Outcome
// ============================================================================

/// Everything one fallback chain needs
#[derive(Debug, Clone)]
pub struct ExecutionRequest<'a> {
    /// Task type
    pub task: TaskType,
    /// Prompt text
    pub prompt: &'a str,
    /// Caller context
    pub context: &'a RouteContext,
    /// Analysis of the prompt
    pub analysis: &'a RequestAnalysis,
}

/// Successful end of a fallback chain
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Accepted content
    pub content: String,
    /// Provider that produced it
    pub provider: String,
    /// Units consumed by the successful attempt
    pub tokens_used: u64,
    /// Attempts made, including the successful one
    pub attempts: usize,
    /// First provider that failed, when the chain fell back
    pub original_provider: Option<String>,
    /// Quality estimate of the content
    pub quality: f64,
    /// Selection that led to the successful attempt
    pub selection: Option<SelectionResult>,
}

// ============================================================================
// Coordinator
// ============================================================================

/// Drives provider attempts until one succeeds or candidates run out
pub struct ExecutionCoordinator {
    config: ExecutionConfig,
    classifiers: ClassifierChain,
    selector: Selector,
    registry: Arc<CapabilityRegistry>,
    health: Arc<HealthMonitor>,
    usage: Arc<UsageTracker>,
    adapter: Arc<dyn ProviderAdapter>,
}

impl ExecutionCoordinator {
    /// Create a coordinator
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a configured refusal phrase is invalid.
    pub fn new(
        config: ExecutionConfig,
        selector: Selector,
        registry: Arc<CapabilityRegistry>,
        health: Arc<HealthMonitor>,
        usage: Arc<UsageTracker>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Result<Self> {
        let refusals = RefusalClassifier::new(&config.refusal_phrases)?;
        let classifiers =
            ClassifierChain::standard(refusals, config.structured_tasks.clone(), config.strict_json);
        Ok(Self {
            config,
            classifiers,
            selector,
            registry,
            health,
            usage,
            adapter,
        })
    }

    /// Replace the classifier chain
    #[must_use]
    pub fn with_classifiers(mut self, classifiers: ClassifierChain) -> Self {
        self.classifiers = classifiers;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Selector used for every attempt
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Run the fallback chain
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuitableProvider`] when no candidate is left, wrapping the
    ///   most recent attempt failure
    /// - [`Error::Cancelled`] when `cancel` fires
    /// - [`Error::Internal`] when the registry changes under the selector
    #[instrument(
        skip(self, request, requirements, cancel),
        fields(task = %request.task, caller = %request.context.caller_id)
    )]
    pub async fn execute(
        &self,
        request: &ExecutionRequest<'_>,
        mut requirements: Requirements,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let max_attempts = self.registry.len();
        let mut last_error: Option<Error> = None;
        let mut original_provider: Option<String> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let candidates = self.registry.all_active();
            let ids: Vec<String> = candidates
                .iter()
                .filter(|p| !requirements.is_excluded(&p.id))
                .map(|p| p.id.clone())
                .collect();
            let verdicts = self.health.verdicts(&ids).await;

            let selection = match self
                .selector
                .select(request.task, &requirements, &candidates, &verdicts)
            {
                Ok(selection) => selection,
                Err(_) => return Err(self.exhausted(request.task, attempt - 1, last_error)),
            };
            if requirements.is_excluded(&selection.provider) {
                return Err(self.exhausted(request.task, attempt - 1, last_error));
            }

            let provider = self.registry.get(&selection.provider).ok_or_else(|| {
                Error::Internal(format!("selected provider {} left the registry", selection.provider))
            })?;

            match self
                .attempt(&provider, request, &selection.reason, original_provider.clone(), cancel)
                .await
            {
                Ok((response, quality)) => {
                    info!(
                        provider = %provider.id,
                        attempt,
                        fallback = original_provider.is_some(),
                        tokens = response.tokens_used,
                        "Request served"
                    );
                    return Ok(ExecutionOutcome {
                        content: response.content,
                        provider: provider.id,
                        tokens_used: response.tokens_used,
                        attempts: attempt,
                        original_provider,
                        quality,
                        selection: Some(selection),
                    });
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!(
                        provider = %provider.id,
                        attempt,
                        kind = e.kind(),
                        error = %e,
                        "Attempt failed, falling back"
                    );
                    requirements.exclude(provider.id.clone());
                    original_provider.get_or_insert_with(|| provider.id.clone());
                    last_error = Some(e);
                }
            }
        }

        Err(self.exhausted(request.task, max_attempts, last_error))
    }

    /// One attempt against a fixed provider, bypassing selection
    ///
    /// # Errors
    ///
    /// Returns the attempt's failure, [`Error::Cancelled`], or
    /// [`Error::NoSuitableProvider`] if the provider is unknown or inactive.
    pub async fn execute_on(
        &self,
        provider_id: &str,
        request: &ExecutionRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let provider = self
            .registry
            .get(provider_id)
            .filter(|p| p.active)
            .ok_or_else(|| Error::exhausted(None))?;

        let (response, quality) = self
            .attempt(&provider, request, "emergency fallback", None, cancel)
            .await?;
        Ok(ExecutionOutcome {
            content: response.content,
            provider: provider.id,
            tokens_used: response.tokens_used,
            attempts: 1,
            original_provider: None,
            quality,
            selection: None,
        })
    }

    fn exhausted(&self, task: TaskType, attempts: usize, last_error: Option<Error>) -> Error {
        warn!(
            task = %task,
            attempts,
            last_error = last_error.as_ref().map(Error::kind).unwrap_or("none"),
            "No suitable provider left"
        );
        Error::exhausted(last_error)
    }

    fn options(&self, provider: &ProviderCapability, request: &ExecutionRequest<'_>) -> InvokeOptions {
        let budget = request.task.default_token_budget();
        let system_prompt = request
            .context
            .system_prompt()
            .map(str::to_string)
            .or_else(|| self.config.system_prompts.get(request.task.as_str()).cloned());
        InvokeOptions {
            model: provider.model_name().to_string(),
            temperature: budget.temperature,
            max_tokens: budget.max_tokens,
            system_prompt,
        }
    }

    async fn invoke(
        &self,
        provider: &ProviderCapability,
        request: &ExecutionRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<AdapterResponse> {
        let options = self.options(provider, request);
        let timeout = self.config.invoke_timeout();
        let call = tokio::time::timeout(
            timeout,
            self.adapter.invoke(&provider.id, request.prompt, &options),
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = call => match result {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(Error::ProviderTransportFailure {
                    provider: provider.id.clone(),
                    message: e.to_string(),
                }),
                Err(_) => Err(Error::Timeout {
                    provider: provider.id.clone(),
                    timeout_ms: self.config.invoke_timeout_ms,
                }),
            },
        }
    }

    /// Invoke, classify, and record one attempt
    async fn attempt(
        &self,
        provider: &ProviderCapability,
        request: &ExecutionRequest<'_>,
        reason: &str,
        original_provider: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<(AdapterResponse, f64)> {
        let started = Instant::now();
        let result = self
            .invoke(provider, request, cancel)
            .await
            .and_then(|response| {
                match self
                    .classifiers
                    .classify(request.task, &response.content)
                    .into_error(&provider.id)
                {
                    Some(rejection) => Err(rejection),
                    None => Ok(response),
                }
            });
        let duration_ms = started.elapsed().as_millis() as u64;

        if matches!(result, Err(Error::Cancelled)) {
            return Err(Error::Cancelled);
        }

        let mut record = UsageAttempt::new(
            provider.id.clone(),
            request.task,
            request.context.caller_id.clone(),
        );
        record.duration_ms = duration_ms;
        record.original_provider = original_provider;
        record.complexity = request.analysis.complexity;
        record.emotional = request.analysis.emotional_content;
        record.selection_reason = reason.to_string();

        let result = result.map(|response| {
            let quality = estimate_quality(&response.content);
            (response, quality)
        });
        match &result {
            Ok((response, quality)) => {
                record.success = true;
                record.units = response.tokens_used;
                record.cost = provider.cost_for(response.tokens_used);
                record.quality = *quality;
            }
            Err(e) => record.error_kind = Some(e.kind().to_string()),
        }
        self.usage.record_attempt(record).await;

        self.health.record_outcome(
            &provider.id,
            result.is_ok(),
            duration_ms,
            result.as_ref().err().map(ToString::to_string),
        );

        result
    }
}

impl std::fmt::Debug for ExecutionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionCoordinator")
            .field("config", &self.config)
            .field("classifiers", &self.classifiers.len())
            .finish_non_exhaustive()
    }
}
