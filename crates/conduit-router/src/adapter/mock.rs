//! Scripted provider adapter
//!
//! Returns queued behaviors per provider, then a sticky default, then a
//! canned response. Every call is counted so tests can assert which
//! providers were reached.

use super::{AdapterResponse, InvokeOptions, ProviderAdapter, TransportError};
use crate::token::count_tokens;

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// What the mock does for one call
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Return this content
    Respond(String),
    /// Raise a transport error with this message
    Fail(String),
    /// Never complete (exercises the invocation timeout)
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<MockBehavior>>,
    defaults: HashMap<String, MockBehavior>,
    delays: HashMap<String, Duration>,
    calls: HashMap<String, usize>,
    log: Vec<String>,
}

/// A mock adapter with per-provider scripted behavior
#[derive(Debug, Default)]
pub struct MockAdapter {
    script: Mutex<Script>,
}

impl MockAdapter {
    /// Create a mock that answers every provider with a canned response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a one-shot behavior for a provider
    pub fn push(&self, provider: &str, behavior: MockBehavior) {
        self.script()
            .queued
            .entry(provider.to_string())
            .or_default()
            .push_back(behavior);
    }

    /// Set the behavior used once a provider's queue is empty
    pub fn set_default(&self, provider: &str, behavior: MockBehavior) {
        self.script()
            .defaults
            .insert(provider.to_string(), behavior);
    }

    /// Delay every response from a provider
    pub fn set_delay(&self, provider: &str, delay: Duration) {
        self.script().delays.insert(provider.to_string(), delay);
    }

    /// Builder form of [`set_default`](Self::set_default)
    #[must_use]
    pub fn with_default(self, provider: &str, behavior: MockBehavior) -> Self {
        self.set_default(provider, behavior);
        self
    }

    /// Number of calls a provider received
    #[must_use]
    pub fn calls(&self, provider: &str) -> usize {
        self.script().calls.get(provider).copied().unwrap_or(0)
    }

    /// Total calls across providers
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.script().calls.values().sum()
    }

    /// Providers called, in order
    #[must_use]
    pub fn call_log(&self) -> Vec<String> {
        self.script().log.clone()
    }

    fn next(&self, provider: &str) -> (MockBehavior, Option<Duration>) {
        let mut guard = self.script();
        let script = &mut *guard;
        *script.calls.entry(provider.to_string()).or_insert(0) += 1;
        script.log.push(provider.to_string());

        let behavior = script
            .queued
            .get_mut(provider)
            .and_then(VecDeque::pop_front)
            .or_else(|| script.defaults.get(provider).cloned())
            .unwrap_or_else(|| MockBehavior::Respond(format!("mock response from {provider}")));
        (behavior, script.delays.get(provider).copied())
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for MockAdapter {
    async fn invoke(
        &self,
        provider_id: &str,
        prompt: &str,
        _options: &InvokeOptions,
    ) -> Result<AdapterResponse, TransportError> {
        let (behavior, delay) = self.next(provider_id);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match behavior {
            MockBehavior::Respond(content) => {
                let tokens_used = (count_tokens(prompt) + count_tokens(&content)) as u64;
                Ok(AdapterResponse {
                    content,
                    tokens_used,
                })
            }
            MockBehavior::Fail(message) => Err(TransportError(message)),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
