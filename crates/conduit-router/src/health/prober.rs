//! Lightweight provider probes

use crate::adapter::{InvokeOptions, ProviderAdapter};
use crate::registry::ProviderCapability;
use std::sync::Arc;
use std::time::Instant;

/// Prompt sent by [`AdapterProber`]
pub const HEALTH_CHECK_PROMPT: &str = "Hello, this is a health check. Please respond with 'OK'.";

/// Probe a provider; returns the observed latency in milliseconds
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Run one probe
    async fn probe(&self, provider: &ProviderCapability) -> Result<u64, String>;
}

/// Prober that sends [`HEALTH_CHECK_PROMPT`] through the provider adapter
pub struct AdapterProber {
    adapter: Arc<dyn ProviderAdapter>,
}

impl AdapterProber {
    /// Create a prober over an adapter
    #[must_use]
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait::async_trait]
impl Prober for AdapterProber {
    async fn probe(&self, provider: &ProviderCapability) -> Result<u64, String> {
        let options = InvokeOptions {
            model: provider.model_name().to_string(),
            temperature: 0.0,
            max_tokens: 10,
            system_prompt: None,
        };

        let started = Instant::now();
        let response = self
            .adapter
            .invoke(&provider.id, HEALTH_CHECK_PROMPT, &options)
            .await
            .map_err(|e| e.to_string())?;

        if response.content.trim().is_empty() {
            return Err("empty probe response".to_string());
        }
        Ok(started.elapsed().as_millis() as u64)
    }
}
