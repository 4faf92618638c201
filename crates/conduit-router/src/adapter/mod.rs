//! Provider adapter contract
//!
//! The adapter is the only boundary the per-provider wrapper code occupies: it
//! marshals a prompt into one provider's request shape and returns the text.
//! The router never talks to a provider except through this trait.
//!
//! # Module Structure
//!
//! - `mock`: Scripted adapter for tests and simulations

mod mock;

pub use mock::{MockAdapter, MockBehavior};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options handed to the adapter with every invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvokeOptions {
    /// Concrete model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Optional system prompt
    pub system_prompt: Option<String>,
}

/// Text returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterResponse {
    /// Generated content
    pub content: String,
    /// Units consumed (prompt plus completion)
    pub tokens_used: u64,
}

/// Transport-level adapter failure (network error, non-2xx, outage)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    /// Create a transport error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Trait for per-provider call adapters
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Invoke `provider_id` with a prompt
    async fn invoke(
        &self,
        provider_id: &str,
        prompt: &str,
        options: &InvokeOptions,
    ) -> Result<AdapterResponse, TransportError>;
}
