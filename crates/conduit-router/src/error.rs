//! Error types for conduit-router

use std::time::Duration;
use thiserror::Error;

/// Routing error type
///
/// Every failure a caller of [`Router::route`](crate::Router::route) can observe
/// is one of these variants. Transport, refusal, malformed-output and timeout
/// failures are recovered inside the fallback chain and only escape wrapped in
/// [`Error::NoSuitableProvider`] once every candidate is exhausted.
#[derive(Debug, Error)]
pub enum Error {
    /// No candidate survived the hard filters, or all candidates were tried
    #[error("no suitable provider available")]
    NoSuitableProvider {
        /// Most recent attempt failure, if any provider was invoked
        #[source]
        last_error: Option<Box<Error>>,
    },

    /// Caller exceeded their request budget for this scope
    #[error("rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimitExceeded {
        /// Time until the window frees a slot
        retry_after: Duration,
    },

    /// Adapter raised (network error, non-2xx, outage)
    #[error("provider {provider} transport failure: {message}")]
    ProviderTransportFailure {
        /// Provider that failed
        provider: String,
        /// Adapter error message
        message: String,
    },

    /// Provider output matched a refusal phrasing
    #[error("provider {provider} refused the request ({pattern})")]
    ProviderRefusal {
        /// Provider that refused
        provider: String,
        /// Pattern that matched
        pattern: String,
    },

    /// Provider output failed the structured-output shape check
    #[error("provider {provider} returned malformed output: {reason}")]
    MalformedOutput {
        /// Provider that produced the output
        provider: String,
        /// What the shape check expected
        reason: String,
    },

    /// Adapter call exceeded the invocation timeout
    #[error("provider {provider} timed out after {timeout_ms}ms")]
    Timeout {
        /// Provider that timed out
        provider: String,
        /// Configured bound
        timeout_ms: u64,
    },

    /// Caller aborted the request
    #[error("request cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected pipeline failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an exhaustion error wrapping the most recent attempt failure
    #[must_use]
    pub fn exhausted(last_error: Option<Error>) -> Self {
        Self::NoSuitableProvider {
            last_error: last_error.map(Box::new),
        }
    }

    /// Whether the fallback chain may recover from this error locally
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProviderTransportFailure { .. }
                | Self::ProviderRefusal { .. }
                | Self::MalformedOutput { .. }
                | Self::Timeout { .. }
        )
    }

    /// Short machine-readable kind, used in usage records and logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoSuitableProvider { .. } => "no_suitable_provider",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::ProviderTransportFailure { .. } => "transport_failure",
            Self::ProviderRefusal { .. } => "refusal",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Message safe to show to an end user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimitExceeded { retry_after } => format!(
                "Rate limit exceeded. Try again in {} minutes.",
                retry_after.as_secs().div_ceil(60).max(1)
            ),
            Self::Cancelled => "Request cancelled.".to_string(),
            _ => "Service temporarily unavailable. Please try again later.".to_string(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        let transport = Error::ProviderTransportFailure {
            provider: "p1".into(),
            message: "502".into(),
        };
        assert!(transport.is_recoverable());
        assert!(!Error::Cancelled.is_recoverable());
        assert!(!Error::exhausted(None).is_recoverable());
    }

    #[test]
    fn test_exhausted_wraps_last_error() {
        let err = Error::exhausted(Some(Error::Timeout {
            provider: "p1".into(),
            timeout_ms: 10,
        }));
        match err {
            Error::NoSuitableProvider { last_error } => {
                assert_eq!(last_error.map(|e| e.kind()), Some("timeout"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_message_never_leaks_transport_detail() {
        let err = Error::exhausted(Some(Error::ProviderTransportFailure {
            provider: "p1".into(),
            message: "connection refused 10.0.0.4".into(),
        }));
        assert!(!err.user_message().contains("10.0.0.4"));

        let limited = Error::RateLimitExceeded {
            retry_after: Duration::from_secs(90),
        };
        assert_eq!(limited.user_message(), "Rate limit exceeded. Try again in 2 minutes.");
    }
}
