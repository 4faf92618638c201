//! Token counting
//!
//! Request sizes are measured in cl100k_base tokens. The same count feeds the
//! context-window filter, cost estimates, and the mock adapter's usage.

use std::sync::LazyLock;
use tiktoken_rs::{cl100k_base, CoreBPE};

static TOKENIZER: LazyLock<CoreBPE> =
    LazyLock::new(|| cl100k_base().expect("cl100k_base tokenizer is a compile-time constant"));

/// Token counter over the shared cl100k_base encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    /// Create a counter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Tokens in `text`
    #[must_use]
    pub fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        TOKENIZER.encode_with_special_tokens(text).len()
    }

    /// Tokens in a prompt plus an optional system prompt
    #[must_use]
    pub fn count_request(&self, prompt: &str, system_prompt: Option<&str>) -> u64 {
        (self.count_tokens(prompt) + system_prompt.map_or(0, |s| self.count_tokens(s))) as u64
    }
}

/// Tokens in `text`
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    TokenCounter::new().count_tokens(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_tokens() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(TokenCounter::new().count_request("", None), 0);
    }

    #[test]
    fn test_common_words_are_single_tokens() {
        assert_eq!(count_tokens("hello"), 1);
        assert!(count_tokens("hello world") >= 2);
    }

    #[test]
    fn test_request_adds_system_prompt() {
        let counter = TokenCounter::new();
        let prompt = "Explain the water cycle";
        let system = "You are a patient tutor.";
        assert_eq!(
            counter.count_request(prompt, Some(system)),
            (count_tokens(prompt) + count_tokens(system)) as u64
        );
        assert!(counter.count_request(prompt, Some(system)) > counter.count_request(prompt, None));
    }

    #[test]
    fn test_tokens_fewer_than_characters_for_prose() {
        let prose = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let tokens = count_tokens(&prose);
        assert!(tokens > 0);
        assert!(tokens < prose.chars().count() / 2);
    }
}
