//! JSON extraction from provider output
//!
//! Providers wrap structured output inconsistently: fenced code blocks,
//! prose around a bare object, or the raw document. Each [`JsonStrategy`] is
//! one parse attempt; [`extract_json`] tries them in order.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

lazy_static::lazy_static! {
    static ref FENCED_BLOCK: Regex = Regex::new(r"```(?:json)?\s*([\{\[][\s\S]*?[\}\]])\s*```")
        .expect("FENCED_BLOCK is a compile-time constant");
}

/// One way of locating a JSON document inside text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStrategy {
    /// Body of a ```json fenced block
    FencedBlock,
    /// Span from the first opening brace to the last closing one
    OuterDelimiters,
    /// The whole text
    Raw,
}

impl JsonStrategy {
    /// Strategies in the order [`extract_json`] tries them
    pub const ORDER: [JsonStrategy; 3] = [Self::FencedBlock, Self::OuterDelimiters, Self::Raw];

    /// Run this strategy alone
    #[must_use]
    pub fn attempt(&self, text: &str) -> Option<Value> {
        match self {
            Self::FencedBlock => FENCED_BLOCK
                .captures_iter(text)
                .filter_map(|c| c.get(1))
                .find_map(|m| parse_structured(m.as_str())),
            Self::OuterDelimiters => [('{', '}'), ('[', ']')]
                .into_iter()
                .find_map(|(open, close)| {
                    let start = text.find(open)?;
                    let end = text.rfind(close)?;
                    (end > start).then(|| &text[start..=end])
                })
                .and_then(parse_structured),
            Self::Raw => parse_structured(text.trim()),
        }
    }
}

fn parse_structured(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

/// First JSON object or array found by any strategy
#[must_use]
pub fn extract_json(text: &str) -> Option<Value> {
    JsonStrategy::ORDER.iter().find_map(|s| s.attempt(text))
}

/// [`extract_json`] then deserialize into `T`
#[must_use]
pub fn extract_json_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    extract_json(text).and_then(|v| serde_json::from_value(v).ok())
}
