//! Context Analyzer
//!
//! Extracts structured signals from a raw request. Every score is a count of
//! keyword matches normalized into a fixed range; every flag is a presence
//! check. The analysis is a pure function of the prompt and caller context.
//!
//! # Module Structure
//!
//! - `keywords`: Curated keyword sets

mod keywords;

#[cfg(test)]
mod tests;

use crate::context::{CallerTier, RouteContext, META_LANGUAGE, META_URGENCY, META_URGENT};
use crate::token::TokenCounter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

lazy_static::lazy_static! {
    static ref CODE_SYMBOLS: Regex =
        Regex::new(r"[{}();=<>]").expect("CODE_SYMBOLS is a compile-time constant");
    static ref MATH_SYMBOLS: Regex =
        Regex::new(r"[+\-*/=<>(){}\[\]]").expect("MATH_SYMBOLS is a compile-time constant");
    static ref ARITHMETIC: Regex =
        Regex::new(r"\d+\s*[+\-*/]\s*\d+").expect("ARITHMETIC is a compile-time constant");
}

/// Complexity floor, reported when a prompt carries no complexity signal
pub const NEUTRAL_COMPLEXITY: u8 = 5;

// ============================================================================
// Analysis Types
// ============================================================================

/// Request urgency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// No latency ceiling
    Low,
    /// Default
    #[default]
    Medium,
    /// Tight latency ceiling
    High,
}

/// Subject-matter domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Study and coursework
    Academic,
    /// Jobs and professional growth
    Career,
    /// Software and technology
    Technical,
    /// Art, music and writing
    Creative,
    /// Health, family and lifestyle
    Personal,
    /// No domain signal
    #[default]
    General,
}

/// Coarse sentiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// More positive than negative keywords
    Positive,
    /// Balanced or no sentiment keywords
    #[default]
    Neutral,
    /// More negative than positive keywords
    Negative,
}

macro_rules! lowercase_display {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = format!("{self:?}").to_ascii_lowercase();
                f.write_str(&s)
            }
        }
    )*};
}

lowercase_display!(Urgency, Domain, Sentiment);

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown urgency: {other}")),
        }
    }
}

/// Structured signals derived from one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAnalysis {
    /// Complexity score (0-10)
    pub complexity: u8,
    /// Emotional-content score (0-10)
    pub emotional_content: u8,
    /// Size of prompt plus system prompt, in cl100k_base tokens
    pub context_length: u64,
    /// Multi-step reasoning requested
    pub requires_reasoning: bool,
    /// Open-ended generation requested
    pub requires_creativity: bool,
    /// Supportive tone requested
    pub requires_empathy: bool,
    /// Information retrieval requested
    pub requires_research: bool,
    /// Plans or schedules requested
    pub requires_planning: bool,
    /// Urgency level
    pub urgency: Urgency,
    /// Caller tier
    pub tier: CallerTier,
    /// Subject-matter domain
    pub domain: Domain,
    /// Request language
    pub language: String,
    /// Mentions images
    pub has_images: bool,
    /// Mentions or contains code
    pub has_code: bool,
    /// Mentions or contains math
    pub has_math: bool,
    /// Contains personal information
    pub has_personal_info: bool,
    /// Coarse sentiment
    pub sentiment: Sentiment,
    /// Expected work size in units (caller hint, else `context_length`)
    pub expected_units: u64,
}

impl RequestAnalysis {
    /// One-line rendering for logs
    #[must_use]
    pub fn summary(&self) -> String {
        let mut flags = Vec::new();
        for (on, name) in [
            (self.requires_reasoning, "reasoning"),
            (self.requires_creativity, "creativity"),
            (self.requires_empathy, "empathy"),
            (self.requires_research, "research"),
            (self.requires_planning, "planning"),
            (self.has_images, "images"),
            (self.has_code, "code"),
            (self.has_math, "math"),
        ] {
            if on {
                flags.push(name);
            }
        }

        format!(
            "complexity={} emotional={} domain={} urgency={} tier={} sentiment={} units={} flags=[{}]",
            self.complexity,
            self.emotional_content,
            self.domain,
            self.urgency,
            self.tier,
            self.sentiment,
            self.expected_units,
            flags.join(",")
        )
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Lowercased text with its word set
struct Text {
    lower: String,
    words: HashSet<String>,
}

impl Text {
    fn new(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        let words = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { lower, words }
    }

    fn has(&self, keyword: &str) -> bool {
        if keyword.contains(' ') {
            self.lower.contains(keyword)
        } else {
            self.words.contains(keyword)
        }
    }

    fn count(&self, keywords: &[&str]) -> usize {
        keywords.iter().filter(|k| self.has(k)).count()
    }

    fn any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.has(k))
    }

    fn word_count(&self) -> usize {
        self.lower.split_whitespace().count()
    }
}

/// Analyze a request
#[must_use]
pub fn analyze(prompt: &str, context: &RouteContext) -> RequestAnalysis {
    let text = Text::new(prompt);
    let context_length = TokenCounter::new().count_request(prompt, context.system_prompt());

    let has_images = text.any(keywords::IMAGES);
    let has_code = text.any(keywords::CODE) || CODE_SYMBOLS.is_match(prompt);
    let has_math =
        text.any(keywords::MATH) || MATH_SYMBOLS.is_match(prompt) || ARITHMETIC.is_match(prompt);

    RequestAnalysis {
        complexity: complexity(&text),
        emotional_content: emotional_content(&text, prompt),
        context_length,
        requires_reasoning: text.any(keywords::REASONING),
        requires_creativity: text.any(keywords::CREATIVITY),
        requires_empathy: text.any(keywords::EMPATHY),
        requires_research: text.any(keywords::RESEARCH),
        requires_planning: text.any(keywords::PLANNING),
        urgency: urgency(&text, context),
        tier: context.tier,
        domain: domain(&text),
        language: context
            .meta(META_LANGUAGE)
            .map_or_else(|| "en".to_string(), str::to_ascii_lowercase),
        has_images,
        has_code,
        has_math,
        has_personal_info: text.any(keywords::PERSONAL_INFO),
        sentiment: sentiment(&text),
        expected_units: context.expected_length().unwrap_or(context_length),
    }
}

fn complexity(text: &Text) -> u8 {
    let words = text.word_count();
    let length_score = match words {
        w if w > 200 => 3,
        w if w > 100 => 2,
        w if w > 50 => 1,
        _ => 0,
    };
    let score = length_score
        + text.count(keywords::COMPLEX).min(4)
        + text.count(keywords::QUESTION).min(3);

    // weak signals never rank below no signal at all
    (score.min(10) as u8).max(NEUTRAL_COMPLEXITY)
}

fn emotional_content(text: &Text, raw: &str) -> u8 {
    let punctuation = raw.chars().filter(|c| matches!(c, '!' | '?')).count();
    let score = text.count(keywords::EMOTIONAL).min(6)
        + text.count(keywords::PERSONAL_PRONOUNS).min(2)
        + punctuation.min(2);
    score.min(10) as u8
}

fn urgency(text: &Text, context: &RouteContext) -> Urgency {
    if context.flag(META_URGENT) {
        return Urgency::High;
    }
    if let Some(explicit) = context.meta(META_URGENCY).and_then(|v| v.parse().ok()) {
        return explicit;
    }
    if text.any(keywords::URGENCY_HIGH) {
        Urgency::High
    } else {
        Urgency::Medium
    }
}

fn domain(text: &Text) -> Domain {
    [
        (keywords::DOMAIN_ACADEMIC, Domain::Academic),
        (keywords::DOMAIN_CAREER, Domain::Career),
        (keywords::DOMAIN_TECHNICAL, Domain::Technical),
        (keywords::DOMAIN_CREATIVE, Domain::Creative),
        (keywords::DOMAIN_PERSONAL, Domain::Personal),
    ]
    .into_iter()
    .find(|(words, _)| text.any(words))
    .map_or(Domain::General, |(_, d)| d)
}

fn sentiment(text: &Text) -> Sentiment {
    let positive = text.count(keywords::POSITIVE);
    let negative = text.count(keywords::NEGATIVE);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}
