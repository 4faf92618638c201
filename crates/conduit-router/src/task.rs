//! Task types shared by the registry, selector and callers
//!
//! This module contains the closed [`TaskType`] enumeration, the static
//! related-task table used for partial specialization credit, and the
//! per-task generation budget.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Task Type
// ============================================================================

/// Class of generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Structured learning roadmap (expects JSON output)
    Roadmap,
    /// One-on-one mentoring conversation
    MentorChat,
    /// Research on current trends and resources
    Research,
    /// Emotional state analysis
    Emotion,
    /// Outcome prediction from patterns
    Prediction,
    /// Learning resource recommendation
    ResourceRecommendation,
    /// Progress insights
    Insights,
    /// Doubt / question analysis
    DoubtAnalysis,
    /// Practice question generation
    PracticeQuestions,
    /// Content recommendation
    ContentRecommendation,
}

impl TaskType {
    /// All task types, in declaration order
    pub const ALL: [TaskType; 10] = [
        Self::Roadmap,
        Self::MentorChat,
        Self::Research,
        Self::Emotion,
        Self::Prediction,
        Self::ResourceRecommendation,
        Self::Insights,
        Self::DoubtAnalysis,
        Self::PracticeQuestions,
        Self::ContentRecommendation,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roadmap => "roadmap",
            Self::MentorChat => "mentor_chat",
            Self::Research => "research",
            Self::Emotion => "emotion",
            Self::Prediction => "prediction",
            Self::ResourceRecommendation => "resource_recommendation",
            Self::Insights => "insights",
            Self::DoubtAnalysis => "doubt_analysis",
            Self::PracticeQuestions => "practice_questions",
            Self::ContentRecommendation => "content_recommendation",
        }
    }

    /// Tasks that earn partial specialization credit for this task
    #[must_use]
    pub fn related_tasks(&self) -> &'static [TaskType] {
        match self {
            Self::Roadmap => &[Self::Prediction, Self::Insights, Self::Research],
            Self::Emotion => &[Self::MentorChat, Self::Insights],
            Self::Insights => &[Self::Emotion, Self::Prediction, Self::Research],
            Self::Research => &[Self::Roadmap, Self::Insights, Self::ResourceRecommendation],
            Self::Prediction => &[Self::Roadmap, Self::Insights],
            Self::ResourceRecommendation => &[Self::Research, Self::MentorChat],
            Self::MentorChat => &[Self::Emotion, Self::Insights, Self::ResourceRecommendation],
            Self::DoubtAnalysis | Self::PracticeQuestions | Self::ContentRecommendation => &[],
        }
    }

    /// Default generation budget for this task type
    ///
    /// - Roadmap: long structured documents (4096 tokens, low temperature)
    /// - Research / Insights / Prediction: analytical prose (3000 tokens)
    /// - MentorChat / Emotion: conversational replies (2000 tokens, warmer)
    /// - Recommendations / practice: lists (1500 tokens)
    #[must_use]
    pub fn default_token_budget(&self) -> TokenBudget {
        match self {
            Self::Roadmap => TokenBudget::new(4096, 0.4),
            Self::Research | Self::Insights | Self::Prediction => TokenBudget::new(3000, 0.5),
            Self::MentorChat | Self::Emotion => TokenBudget::new(2000, 0.7),
            Self::DoubtAnalysis => TokenBudget::new(2000, 0.4),
            Self::ResourceRecommendation
            | Self::PracticeQuestions
            | Self::ContentRecommendation => TokenBudget::new(1500, 0.6),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown task type: {s}"))
    }
}

// ============================================================================
// Token Budget
// ============================================================================

/// Generation budget for a task type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Recommended temperature
    pub temperature: f32,
}

impl TokenBudget {
    /// Create a new token budget
    #[must_use]
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}
