//! Built-in provider table
//!
//! Used when configuration supplies no `providers` list.

use super::{Feature, ProviderCapability, ReliabilityStats};
use crate::task::TaskType;

use Feature::{Analysis, Creativity, Empathy, Planning, Reasoning};
use TaskType::{
    ContentRecommendation, DoubtAnalysis, Emotion, Insights, MentorChat, PracticeQuestions,
    Prediction, Research, ResourceRecommendation, Roadmap,
};

struct Entry {
    id: &'static str,
    speed: f64,
    quality: f64,
    context_window: u64,
    multimodal: bool,
    cost_per_unit: f64,
    strengths: &'static [TaskType],
    features: &'static [Feature],
    uptime: f64,
    avg_latency_ms: u64,
    error_rate: f64,
    description: &'static str,
}

impl Entry {
    fn build(self) -> ProviderCapability {
        ProviderCapability {
            id: self.id.to_string(),
            speed: self.speed,
            quality: self.quality,
            cost_per_unit: self.cost_per_unit,
            cost_per_request: 0.0,
            context_window: self.context_window,
            multimodal: self.multimodal,
            strengths: self.strengths.to_vec(),
            features: self.features.to_vec(),
            languages: vec!["en".to_string()],
            reliability: ReliabilityStats {
                uptime: self.uptime,
                avg_latency_ms: self.avg_latency_ms,
                error_rate: self.error_rate,
            },
            active: true,
            description: self.description.to_string(),
            model_version: None,
        }
    }
}

/// Built-in capability records
#[must_use]
pub fn builtin_providers() -> Vec<ProviderCapability> {
    let entries = [
        Entry {
            id: "gpt-4o",
            speed: 80.0,
            quality: 90.0,
            context_window: 128_000,
            multimodal: true,
            cost_per_unit: 0.000_005,
            strengths: &[
                Roadmap,
                MentorChat,
                ResourceRecommendation,
                Research,
                DoubtAnalysis,
                PracticeQuestions,
                ContentRecommendation,
            ],
            features: &[Reasoning, Creativity, Analysis],
            uptime: 99.9,
            avg_latency_ms: 1200,
            error_rate: 0.1,
            description: "General-purpose multimodal model with strong reasoning",
        },
        Entry {
            id: "o1-preview",
            speed: 30.0,
            quality: 98.0,
            context_window: 128_000,
            multimodal: false,
            cost_per_unit: 0.000_015,
            strengths: &[Prediction, Insights, Roadmap, Research],
            features: &[Reasoning, Analysis, Planning],
            uptime: 99.5,
            avg_latency_ms: 5000,
            error_rate: 0.5,
            description: "Deep reasoning model for complex planning",
        },
        Entry {
            id: "o1-mini",
            speed: 50.0,
            quality: 95.0,
            context_window: 128_000,
            multimodal: false,
            cost_per_unit: 0.000_003,
            strengths: &[Prediction, Insights, Roadmap],
            features: &[Reasoning, Analysis],
            uptime: 99.6,
            avg_latency_ms: 3000,
            error_rate: 0.3,
            description: "Compact reasoning model",
        },
        Entry {
            id: "claude-opus",
            speed: 60.0,
            quality: 95.0,
            context_window: 200_000,
            multimodal: true,
            cost_per_unit: 0.000_015,
            strengths: &[Emotion, MentorChat, Insights, Roadmap],
            features: &[Empathy, Reasoning, Creativity, Analysis],
            uptime: 99.8,
            avg_latency_ms: 1500,
            error_rate: 0.2,
            description: "High-quality model with strong emotional intelligence",
        },
        Entry {
            id: "claude-sonnet",
            speed: 70.0,
            quality: 88.0,
            context_window: 200_000,
            multimodal: true,
            cost_per_unit: 0.000_003,
            strengths: &[
                MentorChat,
                Emotion,
                Research,
                Insights,
                DoubtAnalysis,
                ContentRecommendation,
            ],
            features: &[Empathy, Reasoning, Analysis],
            uptime: 99.6,
            avg_latency_ms: 1100,
            error_rate: 0.2,
            description: "Balanced conversational model",
        },
        Entry {
            id: "gemini-pro",
            speed: 90.0,
            quality: 85.0,
            context_window: 2_000_000,
            multimodal: true,
            cost_per_unit: 0.000_002_5,
            strengths: &[Research, Insights, MentorChat, DoubtAnalysis],
            features: &[Reasoning, Analysis, Feature::Research],
            uptime: 99.7,
            avg_latency_ms: 1000,
            error_rate: 0.3,
            description: "Very large context window for research workloads",
        },
        Entry {
            id: "gemini-2.5-flash",
            speed: 95.0,
            quality: 82.0,
            context_window: 1_000_000,
            multimodal: true,
            cost_per_unit: 0.000_001_5,
            strengths: &[
                MentorChat,
                ResourceRecommendation,
                Research,
                ContentRecommendation,
                PracticeQuestions,
            ],
            features: &[Reasoning, Analysis],
            uptime: 99.8,
            avg_latency_ms: 800,
            error_rate: 0.2,
            description: "Fast, inexpensive multimodal model",
        },
        Entry {
            id: "gpt-4o-mini",
            speed: 100.0,
            quality: 80.0,
            context_window: 128_000,
            multimodal: true,
            cost_per_unit: 0.000_000_15,
            strengths: &[
                MentorChat,
                ResourceRecommendation,
                ContentRecommendation,
                PracticeQuestions,
            ],
            features: &[Reasoning, Creativity],
            uptime: 99.8,
            avg_latency_ms: 800,
            error_rate: 0.1,
            description: "Cheapest general-purpose model",
        },
        Entry {
            id: "mistral-large",
            speed: 75.0,
            quality: 82.0,
            context_window: 32_000,
            multimodal: false,
            cost_per_unit: 0.000_008,
            strengths: &[Research, Insights, MentorChat, DoubtAnalysis],
            features: &[Reasoning, Analysis],
            uptime: 99.5,
            avg_latency_ms: 900,
            error_rate: 0.3,
            description: "Multilingual model",
        },
        Entry {
            id: "llama-3.1",
            speed: 65.0,
            quality: 78.0,
            context_window: 128_000,
            multimodal: false,
            cost_per_unit: 0.000_005,
            strengths: &[Research, Insights],
            features: &[Reasoning, Analysis],
            uptime: 99.4,
            avg_latency_ms: 1200,
            error_rate: 0.4,
            description: "Open-weights model",
        },
        Entry {
            id: "cohere-command-r-plus",
            speed: 85.0,
            quality: 87.0,
            context_window: 128_000,
            multimodal: false,
            cost_per_unit: 0.000_005,
            strengths: &[Research, Insights, MentorChat, DoubtAnalysis],
            features: &[Reasoning, Analysis, Feature::Research],
            uptime: 99.6,
            avg_latency_ms: 950,
            error_rate: 0.2,
            description: "Retrieval-oriented model",
        },
        Entry {
            id: "cohere-command-r",
            speed: 90.0,
            quality: 84.0,
            context_window: 128_000,
            multimodal: false,
            cost_per_unit: 0.000_003,
            strengths: &[MentorChat, Research, Insights],
            features: &[Reasoning, Analysis],
            uptime: 99.7,
            avg_latency_ms: 850,
            error_rate: 0.2,
            description: "Lighter retrieval-oriented model",
        },
        Entry {
            id: "hume-emotional-analysis",
            speed: 60.0,
            quality: 92.0,
            context_window: 32_000,
            multimodal: false,
            cost_per_unit: 0.000_007,
            strengths: &[Emotion, Insights, MentorChat],
            features: &[Empathy, Analysis],
            uptime: 99.5,
            avg_latency_ms: 1200,
            error_rate: 0.3,
            description: "Emotion analysis specialist",
        },
        Entry {
            id: "perplexity-pro",
            speed: 75.0,
            quality: 92.0,
            context_window: 128_000,
            multimodal: false,
            cost_per_unit: 0.000_005,
            strengths: &[Research, Insights, MentorChat, Roadmap],
            features: &[Reasoning, Analysis, Feature::Research],
            uptime: 99.8,
            avg_latency_ms: 1200,
            error_rate: 0.1,
            description: "Search-grounded research model",
        },
        Entry {
            id: "deepl-translation",
            speed: 85.0,
            quality: 96.0,
            context_window: 128_000,
            multimodal: false,
            cost_per_unit: 0.000_002,
            strengths: &[
                MentorChat,
                ResourceRecommendation,
                ContentRecommendation,
                PracticeQuestions,
            ],
            features: &[Analysis],
            uptime: 99.9,
            avg_latency_ms: 600,
            error_rate: 0.1,
            description: "Translation service",
        },
    ];

    entries
        .into_iter()
        .map(|entry| {
            let mut provider = entry.build();
            apply_overrides(&mut provider);
            provider
        })
        .collect()
}

fn apply_overrides(provider: &mut ProviderCapability) {
    let version = match provider.id.as_str() {
        "gpt-4o" => Some("gpt-4o-2024-08-06"),
        "o1-preview" => Some("o1-preview"),
        "o1-mini" => Some("o1-mini"),
        "gemini-2.5-flash" => Some("gemini-2.0-flash-exp"),
        "gpt-4o-mini" => Some("gpt-4o-mini"),
        "perplexity-pro" => Some("sonar-reasoning-pro"),
        "deepl-translation" => Some("deepl-free"),
        _ => None,
    };
    provider.model_version = version.map(str::to_string);

    match provider.id.as_str() {
        "o1-preview" => provider.active = false,
        "mistral-large" => provider.languages = langs(&["en", "fr", "de", "es"]),
        "deepl-translation" => {
            provider.languages = langs(&["en", "es", "fr", "de", "it", "pt", "ru", "ja", "zh"]);
        }
        _ => {}
    }
}

fn langs(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| (*c).to_string()).collect()
}
