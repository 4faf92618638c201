//! Output classifiers
//!
//! Soft-failure detection runs as an ordered list of classifiers. The first
//! classifier that rejects an output decides the outcome; new detectors are
//! added by pushing another [`OutputClassifier`] variant onto the chain.

use crate::error::{Error, Result};
use crate::extract::extract_json;
use crate::task::TaskType;
use regex::Regex;

/// Canonical refusal phrasings (matched case-insensitively)
pub const REFUSAL_PATTERNS: &[&str] = &[
    r"I'm sorry,? I (can't|cannot)",
    r"I (can't|cannot) assist",
    r"I'm not able to",
    r"I cannot (help|generate|create|provide)",
    r"I don't (think|believe|feel) I can",
    r"I'm unable to",
    r"I (won't|will not)",
    r"I (refuse|decline)",
];

/// Outcome of classifying one provider output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Usable output
    Accepted,
    /// Output matched a refusal pattern
    Refused {
        /// Pattern that matched
        pattern: String,
    },
    /// Output failed a shape check
    Malformed {
        /// What was expected
        reason: String,
    },
}

impl Classification {
    /// Convert a rejection into the matching error kind
    #[must_use]
    pub fn into_error(self, provider: &str) -> Option<Error> {
        match self {
            Self::Accepted => None,
            Self::Refused { pattern } => Some(Error::ProviderRefusal {
                provider: provider.to_string(),
                pattern,
            }),
            Self::Malformed { reason } => Some(Error::MalformedOutput {
                provider: provider.to_string(),
                reason,
            }),
        }
    }
}

// ============================================================================
// Classifiers
// ============================================================================

/// Detects refusal phrasings
#[derive(Debug, Clone)]
pub struct RefusalClassifier {
    patterns: Vec<(String, Regex)>,
}

impl RefusalClassifier {
    /// Classifier with the canonical patterns plus literal `extra_phrases`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a pattern fails to compile.
    pub fn new(extra_phrases: &[String]) -> Result<Self> {
        let literal: Vec<String> = extra_phrases
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| regex::escape(p.trim()))
            .collect();

        let patterns = REFUSAL_PATTERNS
            .iter()
            .map(|p| (*p).to_string())
            .chain(literal)
            .map(|source| {
                Regex::new(&format!("(?i){source}"))
                    .map(|re| (source.clone(), re))
                    .map_err(|e| Error::Config(format!("invalid refusal pattern {source:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Classifier with the canonical patterns only
    #[must_use]
    pub fn canonical() -> Self {
        let patterns = REFUSAL_PATTERNS
            .iter()
            .filter_map(|p| {
                Regex::new(&format!("(?i){p}"))
                    .ok()
                    .map(|re| ((*p).to_string(), re))
            })
            .collect();
        Self { patterns }
    }

    /// Number of patterns
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether there are no patterns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn classify(&self, content: &str) -> Classification {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(content))
            .map_or(Classification::Accepted, |(source, _)| {
                Classification::Refused {
                    pattern: source.clone(),
                }
            })
    }
}

/// Checks structured-output tasks for a JSON-like body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeClassifier {
    tasks: Vec<TaskType>,
    strict: bool,
}

impl ShapeClassifier {
    /// Shape check for `tasks`; `strict` requires parseable JSON
    #[must_use]
    pub fn new(tasks: Vec<TaskType>, strict: bool) -> Self {
        Self { tasks, strict }
    }

    fn classify(&self, task: TaskType, content: &str) -> Classification {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Classification::Malformed {
                reason: "empty response".to_string(),
            };
        }
        if !self.tasks.contains(&task) {
            return Classification::Accepted;
        }

        if self.strict {
            if extract_json(trimmed).is_none() {
                return Classification::Malformed {
                    reason: "no parseable JSON document".to_string(),
                };
            }
        } else {
            let looks_structured = trimmed.starts_with('{')
                || trimmed.starts_with('[')
                || trimmed.contains("```json")
                || trimmed.contains("```");
            if !looks_structured {
                return Classification::Malformed {
                    reason: "expected JSON-like structure".to_string(),
                };
            }
        }
        Classification::Accepted
    }
}

/// One pluggable output check
#[derive(Debug, Clone)]
pub enum OutputClassifier {
    /// Refusal phrasing detection
    Refusal(RefusalClassifier),
    /// Structured-output shape check
    Shape(ShapeClassifier),
}

impl OutputClassifier {
    /// Classify one output
    #[must_use]
    pub fn classify(&self, task: TaskType, content: &str) -> Classification {
        match self {
            Self::Refusal(c) => c.classify(content),
            Self::Shape(c) => c.classify(task, content),
        }
    }
}

/// Ordered classifier list
#[derive(Debug, Clone, Default)]
pub struct ClassifierChain {
    classifiers: Vec<OutputClassifier>,
}

impl ClassifierChain {
    /// Chain over the given classifiers, applied in order
    #[must_use]
    pub fn new(classifiers: Vec<OutputClassifier>) -> Self {
        Self { classifiers }
    }

    /// Refusal detection then the shape check for `structured_tasks`
    #[must_use]
    pub fn standard(refusals: RefusalClassifier, structured_tasks: Vec<TaskType>, strict: bool) -> Self {
        Self::new(vec![
            OutputClassifier::Refusal(refusals),
            OutputClassifier::Shape(ShapeClassifier::new(structured_tasks, strict)),
        ])
    }

    /// Append a classifier
    #[must_use]
    pub fn with(mut self, classifier: OutputClassifier) -> Self {
        self.classifiers.push(classifier);
        self
    }

    /// Number of classifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    /// Whether the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// First rejection, or [`Classification::Accepted`]
    #[must_use]
    pub fn classify(&self, task: TaskType, content: &str) -> Classification {
        self.classifiers
            .iter()
            .map(|c| c.classify(task, content))
            .find(|c| *c != Classification::Accepted)
            .unwrap_or(Classification::Accepted)
    }
}
