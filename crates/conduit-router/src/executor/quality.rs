//! Output quality heuristic (0-10)

/// Estimate the quality of a provider response
///
/// Base 5; +2 above 500 chars (+1 above 200); +1 for visible structure
/// (newlines, bullets, numbered lists); +1 for a complete answer over 100
/// chars that is not visibly truncated.
#[must_use]
pub fn estimate_quality(content: &str) -> f64 {
    let len = content.chars().count();
    let mut score: f64 = 5.0;

    if len > 500 {
        score += 2.0;
    } else if len > 200 {
        score += 1.0;
    }

    if content.contains('\n') || content.contains('•') || content.contains("1.") {
        score += 1.0;
    }

    if len > 100 && !content.contains("...") && !content.contains("truncated") {
        score += 1.0;
    }

    score.clamp(0.0, 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_plain_answer() {
        assert_eq!(estimate_quality("OK"), 5.0);
    }

    #[test]
    fn test_long_structured_answer() {
        let content = format!("Plan:\n1. {}", "study ".repeat(100));
        assert_eq!(estimate_quality(&content), 9.0);
    }

    #[test]
    fn test_medium_answer_and_truncation() {
        let medium = "a".repeat(250);
        assert_eq!(estimate_quality(&medium), 7.0);

        let truncated = format!("{}...", "a".repeat(250));
        assert_eq!(estimate_quality(&truncated), 6.0);
    }
}
