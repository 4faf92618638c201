use super::*;
use crate::context::{META_EXPECTED_LENGTH, META_SYSTEM_PROMPT};

fn ctx() -> RouteContext {
    RouteContext::new("user-1", CallerTier::Free)
}

#[test]
fn test_neutral_defaults() {
    let analysis = analyze("hello there", &ctx());
    assert_eq!(analysis.complexity, NEUTRAL_COMPLEXITY);
    assert_eq!(analysis.emotional_content, 0);
    assert_eq!(analysis.domain, Domain::General);
    assert_eq!(analysis.urgency, Urgency::Medium);
    assert_eq!(analysis.sentiment, Sentiment::Neutral);
    assert_eq!(analysis.language, "en");
    assert!(!analysis.requires_reasoning);
}

#[test]
fn test_complexity_counts_keywords_and_questions() {
    let analysis = analyze(
        "Why should I design and implement a strategy to optimize and evaluate this? How?",
        &ctx(),
    );
    // 4 complex keywords (capped) + 2 question words
    assert_eq!(analysis.complexity, 6);
    assert!(analysis.requires_reasoning);
    assert!(analysis.requires_planning);
    assert!(analysis.requires_creativity);
}

#[test]
fn test_weak_signal_never_below_no_signal() {
    let silent = analyze("hello there", &ctx()).complexity;
    let weak = analyze("analyze this", &ctx()).complexity;
    assert_eq!(silent, NEUTRAL_COMPLEXITY);
    assert!(weak >= silent, "weak={weak} silent={silent}");

    let strong = analyze("Why and how should I analyze, design, evaluate and optimize this?", &ctx())
        .complexity;
    assert!(strong > silent);
}

#[test]
fn test_complexity_is_capped() {
    let long = "word ".repeat(250);
    let prompt = format!(
        "{long} why how what when where which analyze predict calculate solve design"
    );
    assert_eq!(analyze(&prompt, &ctx()).complexity, 10);
}

#[test]
fn test_emotional_content() {
    let analysis = analyze(
        "I feel so stressed and worried, my anxiety is overwhelming me!!",
        &ctx(),
    );
    // feel, worried, anxiety (3) + pronouns capped at 2 + punctuation capped at 2
    assert_eq!(analysis.emotional_content, 7);
    assert!(analysis.requires_empathy);
    assert_eq!(analysis.sentiment, Sentiment::Negative);
}

#[test]
fn test_single_letter_keywords_match_whole_words_only() {
    // "in", "it" and "is" must not count as the pronoun "i"
    let analysis = analyze("it is in the box", &ctx());
    assert_eq!(analysis.emotional_content, 0);
}

#[test]
fn test_domain_order() {
    assert_eq!(analyze("help with my exam", &ctx()).domain, Domain::Academic);
    assert_eq!(
        analyze("my job interview tomorrow", &ctx()).domain,
        Domain::Career
    );
    assert_eq!(
        analyze("the database algorithm", &ctx()).domain,
        Domain::Technical
    );
    // academic wins over technical when both match
    assert_eq!(
        analyze("a course about software", &ctx()).domain,
        Domain::Academic
    );
}

#[test]
fn test_urgency() {
    assert_eq!(analyze("this is urgent", &ctx()).urgency, Urgency::High);
    assert_eq!(analyze("reply soon", &ctx()).urgency, Urgency::Medium);

    let flagged = ctx().with_metadata(META_URGENT, "true");
    assert_eq!(analyze("no rush", &flagged).urgency, Urgency::High);

    let relaxed = ctx().with_metadata(META_URGENCY, "low");
    assert_eq!(analyze("whenever", &relaxed).urgency, Urgency::Low);
}

#[test]
fn test_content_flags() {
    let analysis = analyze("look at this screenshot of my python function: f(x) = 2 + 3", &ctx());
    assert!(analysis.has_images);
    assert!(analysis.has_code);
    assert!(analysis.has_math);

    let personal = analyze("My name is Sam and I live in Lisbon", &ctx());
    assert!(personal.has_personal_info);
}

#[test]
fn test_length_estimate_includes_system_prompt() {
    let prompt = "Explain how rivers shape valleys";
    let system = "You are a geography tutor.";
    let context = ctx().with_metadata(META_SYSTEM_PROMPT, system);
    let analysis = analyze(prompt, &context);

    let expected = (crate::token::count_tokens(prompt) + crate::token::count_tokens(system)) as u64;
    assert_eq!(analysis.context_length, expected);
    assert_eq!(analysis.expected_units, expected);
    assert!(analysis.context_length > analyze(prompt, &ctx()).context_length);

    let hinted = ctx().with_metadata(META_EXPECTED_LENGTH, "5000");
    assert_eq!(analyze("abc", &hinted).expected_units, 5000);
}

#[test]
fn test_tier_and_language_carried() {
    let context = RouteContext::new("u", CallerTier::Enterprise).with_metadata(META_LANGUAGE, "FR");
    let analysis = analyze("bonjour", &context);
    assert_eq!(analysis.tier, CallerTier::Enterprise);
    assert_eq!(analysis.language, "fr");
}

#[test]
fn test_summary_mentions_flags() {
    let analysis = analyze("explain why this happens", &ctx());
    let summary = analysis.summary();
    assert!(summary.contains("reasoning"));
    assert!(summary.contains("domain=general"));
    assert!(summary.contains("tier=free"));
}
