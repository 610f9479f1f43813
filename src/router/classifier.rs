//! Keyword-based prompt classifier
//!
//! Fast, deterministic classification using word-boundary keyword matching
//! on the lower-cased prompt. Word boundaries are ASCII: any non-ASCII
//! character, including CJK text and accented letters, separates words. Categories are checked in a fixed order and
//! the first match wins: code, writing, reasoning, analysis. A prompt that
//! matches nothing is `Default`.

use super::Classification;
use regex::Regex;
use std::sync::LazyLock;

/// Ordered keyword rules. Order is significant.
const RULES: [(Classification, &str); 4] = [
    (
        Classification::Code,
        r"(?-u:\b)(code|function|class|program|algorithm|script|syntax|programming language|api|framework)(?-u:\b)",
    ),
    (
        Classification::Writing,
        r"(?-u:\b)(write|essay|blog|article|content|story|description|paragraph|summary|summarize|rephrase)(?-u:\b)",
    ),
    (
        Classification::Reasoning,
        r"(?-u:\b)(reason|logic|explain|why|how|concept|understand|inference|deduce|conclude)(?-u:\b)",
    ),
    (
        Classification::Analysis,
        r"(?-u:\b)(analyze|compare|evaluate|assess|review|examine|investigate|report|data|statistics|metrics|performance)(?-u:\b)",
    ),
];

static COMPILED_RULES: LazyLock<Vec<(Classification, Regex)>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|(classification, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((*classification, re)),
            Err(e) => {
                tracing::error!(
                    classification = %classification,
                    error = %e,
                    "Classifier pattern failed to compile, rule disabled"
                );
                None
            }
        })
        .collect()
});

/// Classify a prompt into one of the fixed categories
///
/// # Examples
///
/// ```
/// use autollm::router::{Classification, classify_prompt};
///
/// assert_eq!(classify_prompt("Why does this algorithm work?"), Classification::Code);
/// assert_eq!(classify_prompt("hello"), Classification::Default);
/// ```
pub fn classify_prompt(prompt: &str) -> Classification {
    let lowered = prompt.to_lowercase();
    COMPILED_RULES
        .iter()
        .find(|(_, re)| re.is_match(&lowered))
        .map(|(classification, _)| *classification)
        .unwrap_or(Classification::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(COMPILED_RULES.len(), RULES.len());
    }

    #[test]
    fn test_code_keywords_route_to_code() {
        assert_eq!(
            classify_prompt("Write a function that reverses a list"),
            Classification::Code
        );
        assert_eq!(
            classify_prompt("Which sorting algorithm is fastest?"),
            Classification::Code
        );
        assert_eq!(
            classify_prompt("Is Rust a good programming language?"),
            Classification::Code
        );
    }

    #[test]
    fn test_blog_post_routes_to_writing() {
        assert_eq!(
            classify_prompt("Can you write a blog post about cats?"),
            Classification::Writing
        );
    }

    #[test]
    fn test_code_check_runs_before_reasoning() {
        assert_eq!(
            classify_prompt("Why does this algorithm work?"),
            Classification::Code
        );
    }

    #[test]
    fn test_writing_check_runs_before_reasoning() {
        assert_eq!(
            classify_prompt("Explain and summarize this chapter"),
            Classification::Writing
        );
    }

    #[test]
    fn test_reasoning_check_runs_before_analysis() {
        assert_eq!(
            classify_prompt("How should I compare these two options?"),
            Classification::Reasoning
        );
    }

    #[test]
    fn test_analysis_keywords() {
        assert_eq!(
            classify_prompt("Evaluate the quarterly statistics"),
            Classification::Analysis
        );
    }

    #[test]
    fn test_no_keywords_routes_to_default() {
        assert_eq!(classify_prompt("hello"), Classification::Default);
        assert_eq!(classify_prompt(""), Classification::Default);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(classify_prompt("FUNCTION"), Classification::Code);
        assert_eq!(classify_prompt("Blog"), Classification::Writing);
    }

    #[test]
    fn test_keywords_require_word_boundaries() {
        // "classic" contains "class", "however" contains "how"
        assert_eq!(classify_prompt("a classic tale"), Classification::Default);
        assert_eq!(classify_prompt("however"), Classification::Default);
        // "writer" is not "write"
        assert_eq!(classify_prompt("my favourite writer"), Classification::Default);
    }

    #[test]
    fn test_non_ascii_neighbours_are_word_boundaries() {
        assert_eq!(
            classify_prompt("用python写一个function"),
            Classification::Code
        );
        assert_eq!(classify_prompt("résumécode"), Classification::Code);
        assert_eq!(classify_prompt("数据data分析"), Classification::Analysis);
    }

    #[test]
    fn test_ascii_letters_still_join_words() {
        assert_eq!(classify_prompt("naïvecode"), Classification::Default);
        assert_eq!(classify_prompt("ïnterfunction"), Classification::Default);
    }

    #[test]
    fn test_multi_word_keyword() {
        assert_eq!(
            classify_prompt("what programming language should I learn"),
            Classification::Code
        );
    }

    proptest! {
        #[test]
        fn prop_code_keyword_always_wins(
            prefix in "[a-z ]{0,20}",
            suffix in "[a-z ]{0,20}",
            keyword in prop::sample::select(vec!["function", "algorithm", "code", "api", "script"]),
        ) {
            let prompt = format!("{} {} {}", prefix, keyword, suffix);
            prop_assert_eq!(classify_prompt(&prompt), Classification::Code);
        }

        #[test]
        fn prop_classification_ignores_case(prompt in "[a-zA-Z ]{0,40}") {
            prop_assert_eq!(
                classify_prompt(&prompt.to_uppercase()),
                classify_prompt(&prompt.to_lowercase())
            );
        }
    }
}
