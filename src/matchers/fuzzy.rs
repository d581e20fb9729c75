use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{MatchContext, Matcher};
use crate::suggestion::{BrokenLinkReference, Suggestion, SuggestionSource};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Similarity of two names, case-insensitive.
///
/// 1.0 for an exact match, 0.8 when one contains the other, otherwise the
/// Jaccard similarity of their word sets.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let words_a: HashSet<&str> = WORD_RE.find_iter(&a).map(|m| m.as_str()).collect();
    let words_b: HashSet<&str> = WORD_RE.find_iter(&b).map(|m| m.as_str()).collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

/// Compares the broken link text against every document's base name.
pub struct FuzzyMatcher;

impl Matcher for FuzzyMatcher {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn suggest(&self, ctx: &MatchContext<'_>, reference: &BrokenLinkReference) -> Vec<Suggestion> {
        let link = reference.normalized_link();

        ctx.snapshot
            .documents()
            .filter_map(|doc| {
                let stem = doc.stem();
                let similarity = string_similarity(link, stem);
                (similarity > ctx.config.fuzzy_threshold).then(|| {
                    Suggestion::new(
                        reference,
                        stem,
                        similarity,
                        format!(
                            "Fuzzy match with existing file '{}' (similarity: {:.2})",
                            stem, similarity
                        ),
                        "Found similar file name",
                        SuggestionSource::Fuzzy,
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts::ConceptExtractor;
    use crate::config::{ConceptConfig, MatchingConfig};
    use crate::corpus::{CorpusSnapshot, Document};
    use crate::store::PatternCache;

    #[test]
    fn test_string_similarity_rules() {
        assert_eq!(string_similarity("Auth", "Auth"), 1.0);
        assert_eq!(string_similarity("auth", "AUTH"), 1.0);
        assert_eq!(string_similarity("AuthSystem", "Auth"), 0.8);
        assert_eq!(string_similarity("Auth", "AuthSystem"), 0.8);
        assert!((string_similarity("cherry pie", "apple pie") - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(string_similarity("alpha", "omega"), 0.0);
        assert_eq!(string_similarity("", "anything"), 0.0);
        assert_eq!(string_similarity("--", "++"), 0.0);
    }

    #[test]
    fn test_fuzzy_suggestions() {
        let extractor = ConceptExtractor::new(&ConceptConfig::default()).unwrap();
        let snapshot = CorpusSnapshot::from_documents(
            "corpus",
            vec![
                Document::new("corpus/Auth-Guide.md".into(), String::new()),
                Document::new("corpus/Cooking.md".into(), String::new()),
                Document::new("corpus/guide to auth setup.md".into(), String::new()),
            ],
            extractor,
        );
        let patterns = PatternCache::default();
        let config = MatchingConfig::default();
        let ctx = MatchContext {
            snapshot: &snapshot,
            patterns: &patterns,
            config: &config,
        };

        let reference = BrokenLinkReference::new("[[auth-guide]]", "corpus/Index.md", 7);
        let suggestions = FuzzyMatcher.suggest(&ctx, &reference);

        let found: Vec<(&str, f64)> = suggestions
            .iter()
            .map(|s| (s.suggested_target.as_str(), s.confidence))
            .collect();
        assert_eq!(found, vec![("Auth-Guide", 1.0)]);
        assert_eq!(suggestions[0].broken_link, "auth-guide");
        assert_eq!(suggestions[0].line, 7);
        assert_eq!(suggestions[0].source, SuggestionSource::Fuzzy);
    }
}
