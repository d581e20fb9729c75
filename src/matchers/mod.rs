//! Matching strategies. Each one reads the corpus snapshot and the pattern
//! cache and proposes replacement targets for one broken link; none of them
//! write anything, so they can run in any order.

mod fuzzy;
mod pattern;
mod semantic;

pub use fuzzy::{string_similarity, FuzzyMatcher};
pub use pattern::{pattern_confidence, PatternMatcher};
pub use semantic::{context_window, SemanticMatcher};

use crate::config::MatchingConfig;
use crate::corpus::CorpusSnapshot;
use crate::store::PatternCache;
use crate::suggestion::{BrokenLinkReference, Suggestion};

/// Read-only inputs shared by every strategy during one suggestion run.
pub struct MatchContext<'a> {
    pub snapshot: &'a CorpusSnapshot,
    pub patterns: &'a PatternCache,
    pub config: &'a MatchingConfig,
}

pub trait Matcher {
    fn name(&self) -> &'static str;

    fn suggest(&self, ctx: &MatchContext<'_>, reference: &BrokenLinkReference) -> Vec<Suggestion>;
}

/// Fuzzy, semantic and pattern strategies, in that order
pub fn default_matchers() -> Vec<Box<dyn Matcher>> {
    vec![
        Box::new(FuzzyMatcher),
        Box::new(SemanticMatcher),
        Box::new(PatternMatcher),
    ]
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
