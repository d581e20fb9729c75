use std::path::Path;

use log::warn;

use super::{MatchContext, Matcher};
use crate::concepts::ConceptSet;
use crate::config::MatchingConfig;
use crate::store::LearnedPattern;
use crate::suggestion::{BrokenLinkReference, Suggestion, SuggestionSource};

/// Blend of acceptance history and usage volume, capped by `pattern_cap`.
pub fn pattern_confidence(pattern: &LearnedPattern, config: &MatchingConfig) -> f64 {
    let saturation = config.pattern_usage_saturation.max(1);
    let usage = pattern.usage_count.min(saturation) as f64 / saturation as f64;
    let score = pattern.success_rate() * config.pattern_success_weight + usage * config.pattern_usage_weight;
    score.min(config.pattern_cap)
}

/// Proposes targets of learned patterns whose concepts appear in the origin file.
pub struct PatternMatcher;

impl PatternMatcher {
    /// Every concept in the origin file's full text. Unlike a document's
    /// cached set, key terms are not capped.
    fn origin_concepts(ctx: &MatchContext<'_>, file: &Path) -> Option<ConceptSet> {
        match ctx.snapshot.origin_text(file) {
            Ok(text) => Some(ctx.snapshot.extractor().extract_fragment(&text)),
            Err(e) => {
                warn!("could not read {} for pattern matching: {}", file.display(), e);
                None
            }
        }
    }
}

impl Matcher for PatternMatcher {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn suggest(&self, ctx: &MatchContext<'_>, reference: &BrokenLinkReference) -> Vec<Suggestion> {
        let candidates: Vec<&LearnedPattern> = ctx
            .patterns
            .patterns()
            .iter()
            .filter(|p| p.usage_count > ctx.config.pattern_min_usage)
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let Some(origin) = Self::origin_concepts(ctx, Path::new(&reference.file)) else {
            return Vec::new();
        };

        candidates
            .into_iter()
            .filter(|p| p.signature.concepts().overlap(&origin) > 0)
            .map(|p| {
                Suggestion::new(
                    reference,
                    p.target_template.clone(),
                    pattern_confidence(p, ctx.config),
                    format!(
                        "Pattern match: {} (used {} times, {:.1}% success rate)",
                        p.signature,
                        p.usage_count,
                        p.success_rate() * 100.0
                    ),
                    "Historical pattern",
                    SuggestionSource::Pattern {
                        signature: p.signature.clone(),
                    },
                )
            })
            .collect()
    }
}
