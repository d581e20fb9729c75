use std::path::Path;

use log::warn;

use super::{truncate_chars, MatchContext, Matcher};
use crate::suggestion::{BrokenLinkReference, Suggestion, SuggestionSource};

/// Lines within `radius` of `line` (1-based). Out of range line numbers
/// clamp to the file bounds.
pub fn context_window(text: &str, line: usize, radius: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let center = line.saturating_sub(1).min(lines.len() - 1);
    let start = center.saturating_sub(radius);
    let end = (center + radius + 1).min(lines.len());
    lines[start..end].join("\n")
}

/// Compares concepts around the broken link with every document's concepts.
pub struct SemanticMatcher;

impl Matcher for SemanticMatcher {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn suggest(&self, ctx: &MatchContext<'_>, reference: &BrokenLinkReference) -> Vec<Suggestion> {
        let config = ctx.config;
        let text = match ctx.snapshot.origin_text(Path::new(&reference.file)) {
            Ok(text) => text,
            Err(e) => {
                warn!("could not read {} for semantic analysis: {}", reference.file, e);
                return Vec::new();
            }
        };

        let context = context_window(&text, reference.line, config.context_radius);
        let context_concepts = ctx.snapshot.extractor().extract_fragment(&context);
        let snippet = truncate_chars(&context, config.context_snippet_chars);

        let mut suggestions = Vec::new();
        for doc in ctx.snapshot.documents() {
            let shared = context_concepts.intersection(ctx.snapshot.concepts_of(doc));
            let overlap = shared.len();
            if overlap <= config.semantic_min_overlap {
                continue;
            }

            let confidence = (overlap as f64 / config.semantic_overlap_divisor).min(config.semantic_cap);
            let examples: Vec<&str> = shared.iter().take(3).collect();
            suggestions.push(Suggestion::new(
                reference,
                doc.stem(),
                confidence,
                format!(
                    "Semantic similarity: {} shared concepts ({})",
                    overlap,
                    examples.join(", ")
                ),
                snippet.clone(),
                SuggestionSource::Semantic,
            ));
        }

        suggestions
    }
}
