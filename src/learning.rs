//! Learning phase: targets linked from several documents become patterns
//! keyed by the concepts those documents share.

use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::concepts::ConceptSet;
use crate::corpus::CorpusSnapshot;
use crate::error::Result;
use crate::store::{PatternSignature, PatternStore, UpsertOutcome};

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LearningSummary {
    /// Targets referenced by more than one document
    pub shared_targets: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Concepts common to every listed document
fn common_concepts<'a>(
    snapshot: &CorpusSnapshot,
    sources: impl IntoIterator<Item = &'a PathBuf>,
) -> ConceptSet {
    let mut common: Option<ConceptSet> = None;
    for source in sources {
        let Some(doc) = snapshot.find(source) else {
            continue;
        };
        let concepts = snapshot.concepts_of(doc);
        common = Some(match common {
            None => concepts.clone(),
            Some(acc) => acc.intersection(concepts),
        });
    }
    common.unwrap_or_default()
}

pub fn learn_patterns(snapshot: &CorpusSnapshot, store: &mut PatternStore) -> Result<LearningSummary> {
    let mut summary = LearningSummary::default();

    for (target, sources) in snapshot.link_usage() {
        if sources.len() < 2 {
            continue;
        }
        summary.shared_targets += 1;

        let common = common_concepts(snapshot, sources);
        if common.is_empty() {
            continue;
        }

        let signature = PatternSignature::from_concepts(&common);
        let occurrences = u32::try_from(sources.len()).unwrap_or(u32::MAX);
        match store.upsert(&signature, target, occurrences)? {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
        }
    }

    info!(
        "learned from {} shared targets: {} new patterns, {} updated",
        summary.shared_targets, summary.inserted, summary.updated
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts::ConceptExtractor;
    use crate::config::ConceptConfig;
    use crate::corpus::Document;

    fn snapshot(docs: Vec<(&str, &str)>) -> CorpusSnapshot {
        let extractor = ConceptExtractor::new(&ConceptConfig::default()).unwrap();
        CorpusSnapshot::from_documents(
            "kb",
            docs.into_iter()
                .map(|(path, text)| Document::new(path.into(), text.to_string())),
            extractor,
        )
    }

    #[test]
    fn test_shared_concepts_collapse_to_one_pattern() {
        let snapshot = snapshot(vec![
            ("kb/Login.md", "# Auth API\nStart with [[auth-guide]]."),
            ("kb/Tokens.md", "# API Auth\nSee [[auth-guide]]."),
        ]);
        let mut store = PatternStore::open_in_memory().unwrap();

        let summary = learn_patterns(&snapshot, &mut store).unwrap();
        assert_eq!(
            summary,
            LearningSummary {
                shared_targets: 1,
                inserted: 1,
                updated: 0
            }
        );

        let signature: PatternSignature = "concepts:API,Auth".parse().unwrap();
        let pattern = store.get(&signature).unwrap().unwrap();
        assert_eq!(pattern.usage_count, 2);
        assert_eq!(pattern.target_template, "auth-guide");
        assert_eq!(store.pattern_count().unwrap(), 1);
    }

    #[test]
    fn test_relearning_grows_usage_steadily() {
        let snapshot = snapshot(vec![
            ("kb/Login.md", "# Auth API\n[[auth-guide]]"),
            ("kb/Tokens.md", "# API Auth\n[[auth-guide]]"),
        ]);
        let signature: PatternSignature = "concepts:API,Auth".parse().unwrap();
        let mut store = PatternStore::open_in_memory().unwrap();

        let mut usage = Vec::new();
        for _ in 0..3 {
            learn_patterns(&snapshot, &mut store).unwrap();
            usage.push(store.get(&signature).unwrap().unwrap().usage_count);
        }
        assert_eq!(usage, vec![2, 3, 4]);
    }

    #[test]
    fn test_no_pattern_without_shared_concepts_or_sources() {
        let snapshot = snapshot(vec![
            ("kb/Alpha.md", "plain text [[x]] and [[solo]]"),
            ("kb/beta.md", "more text [[x]]"),
        ]);
        let mut store = PatternStore::open_in_memory().unwrap();

        let summary = learn_patterns(&snapshot, &mut store).unwrap();
        assert_eq!(summary.shared_targets, 1);
        assert_eq!(summary.inserted, 0);
        assert_eq!(store.pattern_count().unwrap(), 0);
    }
}
