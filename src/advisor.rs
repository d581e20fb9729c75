use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::concepts::ConceptExtractor;
use crate::config::AdvisorConfig;
use crate::corpus::{CorpusScanner, CorpusSnapshot};
use crate::error::Result;
use crate::learning::{learn_patterns, LearningSummary};
use crate::matchers::{default_matchers, MatchContext, Matcher};
use crate::ranker::rank_suggestions;
use crate::store::{PatternCache, PatternStore};
use crate::suggestion::{BrokenLinkReference, Suggestion, SuggestionSource};

/// Ties the scanner, the pattern store and the matching strategies together
/// for one corpus.
pub struct LinkAdvisor {
    root: PathBuf,
    config: AdvisorConfig,
    extractor: ConceptExtractor,
    store: PatternStore,
    patterns: PatternCache,
    matchers: Vec<Box<dyn Matcher>>,
}

impl LinkAdvisor {
    /// Open the advisor with the store named in `config`.
    pub fn open(root: impl Into<PathBuf>, config: AdvisorConfig) -> Result<Self> {
        let store = PatternStore::open(&config.store.path)?;
        Self::with_store(root, config, store)
    }

    pub fn with_store(root: impl Into<PathBuf>, config: AdvisorConfig, store: PatternStore) -> Result<Self> {
        let extractor = ConceptExtractor::new(&config.concepts)?;
        Ok(Self {
            root: root.into(),
            config,
            extractor,
            store,
            patterns: PatternCache::default(),
            matchers: default_matchers(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    pub fn scan(&self) -> Result<CorpusSnapshot> {
        CorpusScanner::new(&self.root, &self.config.corpus).scan(&self.extractor)
    }

    pub fn learn(&mut self, snapshot: &CorpusSnapshot) -> Result<LearningSummary> {
        learn_patterns(snapshot, &mut self.store)
    }

    /// Scan the corpus and learn patterns from its valid links.
    pub fn analyze_existing_links(&mut self) -> Result<(CorpusSnapshot, LearningSummary)> {
        let snapshot = self.scan()?;
        let summary = self.learn(&snapshot)?;
        Ok((snapshot, summary))
    }

    /// Refresh the pattern cache used by the pattern strategy.
    pub fn load_patterns(&mut self) -> Result<usize> {
        self.patterns = PatternCache::load(&self.store, self.config.matching.pattern_min_usage)?;
        info!("loaded {} learned patterns", self.patterns.len());
        Ok(self.patterns.len())
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Every strategy's suggestions for every reference, unranked.
    pub fn collect_suggestions(
        &self,
        snapshot: &CorpusSnapshot,
        broken_links: &[BrokenLinkReference],
    ) -> Vec<Suggestion> {
        let ctx = MatchContext {
            snapshot,
            patterns: &self.patterns,
            config: &self.config.matching,
        };

        let mut suggestions = Vec::new();
        for reference in broken_links {
            if reference.normalized_link().is_empty() {
                warn!("skipping empty link in {}:{}", reference.file, reference.line);
                continue;
            }
            for matcher in &self.matchers {
                let found = matcher.suggest(&ctx, reference);
                debug!(
                    "{} strategy: {} suggestions for {:?}",
                    matcher.name(),
                    found.len(),
                    reference.link
                );
                suggestions.extend(found);
            }
        }
        suggestions
    }

    /// Ranked suggestions for a batch of broken links. An empty batch gives
    /// an empty list.
    pub fn suggest_fixes(
        &self,
        snapshot: &CorpusSnapshot,
        broken_links: &[BrokenLinkReference],
    ) -> Vec<Suggestion> {
        let suggestions = self.collect_suggestions(snapshot, broken_links);
        let total = suggestions.len();
        let ranked = rank_suggestions(suggestions, self.config.ranking.max_per_group);
        info!(
            "{} broken links: {} candidate suggestions, {} after ranking",
            broken_links.len(),
            total,
            ranked.len()
        );
        ranked
    }

    /// Record whether a suggestion was accepted. Accepted pattern suggestions
    /// count towards their pattern's success rate.
    pub fn record_feedback(&mut self, suggestion: &Suggestion, accepted: bool) -> Result<()> {
        self.store.record_history(
            &suggestion.broken_link,
            &suggestion.suggested_target,
            accepted,
            &suggestion.file,
            &suggestion.context,
        )?;

        if let SuggestionSource::Pattern { signature } = &suggestion.source {
            if !self.store.record_outcome(signature, accepted)? {
                warn!("feedback for unknown pattern {}", signature);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(
            root.join("Auth-Guide.md"),
            "# Auth Guide\nAuth tokens are JWT based. See [[Shared-Glossary]].\n",
        )
        .unwrap();
        fs::write(
            root.join("API-Reference.md"),
            "# API Reference\nEvery API call needs JWT Auth. See [[Shared-Glossary]].\n",
        )
        .unwrap();
        fs::write(
            root.join("Index.md"),
            "# Index\nOur Auth flow and the API both use JWT.\nSee [[Security-Overview]] for details.\n",
        )
        .unwrap();
        dir
    }

    fn advisor(root: &Path) -> LinkAdvisor {
        let store = PatternStore::open_in_memory().unwrap();
        LinkAdvisor::with_store(root, AdvisorConfig::default(), store).unwrap()
    }

    fn broken(root: &Path) -> Vec<BrokenLinkReference> {
        vec![BrokenLinkReference::new(
            "[[Security-Overview]]",
            root.join("Index.md").to_string_lossy(),
            3,
        )]
    }

    #[test]
    fn test_end_to_end_semantic_then_pattern() {
        let dir = corpus();
        let mut advisor = advisor(dir.path());

        let (snapshot, summary) = advisor.analyze_existing_links().unwrap();
        assert_eq!(summary.inserted, 1);
        advisor.load_patterns().unwrap();

        let ranked = advisor.suggest_fixes(&snapshot, &broken(dir.path()));
        assert!(ranked
            .iter()
            .any(|s| (s.suggested_target == "Auth-Guide" || s.suggested_target == "API-Reference")
                && s.confidence > 0.0));
        // One scan leaves the shared pattern at two uses, not enough to suggest
        assert!(ranked.iter().all(|s| !matches!(s.source, SuggestionSource::Pattern { .. })));

        advisor.analyze_existing_links().unwrap();
        advisor.load_patterns().unwrap();
        assert_eq!(advisor.patterns().len(), 1);

        let all = advisor.collect_suggestions(&snapshot, &broken(dir.path()));
        let pattern = all
            .iter()
            .find(|s| matches!(s.source, SuggestionSource::Pattern { .. }))
            .expect("pattern suggestion after repeated scans");
        assert_eq!(pattern.suggested_target, "Shared-Glossary");
        assert!(pattern.confidence > 0.0);
    }

    #[test]
    fn test_ranked_output_invariants() {
        let dir = corpus();
        let mut advisor = advisor(dir.path());
        let (snapshot, _) = advisor.analyze_existing_links().unwrap();
        advisor.analyze_existing_links().unwrap();
        advisor.load_patterns().unwrap();

        let ranked = advisor.suggest_fixes(&snapshot, &broken(dir.path()));
        assert!(!ranked.is_empty());
        assert!(ranked.len() <= 3);
        assert!(ranked.iter().all(|s| (0.0..=1.0).contains(&s.confidence)));
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        // Same inputs, same output
        assert_eq!(ranked, advisor.suggest_fixes(&snapshot, &broken(dir.path())));
    }

    #[test]
    fn test_empty_broken_link_set() {
        let dir = corpus();
        let advisor = advisor(dir.path());
        let snapshot = advisor.scan().unwrap();
        assert!(advisor.suggest_fixes(&snapshot, &[]).is_empty());
    }

    #[test]
    fn test_missing_origin_file_still_fuzzy_matches() {
        let dir = corpus();
        let advisor = advisor(dir.path());
        let snapshot = advisor.scan().unwrap();

        let reference = BrokenLinkReference::new("[[auth guide]]", "gone/Missing.md", 9);
        let ranked = advisor.suggest_fixes(&snapshot, &[reference]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].suggested_target, "Auth-Guide");
        assert_eq!(ranked[0].source, SuggestionSource::Fuzzy);
    }

    #[test]
    fn test_feedback_updates_pattern_counters() {
        let dir = corpus();
        let mut advisor = advisor(dir.path());
        let (snapshot, _) = advisor.analyze_existing_links().unwrap();
        advisor.analyze_existing_links().unwrap();
        advisor.load_patterns().unwrap();

        let all = advisor.collect_suggestions(&snapshot, &broken(dir.path()));
        let pattern = all
            .iter()
            .find(|s| matches!(s.source, SuggestionSource::Pattern { .. }))
            .unwrap()
            .clone();
        let semantic = all
            .iter()
            .find(|s| s.source == SuggestionSource::Semantic)
            .unwrap()
            .clone();

        advisor.record_feedback(&pattern, true).unwrap();
        advisor.record_feedback(&semantic, false).unwrap();

        let SuggestionSource::Pattern { signature } = &pattern.source else {
            unreachable!()
        };
        let stored = advisor.store().get(signature).unwrap().unwrap();
        assert_eq!(stored.success_count, 1);
        assert_eq!(advisor.store().history_count().unwrap(), 2);
    }

    #[test]
    fn test_open_with_unusable_store_path() {
        let dir = corpus();
        let mut config = AdvisorConfig::default();
        config.store.path = dir.path().to_path_buf();
        assert!(matches!(
            LinkAdvisor::open(dir.path(), config),
            Err(crate::error::AdvisorError::StoreUnavailable { .. })
        ));
    }
}
