use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

/// Settings read from `.link-advisor.toml`. Every field has a default so a
/// missing file, or a file with only some sections, is valid.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AdvisorConfig {
    pub corpus: CorpusConfig,
    pub store: StoreConfig,
    pub concepts: ConceptConfig,
    pub matching: MatchingConfig,
    pub ranking: RankingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CorpusConfig {
    /// File extensions to scan, without the dot
    pub extensions: Vec<String>,
    /// Glob patterns, relative to the corpus root
    pub exclude: Vec<String>,
    /// Skip hidden files and directories
    pub hidden: bool,
    /// Skip paths matched by .gitignore files
    pub git_ignore: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            exclude: Vec::new(),
            hidden: true,
            git_ignore: true,
        }
    }
}

impl CorpusConfig {
    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }

    pub fn accepts_extension(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        self.extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("link_advisor.db"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ConceptConfig {
    /// Cap on capitalized body terms taken from one document
    pub key_term_limit: usize,
    /// Vocabulary matched case-insensitively in context windows
    pub domain_terms: Vec<String>,
}

impl Default for ConceptConfig {
    fn default() -> Self {
        Self {
            key_term_limit: 20,
            domain_terms: [
                "API", "REST", "JWT", "Auth", "System", "Process", "Template", "Decision",
                "Pattern", "Link", "Validation",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Thresholds and weights for the three matching strategies.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub fuzzy_threshold: f64,
    pub context_radius: usize,
    pub context_snippet_chars: usize,
    pub semantic_min_overlap: usize,
    pub semantic_overlap_divisor: f64,
    pub semantic_cap: f64,
    pub pattern_min_usage: u32,
    pub pattern_success_weight: f64,
    pub pattern_usage_weight: f64,
    pub pattern_usage_saturation: u32,
    pub pattern_cap: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            context_radius: 3,
            context_snippet_chars: 200,
            semantic_min_overlap: 2,
            semantic_overlap_divisor: 10.0,
            semantic_cap: 0.8,
            pattern_min_usage: 2,
            pattern_success_weight: 0.8,
            pattern_usage_weight: 0.2,
            pattern_usage_saturation: 20,
            pattern_cap: 0.9,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RankingConfig {
    pub max_per_group: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { max_per_group: 3 }
    }
}

impl AdvisorConfig {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| AdvisorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| AdvisorError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
