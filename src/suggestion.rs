use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};
use crate::store::PatternSignature;

const REPORT_GLOB: &str = "broken_links_*.json";

/// A broken link found by the external link checker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkReference {
    pub link: String,
    pub file: String,
    #[serde(default)]
    pub line: usize,
}

impl BrokenLinkReference {
    pub fn new(link: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            link: link.into(),
            file: file.into(),
            line,
        }
    }

    /// Link text with surrounding brackets/parens and any `|alias` removed
    pub fn normalized_link(&self) -> &str {
        let stripped = self
            .link
            .trim_matches(|c| matches!(c, '[' | ']' | '(' | ')'));
        stripped.split('|').next().unwrap_or_default().trim()
    }
}

/// Which strategy produced a suggestion
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum SuggestionSource {
    Fuzzy,
    Semantic,
    Pattern { signature: PatternSignature },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub broken_link: String,
    pub suggested_target: String,
    pub confidence: f64,
    pub reasoning: String,
    pub context: String,
    pub file: String,
    pub line: usize,
    pub source: SuggestionSource,
}

impl Suggestion {
    /// Build a suggestion for `reference`, clamping confidence into [0, 1].
    pub fn new(
        reference: &BrokenLinkReference,
        suggested_target: impl Into<String>,
        confidence: f64,
        reasoning: impl Into<String>,
        context: impl Into<String>,
        source: SuggestionSource,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            broken_link: reference.normalized_link().to_string(),
            suggested_target: suggested_target.into(),
            confidence,
            reasoning: reasoning.into(),
            context: context.into(),
            file: reference.file.clone(),
            line: reference.line,
            source,
        }
    }

    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_confidence(self.confidence)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.8 {
            ConfidenceTier::High
        } else if confidence > 0.6 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        };
        f.write_str(label)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BrokenLinkInput {
    Report { broken_links: Vec<BrokenLinkReference> },
    List(Vec<BrokenLinkReference>),
}

/// Read broken links from a JSON or YAML file, either a bare list or a
/// `{ "broken_links": [...] }` report.
pub fn load_broken_links(path: &Path) -> Result<Vec<BrokenLinkReference>> {
    let content = fs::read_to_string(path).map_err(|source| AdvisorError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed: std::result::Result<BrokenLinkInput, String> = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };

    match parsed {
        Ok(BrokenLinkInput::Report { broken_links }) => Ok(broken_links),
        Ok(BrokenLinkInput::List(links)) => Ok(links),
        Err(message) => Err(AdvisorError::Input {
            path: path.to_path_buf(),
            message,
        }),
    }
}

/// Newest `broken_links_*.json` in `dir`, by file name.
pub fn find_latest_report(dir: &Path) -> Result<PathBuf> {
    let matcher = Glob::new(REPORT_GLOB)?.compile_matcher();
    let no_input = || AdvisorError::NoInput {
        dir: dir.to_path_buf(),
    };

    fs::read_dir(dir)
        .map_err(|_| no_input())?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.file_name().is_some_and(|name| matcher.is_match(name)))
        .max_by(|a, b| a.file_name().cmp(&b.file_name()))
        .ok_or_else(no_input)
}
