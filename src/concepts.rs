//! Concept extraction: the salient tokens of a document or text fragment.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::ConceptConfig;
use crate::error::Result;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]+[a-z]*|[a-z]+").unwrap());
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+[ \t]+(.+)$").unwrap());
/// Capitalized words and hyphenated capitalized phrases (`Auth`, `API`, `Auth-Guide`)
static KEY_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Za-z]*(?:-[A-Z][A-Za-z]*)*\b").unwrap());

/// Deduplicated, ordered set of concept tokens. Concepts are case-sensitive.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptSet(BTreeSet<String>);

impl ConceptSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, concept: impl Into<String>) {
        self.0.insert(concept.into());
    }

    pub fn contains(&self, concept: &str) -> bool {
        self.0.contains(concept)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concepts in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn intersection(&self, other: &ConceptSet) -> ConceptSet {
        ConceptSet(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn overlap(&self, other: &ConceptSet) -> usize {
        self.0.intersection(&other.0).count()
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for ConceptSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ConceptSet(iter.into_iter().map(Into::into).collect())
    }
}

impl Extend<String> for ConceptSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Split text into words on non-letters and camel-case boundaries.
///
/// Acronym runs stay whole: `HTTPServer` gives `HTTP` and `Server`,
/// `API-Reference` gives `API` and `Reference`.
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    for m in WORD_RE.find_iter(text) {
        let word = m.as_str();
        let upper = word.chars().take_while(|c| c.is_ascii_uppercase()).count();
        if upper > 1 && upper < word.len() {
            words.push(word[..upper - 1].to_string());
            words.push(word[upper - 1..].to_string());
        } else {
            words.push(word.to_string());
        }
    }
    words
}

/// Extracts concept sets from whole documents and from context windows.
#[derive(Debug, Clone)]
pub struct ConceptExtractor {
    key_term_limit: usize,
    domain_re: Option<Regex>,
}

impl ConceptExtractor {
    pub fn new(config: &ConceptConfig) -> Result<Self> {
        let domain_re = if config.domain_terms.is_empty() {
            None
        } else {
            let alternation = config
                .domain_terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };

        Ok(Self {
            key_term_limit: config.key_term_limit,
            domain_re,
        })
    }

    /// Concepts of a document: filename words, header words, and the first
    /// capitalized body terms.
    pub fn extract_document(&self, path: &Path, content: &str) -> ConceptSet {
        let mut concepts = ConceptSet::new();

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            concepts.extend(split_words(stem));
        }

        concepts.extend(header_words(content));

        concepts.extend(
            KEY_TERM_RE
                .find_iter(content)
                .take(self.key_term_limit)
                .map(|m| m.as_str().to_string()),
        );

        concepts
    }

    /// Concepts of an arbitrary fragment such as a context window: header
    /// words, every capitalized term, and the domain vocabulary.
    pub fn extract_fragment(&self, text: &str) -> ConceptSet {
        let mut concepts = ConceptSet::new();

        concepts.extend(header_words(text));
        concepts.extend(KEY_TERM_RE.find_iter(text).map(|m| m.as_str().to_string()));

        if let Some(domain_re) = &self.domain_re {
            concepts.extend(domain_re.find_iter(text).map(|m| m.as_str().to_string()));
        }

        concepts
    }
}

fn header_words(content: &str) -> Vec<String> {
    HEADER_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| split_words(m.as_str().trim_end()))
        .collect()
}
