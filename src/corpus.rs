//! Corpus scanning: walks the document tree once and keeps an in-memory
//! snapshot (documents, link occurrences, lazily computed concept sets) that
//! the learning phase and every matcher read from.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use log::{info, warn};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Serialize;

use crate::concepts::{ConceptExtractor, ConceptSet};
use crate::config::CorpusConfig;
use crate::error::Result;

static WIKI_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static INLINE_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").unwrap());

const EXTERNAL_SCHEMES: [&str; 3] = ["http", "mailto", "ftp"];
const SKIPPED_DIRS: [&str; 5] = ["node_modules", ".git", "target", "vendor", "__pycache__"];

/// Target string -> documents referencing it, each listed once in scan order
pub type LinkUsageMap = BTreeMap<String, Vec<PathBuf>>;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// `[[Target|alias]]`
    Wiki,
    /// `[text](target)`
    Inline,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence {
    pub source: PathBuf,
    pub target: String,
    pub kind: LinkKind,
    pub line: usize,
}

#[derive(Debug)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
    concepts: OnceCell<ConceptSet>,
}

impl Document {
    pub fn new(path: PathBuf, text: String) -> Self {
        Self {
            path,
            text,
            concepts: OnceCell::new(),
        }
    }

    /// File name without extension; the name links refer to
    pub fn stem(&self) -> &str {
        self.path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
    }

    fn concepts(&self, extractor: &ConceptExtractor) -> &ConceptSet {
        self.concepts
            .get_or_init(|| extractor.extract_document(&self.path, &self.text))
    }
}

/// Internal links in `content`, in line order. External targets are dropped.
pub fn parse_links(content: &str) -> Vec<(String, LinkKind, usize)> {
    let mut links = Vec::new();

    for (i, line) in content.lines().enumerate() {
        for caps in WIKI_LINK_RE.captures_iter(line) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let target = raw.split('|').next().unwrap_or_default();
            let target = target.split('#').next().unwrap_or_default().trim();
            if !target.is_empty() {
                links.push((target.to_string(), LinkKind::Wiki, i + 1));
            }
        }

        for caps in INLINE_LINK_RE.captures_iter(line) {
            let target = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            if target.is_empty() || EXTERNAL_SCHEMES.iter().any(|s| target.starts_with(s)) {
                continue;
            }
            links.push((target.to_string(), LinkKind::Inline, i + 1));
        }
    }

    links
}

/// One scan of the corpus. Built once per invocation and shared read-only.
#[derive(Debug)]
pub struct CorpusSnapshot {
    root: PathBuf,
    documents: BTreeMap<PathBuf, Document>,
    occurrences: Vec<LinkOccurrence>,
    link_usage: LinkUsageMap,
    extractor: ConceptExtractor,
}

impl CorpusSnapshot {
    /// Build a snapshot from documents already in memory.
    pub fn from_documents(
        root: impl Into<PathBuf>,
        documents: impl IntoIterator<Item = Document>,
        extractor: ConceptExtractor,
    ) -> Self {
        let documents: BTreeMap<PathBuf, Document> = documents
            .into_iter()
            .map(|doc| (doc.path.clone(), doc))
            .collect();

        let mut occurrences = Vec::new();
        let mut link_usage = LinkUsageMap::new();

        for doc in documents.values() {
            for (target, kind, line) in parse_links(&doc.text) {
                let sources = link_usage.entry(target.clone()).or_default();
                if !sources.contains(&doc.path) {
                    sources.push(doc.path.clone());
                }
                occurrences.push(LinkOccurrence {
                    source: doc.path.clone(),
                    target,
                    kind,
                    line,
                });
            }
        }

        Self {
            root: root.into(),
            documents,
            occurrences,
            link_usage,
            extractor,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn occurrences(&self) -> &[LinkOccurrence] {
        &self.occurrences
    }

    pub fn link_usage(&self) -> &LinkUsageMap {
        &self.link_usage
    }

    pub fn extractor(&self) -> &ConceptExtractor {
        &self.extractor
    }

    /// Cached concept set of a document in this snapshot
    pub fn concepts_of<'a>(&'a self, doc: &'a Document) -> &'a ConceptSet {
        doc.concepts(&self.extractor)
    }

    /// Document path -> concept set, for every scanned document
    pub fn concept_map(&self) -> BTreeMap<&Path, &ConceptSet> {
        self.documents
            .values()
            .map(|doc| (doc.path.as_path(), self.concepts_of(doc)))
            .collect()
    }

    /// Look a document up by its scanned path, or by a path relative to the root.
    pub fn find(&self, path: &Path) -> Option<&Document> {
        self.documents
            .get(path)
            .or_else(|| self.documents.get(&self.root.join(path)))
    }

    /// Text of a broken link's origin file. Served from the snapshot when the
    /// file was scanned, otherwise read from disk.
    pub fn origin_text(&self, file: &Path) -> io::Result<Cow<'_, str>> {
        if let Some(doc) = self.find(file) {
            return Ok(Cow::Borrowed(doc.text.as_str()));
        }
        match fs::read_to_string(file) {
            Ok(text) => Ok(Cow::Owned(text)),
            Err(err) if file.is_relative() => fs::read_to_string(self.root.join(file))
                .map(Cow::Owned)
                .map_err(|_| err),
            Err(err) => Err(err),
        }
    }
}

pub struct CorpusScanner<'a> {
    root: &'a Path,
    config: &'a CorpusConfig,
}

impl<'a> CorpusScanner<'a> {
    pub fn new(root: &'a Path, config: &'a CorpusConfig) -> Self {
        Self { root, config }
    }

    /// Walk the corpus and read every matching document. Unreadable files are
    /// logged and left out; the scan itself only fails on a bad exclude pattern.
    pub fn scan(&self, extractor: &ConceptExtractor) -> Result<CorpusSnapshot> {
        let excludes = self.config.exclude_set()?;

        let mut builder = WalkBuilder::new(self.root);
        builder
            .hidden(self.config.hidden)
            .git_ignore(self.config.git_ignore)
            .git_global(self.config.git_ignore)
            .require_git(false);

        let mut paths = Vec::new();
        for entry in builder.build().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if !self.config.accepts_extension(path) {
                continue;
            }

            let relative = path.strip_prefix(self.root).unwrap_or(path);
            if is_skipped_dir(relative) || excludes.is_match(relative) {
                continue;
            }
            paths.push(path.to_path_buf());
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            match fs::read_to_string(&path) {
                Ok(text) => documents.push(Document::new(path, text)),
                Err(e) => warn!("could not read {}: {}", path.display(), e),
            }
        }

        let snapshot = CorpusSnapshot::from_documents(self.root, documents, extractor.clone());
        info!(
            "scanned {} documents, {} link occurrences, {} distinct targets",
            snapshot.document_count(),
            snapshot.occurrences().len(),
            snapshot.link_usage().len()
        );
        Ok(snapshot)
    }
}

fn is_skipped_dir(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => SKIPPED_DIRS.iter().any(|d| name == *d),
        _ => false,
    })
}
