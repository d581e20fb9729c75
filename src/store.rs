//! Persistent pattern store: concept signature -> target that documents with
//! those concepts have linked to, with usage and acceptance counters.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::concepts::ConceptSet;
use crate::error::{AdvisorError, Result};

const SIGNATURE_PREFIX: &str = "concepts:";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS link_patterns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    signature TEXT UNIQUE NOT NULL,
    target_template TEXT NOT NULL,
    usage_count INTEGER NOT NULL DEFAULT 1,
    success_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_link_patterns_usage ON link_patterns(usage_count);

CREATE TABLE IF NOT EXISTS broken_link_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    broken_link TEXT NOT NULL,
    suggested_fix TEXT,
    was_accepted BOOLEAN NOT NULL,
    file_path TEXT,
    context TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

#[derive(Debug, Error)]
#[error("malformed pattern signature: {0:?}")]
pub struct SignatureError(String);

/// Canonical key for a learned pattern: a concept set, serialized sorted as
/// `concepts:a,b,c`. Equality is over the decoded set, so `concepts:b,a`
/// and `concepts:a,b` name the same pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternSignature(BTreeSet<String>);

impl PatternSignature {
    pub fn from_concepts(concepts: &ConceptSet) -> Self {
        Self(concepts.as_set().clone())
    }

    pub fn concepts(&self) -> ConceptSet {
        self.0.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encode(&self) -> String {
        let joined: Vec<&str> = self.0.iter().map(String::as_str).collect();
        format!("{}{}", SIGNATURE_PREFIX, joined.join(","))
    }
}

impl fmt::Display for PatternSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for PatternSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let body = s
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or_else(|| SignatureError(s.to_string()))?;
        Ok(Self(
            body.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}

impl Serialize for PatternSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LearnedPattern {
    pub signature: PatternSignature,
    pub target_template: String,
    pub usage_count: u32,
    pub success_count: u32,
}

impl LearnedPattern {
    /// success_count / usage_count, clamped to [0, 1]
    pub fn success_rate(&self) -> f64 {
        if self.usage_count == 0 {
            return 0.0;
        }
        (self.success_count as f64 / self.usage_count as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// SQLite-backed store. Single writer; each upsert is its own transaction.
pub struct PatternStore {
    conn: Connection,
}

impl PatternStore {
    /// Open (or create) the store at `path`. Failure here is fatal for a run.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| AdvisorError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let unavailable = |source| AdvisorError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.execute_batch(SCHEMA_SQL).map_err(unavailable)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let unavailable = |source| AdvisorError::StoreUnavailable {
            path: ":memory:".into(),
            source,
        };
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        conn.execute_batch(SCHEMA_SQL).map_err(unavailable)?;
        Ok(Self { conn })
    }

    /// Record that documents sharing `signature` link to `target`.
    ///
    /// A new signature starts at `occurrence_count` uses; a known one gains
    /// one use and takes `target` as its template.
    pub fn upsert(
        &mut self,
        signature: &PatternSignature,
        target: &str,
        occurrence_count: u32,
    ) -> Result<UpsertOutcome> {
        let key = signature.encode();
        let tx = self.conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM link_patterns WHERE signature = ?1",
                [&key],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        let outcome = if exists {
            tx.execute(
                "UPDATE link_patterns
                 SET usage_count = usage_count + 1,
                     target_template = ?2,
                     updated_at = CURRENT_TIMESTAMP
                 WHERE signature = ?1",
                params![key, target],
            )?;
            UpsertOutcome::Updated
        } else {
            tx.execute(
                "INSERT INTO link_patterns (signature, target_template, usage_count, success_count)
                 VALUES (?1, ?2, ?3, 0)",
                params![key, target, occurrence_count.max(1)],
            )?;
            UpsertOutcome::Inserted
        };

        tx.commit()?;
        debug!("{:?} pattern {} -> {}", outcome, key, target);
        Ok(outcome)
    }

    /// Patterns with `usage_count > min_usage`, most used first.
    pub fn query_candidates(&self, min_usage: u32) -> Result<Vec<LearnedPattern>> {
        let mut stmt = self.conn.prepare(
            "SELECT signature, target_template, usage_count, success_count
             FROM link_patterns
             WHERE usage_count > ?1
             ORDER BY usage_count DESC, signature ASC",
        )?;
        let rows = stmt.query_map([min_usage], pattern_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, signature: &PatternSignature) -> Result<Option<LearnedPattern>> {
        Ok(self
            .conn
            .query_row(
                "SELECT signature, target_template, usage_count, success_count
                 FROM link_patterns WHERE signature = ?1",
                [signature.encode()],
                pattern_from_row,
            )
            .optional()?)
    }

    /// Count an accepted suggestion against its pattern. Returns whether the
    /// signature is known.
    pub fn record_outcome(&mut self, signature: &PatternSignature, accepted: bool) -> Result<bool> {
        let changed = if accepted {
            self.conn.execute(
                "UPDATE link_patterns
                 SET success_count = success_count + 1, updated_at = CURRENT_TIMESTAMP
                 WHERE signature = ?1",
                [signature.encode()],
            )?
        } else {
            self.conn.execute(
                "UPDATE link_patterns SET updated_at = CURRENT_TIMESTAMP WHERE signature = ?1",
                [signature.encode()],
            )?
        };
        Ok(changed > 0)
    }

    pub fn record_history(
        &mut self,
        broken_link: &str,
        suggested_fix: &str,
        accepted: bool,
        file_path: &str,
        context: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO broken_link_history (broken_link, suggested_fix, was_accepted, file_path, context)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![broken_link, suggested_fix, accepted, file_path, context],
        )?;
        Ok(())
    }

    pub fn pattern_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM link_patterns", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn history_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM broken_link_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<LearnedPattern> {
    let raw: String = row.get(0)?;
    let signature = raw.parse::<PatternSignature>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(LearnedPattern {
        signature,
        target_template: row.get(1)?,
        usage_count: row.get(2)?,
        success_count: row.get(3)?,
    })
}

/// Patterns loaded once for one suggestion run. Reloading after the store
/// changes is up to the caller.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    patterns: Vec<LearnedPattern>,
}

impl PatternCache {
    pub fn load(store: &PatternStore, min_usage: u32) -> Result<Self> {
        Ok(Self {
            patterns: store.query_candidates(min_usage)?,
        })
    }

    pub fn patterns(&self) -> &[LearnedPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sig(concepts: &[&str]) -> PatternSignature {
        PatternSignature::from_concepts(&concepts.iter().copied().collect())
    }

    #[test]
    fn test_signature_canonical_form() {
        let a = sig(&["Auth", "API", "Guide"]);
        assert_eq!(a.encode(), "concepts:API,Auth,Guide");

        let decoded: PatternSignature = "concepts:Guide,Auth,API".parse().unwrap();
        assert_eq!(decoded, a);
        assert!("Auth,API".parse::<PatternSignature>().is_err());
    }

    #[test]
    fn test_upsert_inserts_then_increments() {
        let mut store = PatternStore::open_in_memory().unwrap();
        let signature = sig(&["API", "Auth"]);

        assert_eq!(store.upsert(&signature, "auth-guide", 2).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.get(&signature).unwrap().unwrap().usage_count, 2);

        assert_eq!(store.upsert(&signature, "auth-guide", 2).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.upsert(&signature, "auth-guide-v2", 2).unwrap(), UpsertOutcome::Updated);

        let pattern = store.get(&signature).unwrap().unwrap();
        assert_eq!(pattern.usage_count, 4);
        assert_eq!(pattern.target_template, "auth-guide-v2");
        assert_eq!(store.pattern_count().unwrap(), 1);
    }

    #[test]
    fn test_query_candidates_threshold_and_order() {
        let mut store = PatternStore::open_in_memory().unwrap();
        store.upsert(&sig(&["A"]), "a", 2).unwrap();
        store.upsert(&sig(&["B"]), "b", 5).unwrap();
        store.upsert(&sig(&["C"]), "c", 3).unwrap();

        let candidates = store.query_candidates(2).unwrap();
        let targets: Vec<&str> = candidates.iter().map(|p| p.target_template.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);
        assert_eq!(store.query_candidates(0).unwrap().len(), 3);
    }

    #[test]
    fn test_record_outcome() {
        let mut store = PatternStore::open_in_memory().unwrap();
        let signature = sig(&["API"]);
        store.upsert(&signature, "api-reference", 4).unwrap();

        assert!(store.record_outcome(&signature, true).unwrap());
        assert!(store.record_outcome(&signature, false).unwrap());
        assert!(!store.record_outcome(&sig(&["Unknown"]), true).unwrap());

        let pattern = store.get(&signature).unwrap().unwrap();
        assert_eq!(pattern.success_count, 1);
        assert_eq!(pattern.usage_count, 4);
        assert_eq!(pattern.success_rate(), 0.25);
    }

    #[test]
    fn test_success_rate_clamped() {
        let pattern = LearnedPattern {
            signature: sig(&["X"]),
            target_template: "x".into(),
            usage_count: 2,
            success_count: 5,
        };
        assert_eq!(pattern.success_rate(), 1.0);
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/advisor.db");
        let signature = sig(&["API", "Auth"]);

        {
            let mut store = PatternStore::open(&path).unwrap();
            store.upsert(&signature, "auth-guide", 3).unwrap();
            store.record_history("Security", "auth-guide", true, "a.md", "ctx").unwrap();
        }

        // Schema creation is idempotent across runs
        let store = PatternStore::open(&path).unwrap();
        assert_eq!(store.get(&signature).unwrap().unwrap().usage_count, 3);
        assert_eq!(store.history_count().unwrap(), 1);
    }

    #[test]
    fn test_open_unavailable() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened as a database file
        let err = PatternStore::open(dir.path()).err().unwrap();
        assert!(matches!(err, AdvisorError::StoreUnavailable { .. }));
    }

    #[test]
    fn test_open_reports_uncreatable_parent() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = PatternStore::open(&blocker.join("patterns.db")).err().unwrap();
        match err {
            AdvisorError::Io { path, .. } => assert_eq!(path, blocker),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cache_loads_candidates() {
        let mut store = PatternStore::open_in_memory().unwrap();
        store.upsert(&sig(&["A"]), "a", 1).unwrap();
        store.upsert(&sig(&["B"]), "b", 3).unwrap();

        let cache = PatternCache::load(&store, 2).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.patterns()[0].target_template, "b");
        assert!(PatternCache::default().is_empty());
    }
}
