use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The pattern store could not be opened or its schema created.
    /// Both learning and pattern matching need it, so this ends the run.
    #[error("pattern store unavailable at {path}: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("pattern store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid concept vocabulary: {0}")]
    Vocabulary(#[from] regex::Error),

    #[error("invalid exclude pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("could not parse broken links from {path}: {message}")]
    Input { path: PathBuf, message: String },

    #[error("no broken link report found in {dir}. Run the link checker first.")]
    NoInput { dir: PathBuf },
}
