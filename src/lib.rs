//! link-advisor - suggests repair targets for broken cross-references in a
//! markdown knowledge base.
//!
//! A run scans the corpus into a [`corpus::CorpusSnapshot`], learns which
//! targets documents with shared concepts tend to link to, and then asks the
//! fuzzy, semantic and pattern strategies for replacements of each broken
//! link. [`advisor::LinkAdvisor`] wires these phases together.

pub mod advisor;
pub mod concepts;
pub mod config;
pub mod corpus;
pub mod error;
pub mod learning;
pub mod matchers;
pub mod ranker;
pub mod report;
pub mod store;
pub mod suggestion;

pub use advisor::LinkAdvisor;
pub use config::AdvisorConfig;
pub use error::{AdvisorError, Result};
pub use suggestion::{BrokenLinkReference, Suggestion};
