//! Documentation back-ends that ground scenario generation.
//!
//! Every back-end implements the same two-operation contract. A source that
//! is not backed by a local integration reports itself unavailable and is
//! skipped by the context builder.
mod bug_commits;
mod cve_db;
mod kernel_docs;
mod manpages;
mod vector_store;

use anyhow::Result;

pub use bug_commits::BugCommitSource;
pub use cve_db::CveDatabaseSource;
pub use kernel_docs::KernelDocsSource;
pub use manpages::ManPageSource;
pub use vector_store::VectorStoreSource;

/// Character cap applied to every text-producing source.
pub const MAX_SOURCE_CHARS: usize = 2000;

pub const MANPAGES: &str = "manpages";
pub const CVE_DB: &str = "cve_db";
pub const KERNEL_DOCS: &str = "kernel_docs";
pub const BUG_COMMITS: &str = "bug_commits";
pub const VECTOR_STORE: &str = "vector_store";

/// A documentation back-end queried by target name.
pub trait DocumentSource {
    /// Fetch text about `query`. Empty text means "nothing to contribute".
    fn fetch(&self, query: &str) -> Result<String>;

    /// Cheap existence/health check. Must not fail.
    fn is_available(&self) -> bool;
}
