//! Documentation context aggregation.
//!
//! Each registered source is queried independently; a failing source is
//! logged and left out so one broken back-end never blocks generation.
use crate::config::DelphosConfig;
use crate::error::PipelineError;
use crate::sources::{
    BugCommitSource, CveDatabaseSource, DocumentSource, KernelDocsSource, ManPageSource,
    VectorStoreSource, BUG_COMMITS, CVE_DB, KERNEL_DOCS, MANPAGES, VECTOR_STORE,
};
use std::collections::{BTreeMap, BTreeSet};

/// Source name to fetched text, keyed in name order.
pub type DocumentContext = BTreeMap<String, String>;

pub struct ContextBuilder {
    sources: BTreeMap<String, Box<dyn DocumentSource>>,
}

impl ContextBuilder {
    /// Register the five known back-ends, wired to the configured local data.
    pub fn from_config(config: &DelphosConfig) -> Self {
        let mut sources: BTreeMap<String, Box<dyn DocumentSource>> = BTreeMap::new();
        sources.insert(MANPAGES.to_string(), Box::new(ManPageSource::default()));
        sources.insert(
            CVE_DB.to_string(),
            Box::new(CveDatabaseSource::new(config.cve_dump.clone())),
        );
        sources.insert(
            KERNEL_DOCS.to_string(),
            Box::new(KernelDocsSource::new(config.kernel_docs_dir.clone())),
        );
        sources.insert(
            BUG_COMMITS.to_string(),
            Box::new(BugCommitSource::new(config.kernel_repo.clone())),
        );
        sources.insert(VECTOR_STORE.to_string(), Box::new(VectorStoreSource));
        Self::with_sources(sources)
    }

    pub fn with_sources<I, N>(sources: I) -> Self
    where
        I: IntoIterator<Item = (N, Box<dyn DocumentSource>)>,
        N: Into<String>,
    {
        Self {
            sources: sources
                .into_iter()
                .map(|(name, source)| (name.into(), source))
                .collect(),
        }
    }

    /// Query every available source for `target`.
    pub fn build_context(&self, target: &str) -> DocumentContext {
        let mut context = DocumentContext::new();
        for (name, source) in &self.sources {
            if !source.is_available() {
                tracing::debug!(source = %name, "source unavailable");
                continue;
            }
            match source.fetch(target) {
                Ok(text) if !text.is_empty() => {
                    tracing::debug!(source = %name, chars = text.len(), "source contributed");
                    context.insert(name.clone(), text);
                }
                Ok(_) => tracing::debug!(source = %name, "source returned no text"),
                Err(err) => {
                    let err = PipelineError::SourceFetch {
                        source_name: name.clone(),
                        message: format!("{err:#}"),
                    };
                    tracing::warn!("{err}");
                }
            }
        }
        context
    }

    pub fn available_sources(&self) -> BTreeSet<String> {
        self.sources
            .iter()
            .filter(|(_, source)| source.is_available())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every registered name paired with its current availability.
    pub fn source_status(&self) -> Vec<(String, bool)> {
        self.sources
            .iter()
            .map(|(name, source)| (name.clone(), source.is_available()))
            .collect()
    }
}
