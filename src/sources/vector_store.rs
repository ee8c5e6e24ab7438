use super::DocumentSource;
use anyhow::Result;

/// Similarity search over embedded documentation. No store is wired up yet,
/// so the source always reports itself unavailable.
#[derive(Debug, Clone, Default)]
pub struct VectorStoreSource;

impl DocumentSource for VectorStoreSource {
    fn fetch(&self, _query: &str) -> Result<String> {
        Ok(String::new())
    }

    fn is_available(&self) -> bool {
        false
    }
}
