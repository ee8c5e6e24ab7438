//! Kernel documentation from a local `Documentation/` checkout.
use super::{DocumentSource, MAX_SOURCE_CHARS};
use crate::util::truncate_chars;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const DOC_EXTENSIONS: [&str; 2] = ["rst", "txt"];

#[derive(Debug, Clone, Default)]
pub struct KernelDocsSource {
    root: Option<PathBuf>,
}

impl KernelDocsSource {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl DocumentSource for KernelDocsSource {
    fn fetch(&self, query: &str) -> Result<String> {
        let Some(root) = &self.root else {
            return Ok(String::new());
        };
        let Some(path) = find_doc(root, query)? else {
            return Ok(String::new());
        };
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        Ok(truncate_chars(
            &String::from_utf8_lossy(&bytes),
            MAX_SOURCE_CHARS,
        ))
    }

    fn is_available(&self) -> bool {
        self.root.as_ref().is_some_and(|root| root.is_dir())
    }
}

/// Depth-first search for `<query>.rst` or `<query>.txt`, visiting entries in
/// name order so the pick is stable.
fn find_doc(dir: &Path, query: &str) -> Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("read dir {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("list {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().context("read entry type")?;
        if file_type.is_dir() {
            if let Some(found) = find_doc(&path, query)? {
                return Ok(Some(found));
            }
        } else if file_type.is_file() && is_doc_for(&path, query) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn is_doc_for(path: &Path, query: &str) -> bool {
    let stem_matches = path.file_stem().and_then(|stem| stem.to_str()) == Some(query);
    let ext_matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOC_EXTENSIONS.contains(&ext));
    stem_matches && ext_matches
}
