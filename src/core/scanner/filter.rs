//! Extension filtering for cache artifacts.

use std::collections::HashSet;
use std::path::Path;

/// Matches files by extension, case-insensitively
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: HashSet<String>,
}

impl ExtensionFilter {
    /// Filter for the files earlier stages write into the cache
    pub fn cache_artifacts() -> Self {
        Self::with_extensions(["jpg", "jpeg", "png"])
    }

    /// Filter accepting exactly the given extensions (without dots)
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Check whether a path carries one of the accepted extensions
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::cache_artifacts()
    }
}
