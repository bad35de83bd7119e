//! Include resolution – locate named input documents on disk.

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Result for include resolution: which names were found (with path) and
/// which were not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeLookupResult {
    pub found: Vec<(String, Utf8PathBuf)>,
    pub not_found: Vec<String>,
}

/// Resolver that searches for `NAME.json` files under an ordered list of
/// directories, recursively (first match wins).
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    search_paths: Vec<Utf8PathBuf>,
}

impl IncludeResolver {
    /// Create a resolver that will search the provided directories in order.
    pub fn new<P: AsRef<Utf8Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            search_paths: paths
                .into_iter()
                .map(|p| p.as_ref().to_path_buf())
                .collect(),
        }
    }

    /// Locate the given include names (e.g. `borehole`) by looking for
    /// `borehole.json` under the configured search paths.
    pub fn locate<'a, I>(&self, names: I) -> IncludeLookupResult
    where
        I: IntoIterator<Item = &'a str>,
    {
        use std::collections::HashSet;
        let mut found = Vec::new();
        let mut not_found = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for name in names {
            let name = name.trim();
            if name.is_empty() || !seen.insert(name.to_string()) {
                continue;
            }
            let file_name = format!("{}.json", name);
            let mut matched: Option<Utf8PathBuf> = None;
            'dirs: for dir in &self.search_paths {
                for entry in WalkDir::new(dir.as_std_path())
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                {
                    if entry.file_type().is_file()
                        && entry.file_name().to_str() == Some(file_name.as_str())
                    {
                        if let Ok(p) = Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) {
                            matched = Some(p);
                            break 'dirs;
                        }
                    }
                }
            }
            if let Some(p) = matched {
                found.push((name.to_string(), p));
            } else {
                not_found.push(name.to_string());
            }
        }
        IncludeLookupResult { found, not_found }
    }
}
