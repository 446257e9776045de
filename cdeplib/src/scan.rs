//! High-level scanning API.
//!
//! [`scan_files`] runs every root through one [`Deps`] so caches are shared
//! across roots, and returns only once all of them succeeded.

use serde::Serialize;

use crate::deps::{CacheCounters, Deps, Diagnostic};
use crate::options::{ScanDepth, ScanOptions};
use crate::path::DepPath;
use crate::score::{DepStats, ScoreCache};
use crate::Result;

/// Dependencies of one root file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileDeps {
    pub file: DepPath,
    /// Resolved paths, or raw directives for [`ScanDepth::Unresolved`]
    pub deps: Vec<DepPath>,
}

/// Result of scanning a set of root files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub depth: ScanDepth,
    /// One entry per root, in the order given
    pub files: Vec<FileDeps>,
    /// Recoverable problems, only collected when warnings are enabled
    pub diagnostics: Vec<Diagnostic>,
    pub counters: CacheCounters,
}

impl ScanResult {
    /// Size statistics for every root over its dependency set.
    pub fn stats(&self) -> Result<Vec<DepStats>> {
        let mut cache = ScoreCache::new();
        self.files
            .iter()
            .map(|f| cache.stats(&f.file, &f.deps))
            .collect()
    }
}

/// Scan root files.
///
/// # Example
///
/// ```rust
/// use cdeplib::{scan_files, ScanOptions};
/// use std::fs;
/// use tempfile::tempdir;
///
/// let dir = tempdir().unwrap();
/// let main = dir.path().join("main.c");
/// fs::write(&main, "#include \"util.h\"\n").unwrap();
/// fs::write(dir.path().join("util.h"), "int util(void);\n").unwrap();
///
/// let result = scan_files([main], ScanOptions::new()).unwrap();
/// assert_eq!(result.files[0].deps.len(), 1);
/// assert!(result.files[0].deps[0].as_bytes().ends_with(b"util.h"));
/// ```
pub fn scan_files<I, S>(roots: I, options: ScanOptions) -> Result<ScanResult>
where
    I: IntoIterator<Item = S>,
    S: Into<DepPath>,
{
    let depth = options.depth;
    let mut deps = Deps::new(options);
    let mut files = Vec::new();

    for root in roots {
        let file = root.into();
        let found = deps.dependencies(&file)?;
        files.push(FileDeps { file, deps: found });
    }

    Ok(ScanResult {
        depth,
        files,
        diagnostics: deps.take_diagnostics(),
        counters: deps.counters(),
    })
}
