//! Root discovery: which files to scan and where to search.
//!
//! Roots come from the command line, from list files, or from walking a
//! directory for C-family sources filtered by glob patterns. Paths stay raw
//! bytes throughout; only glob matching looks at them as text.

use std::path::Path;

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::CdepError;
use crate::path::{file_exists, normalize, os_bytes, DepPath};
use crate::reader::{is_white, LineReader};
use crate::Result;

/// Extensions of files picked up when walking a directory.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++", "m", "mm"];

/// Configuration for file filtering.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Glob patterns to include (if empty, include all sources)
    pub include: Vec<Pattern>,
    /// Glob patterns to exclude
    pub exclude: Vec<Pattern>,
}

impl FilterConfig {
    /// Create a new empty filter config (includes all sources).
    pub fn new() -> Self {
        Self::default()
    }

    fn pattern(pattern: &str) -> Result<Pattern> {
        Pattern::new(pattern).map_err(|e| CdepError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.include.push(Self::pattern(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.exclude.push(Self::pattern(pattern)?);
        Ok(self)
    }

    /// Check if a path is a source file that passes the patterns.
    ///
    /// Excludes win over includes; no include patterns means everything
    /// not excluded passes.
    pub fn matches(&self, path: &Path) -> bool {
        let is_source = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
        if !is_source {
            return false;
        }

        let path_str = path.to_string_lossy();
        if self.exclude.iter().any(|p| p.matches(&path_str)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(&path_str))
    }
}

/// Find source files under `root`.
///
/// A file is returned as-is, without extension or pattern checks. A
/// directory is walked recursively, skipping hidden directories, and the
/// matching files are returned sorted.
pub fn discover_sources(root: impl AsRef<Path>, filter: &FilterConfig) -> Result<Vec<DepPath>> {
    let root = root.as_ref();

    if !root.exists() {
        return Err(CdepError::PathNotFound(root.to_path_buf()));
    }
    if root.is_file() {
        return Ok(vec![normalized(root)]);
    }

    let walker = WalkDir::new(root).follow_links(true).into_iter();
    let mut files = Vec::new();

    for entry in walker.filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !e.file_name().to_string_lossy().starts_with('.')
    }) {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.is_file() && filter.matches(path) {
            files.push(normalized(path));
        }
    }

    files.sort();
    Ok(files)
}

fn normalized(path: &Path) -> DepPath {
    DepPath::new(normalize(&os_bytes(path.as_os_str())))
}

/// Expand command-line roots: directories are walked, anything else is
/// kept verbatim for the scanner to open (or fail on).
pub fn expand_roots<I>(args: I, filter: &FilterConfig) -> Result<Vec<DepPath>>
where
    I: IntoIterator,
    I::Item: Into<DepPath>,
{
    let mut roots = Vec::new();
    for arg in args {
        let arg = arg.into();
        if arg.to_path().is_dir() {
            roots.extend(discover_sources(arg.to_path(), filter)?);
        } else {
            roots.push(arg);
        }
    }
    Ok(roots)
}

/// The paths that name existing files, in the order given.
pub fn existing_files<I>(paths: I) -> Vec<DepPath>
where
    I: IntoIterator,
    I::Item: Into<DepPath>,
{
    paths
        .into_iter()
        .map(Into::into)
        .filter(|path| file_exists(path.as_bytes()))
        .collect()
}

/// Roots and search directories read from a list file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    pub files: Vec<DepPath>,
    pub include_dirs: Vec<DepPath>,
}

fn trim(mut line: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = line {
        if !is_white(*first) {
            break;
        }
        line = rest;
    }
    while let [rest @ .., last] = line {
        if !is_white(*last) {
            break;
        }
        line = rest;
    }
    line
}

/// Read a list of paths, one per line. Lines are trimmed and empty lines
/// skipped.
pub fn read_path_list(path: impl AsRef<Path>) -> Result<Vec<DepPath>> {
    let path = path.as_ref();
    let mut reader = LineReader::open(path, false).map_err(|e| CdepError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut lines = Vec::new();
    while let Some(line) = reader.next_line()? {
        let line = trim(line);
        if !line.is_empty() {
            lines.push(DepPath::from(line));
        }
    }
    Ok(lines)
}

/// Read a file list: one root per line, `-I<dir>` lines add search
/// directories.
pub fn read_source_list(path: impl AsRef<Path>) -> Result<SourceList> {
    let mut list = SourceList::default();
    for line in read_path_list(path)? {
        match line.as_bytes().strip_prefix(b"-I") {
            Some(dir) => list.include_dirs.push(DepPath::from(trim(dir))),
            None => list.files.push(line),
        }
    }
    Ok(list)
}

/// Read a list of search directories, one per line.
pub fn read_include_dirs(path: impl AsRef<Path>) -> Result<Vec<DepPath>> {
    read_path_list(path)
}
