//! Include resolution and dependency closure.
//!
//! [`Deps`] owns the search path and every cache built during a run:
//!
//! - search results: include name -> resolved path (or not found)
//! - scanned files: resolved path -> its immediate includes
//! - back references: resolved path -> the first file seen including it
//!
//! Caches are filled lazily and never invalidated; the scanned tree is
//! assumed not to change during a run.

use std::fmt;
use std::io::Read;

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::error::CdepError;
use crate::list::DepList;
use crate::options::{ScanDepth, ScanOptions};
use crate::path::{file_exists, join, normalize, split_dir, DepPath};
use crate::reader::LineReader;
use crate::scanner::{scan_include, Directive, IncludeRef};
use crate::Result;

/// A recoverable problem found while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An include that matched no file
    NotFound {
        include: IncludeRef,
        /// The including file, then whoever included it, and so on
        included_by: Vec<DepPath>,
    },
    /// An include directive without a `<...>` or `"..."` reference
    NotUnderstood { file: DepPath, line: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NotFound {
                include,
                included_by,
            } => {
                write!(f, "NOT FOUND: {include}")?;
                for file in included_by {
                    write!(f, "\n  Included by: {file}")?;
                }
                Ok(())
            }
            Diagnostic::NotUnderstood { file, line } => {
                write!(f, "NOT UNDERSTOOD: {line} (in {file})")
            }
        }
    }
}

/// Counters for cache behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    /// Filesystem existence checks
    pub file_checks: u64,
    /// Search-path lookups answered from the cache
    pub search_hits: u64,
    /// Files read for include directives
    pub scans: u64,
}

/// Read every include directive from `reader`.
///
/// Computed includes are passed to `on_computed` along with the line text.
pub fn read_include_lines<R: Read>(
    reader: &mut LineReader<R>,
    mut on_computed: impl FnMut(&str),
) -> Result<Vec<IncludeRef>> {
    let mut includes = Vec::new();
    while let Some(line) = reader.next_line()? {
        match scan_include(line) {
            Ok(Some(Directive::Include(include))) => {
                trace!("directive {include}");
                includes.push(include);
            }
            Ok(Some(Directive::Computed)) => on_computed(&String::from_utf8_lossy(line)),
            Ok(None) => {}
            Err(reason) => {
                let text = String::from_utf8_lossy(line).into_owned();
                let origin = reader
                    .origin()
                    .map_or_else(|| "<buffer>".to_string(), |p| p.display().to_string());
                return Err(CdepError::InvalidInclude {
                    origin,
                    text,
                    reason,
                });
            }
        }
    }
    Ok(includes)
}

/// Resolver cache and closure engine.
#[derive(Debug, Default)]
pub struct Deps {
    options: ScanOptions,
    search_cache: FxHashMap<Vec<u8>, Option<DepPath>>,
    include_cache: FxHashMap<DepPath, DepList>,
    included_by: FxHashMap<DepPath, DepPath>,
    diagnostics: Vec<Diagnostic>,
    counters: CacheCounters,
}

impl Deps {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take the diagnostics recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn check_exists(&mut self, path: &[u8]) -> bool {
        self.counters.file_checks += 1;
        file_exists(path)
    }

    /// Find the file an include refers to.
    ///
    /// Quoted includes are first tried relative to `parent_dir`; that result
    /// depends on the including file and is not cached. Otherwise the search
    /// path is tried in order and the outcome, hit or miss, is cached under
    /// the bare include name.
    pub fn resolve_include(
        &mut self,
        include: &IncludeRef,
        parent_dir: Option<&[u8]>,
    ) -> Option<DepPath> {
        let name = include.name();

        if include.is_quoted() {
            let local = join(parent_dir, name);
            if self.check_exists(&local) {
                return Some(DepPath::new(normalize(&local)));
            }
        }

        if let Some(found) = self.search_cache.get(name) {
            self.counters.search_hits += 1;
            return found.clone();
        }

        let mut found = None;
        for i in 0..self.options.include_dirs.len() {
            let candidate = join(Some(self.options.include_dirs[i].as_bytes()), name);
            if self.check_exists(&candidate) {
                found = Some(DepPath::new(normalize(&candidate)));
                break;
            }
        }
        debug!("search path lookup {include} -> {found:?}");
        self.search_cache.insert(name.to_vec(), found.clone());
        found
    }

    /// Read the raw include directives of a file.
    ///
    /// A file that cannot be opened is an error when `required`, and
    /// otherwise yields `None`.
    pub fn read_includes(
        &mut self,
        file: &DepPath,
        required: bool,
    ) -> Result<Option<Vec<IncludeRef>>> {
        let path = file.to_path();
        let mut reader = match LineReader::open(&path, true) {
            Ok(reader) => reader,
            Err(e) if required => {
                debug!("cannot open {file}: {e}");
                return Err(CdepError::CannotRead(path.into_owned()));
            }
            Err(_) => return Ok(None),
        };

        self.counters.scans += 1;
        let warn = self.options.warn;
        let mut computed = Vec::new();
        let includes = read_include_lines(&mut reader, |line| {
            if warn {
                computed.push(line.to_string());
            }
        })?;

        self.diagnostics
            .extend(computed.into_iter().map(|line| Diagnostic::NotUnderstood {
                file: file.clone(),
                line,
            }));
        Ok(Some(includes))
    }

    /// Resolved files included directly by `file`, in directive order.
    ///
    /// Unresolvable includes are dropped (and reported when warnings are
    /// on). See [`Deps::read_includes`] for the meaning of `required`.
    pub fn immediate_includes(&mut self, file: &DepPath, required: bool) -> Result<&DepList> {
        if !self.include_cache.contains_key(file) {
            let list = self.scan_immediate(file, required)?;
            self.include_cache.insert(file.clone(), list);
        }
        Ok(&self.include_cache[file])
    }

    fn scan_immediate(&mut self, file: &DepPath, required: bool) -> Result<DepList> {
        debug!("scanning {file}");
        let dir = split_dir(file.as_bytes());
        let includes = self.read_includes(file, required)?.unwrap_or_default();

        let mut list = DepList::new();
        for include in includes {
            match self.resolve_include(&include, dir) {
                Some(path) => {
                    self.included_by
                        .entry(path.clone())
                        .or_insert_with(|| file.clone());
                    list.insert(path);
                }
                None if self.options.warn => {
                    let included_by = self.ancestry(file);
                    self.diagnostics.push(Diagnostic::NotFound {
                        include,
                        included_by,
                    });
                }
                None => {}
            }
        }
        Ok(list)
    }

    /// The chain of files that led to `file`, starting with `file` itself.
    ///
    /// Only the first recorded includer of each file is remembered, so this
    /// is one inclusion path, not all of them. Stops before repeating a
    /// file.
    pub fn ancestry(&self, file: &DepPath) -> Vec<DepPath> {
        let mut chain = vec![file.clone()];
        let mut seen = FxHashSet::default();
        seen.insert(file);
        let mut current = file;
        while let Some(parent) = self.included_by.get(current) {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Every file reachable from `file` through include directives.
    ///
    /// `file` must be readable. Files reached on the way may be missing;
    /// they simply contribute nothing. Each file is expanded once.
    pub fn closure(&mut self, file: &DepPath) -> Result<DepList> {
        let mut deps = self.immediate_includes(file, true)?.clone();

        let mut i = 0;
        while i < deps.len() {
            let member = deps[i].clone();
            deps.extend(self.immediate_includes(&member, false)?.iter().cloned());
            i += 1;
        }

        Ok(deps)
    }

    /// Dependencies of a root file at the configured depth.
    ///
    /// For [`ScanDepth::Unresolved`] the directives are returned as written,
    /// including delimiters and repeats.
    pub fn dependencies(&mut self, file: &DepPath) -> Result<Vec<DepPath>> {
        match self.options.depth {
            ScanDepth::Full => Ok(self.closure(file)?.into_vec()),
            ScanDepth::Immediate => Ok(self.immediate_includes(file, true)?.clone().into_vec()),
            ScanDepth::Unresolved => Ok(self
                .read_includes(file, true)?
                .unwrap_or_default()
                .iter()
                .map(|include| DepPath::new(include.to_bytes()))
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) -> DepPath {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        DepPath::from(path)
    }

    fn dir(root: &Path, rel: &str) -> DepPath {
        DepPath::from(root.join(rel))
    }

    #[test]
    fn read_lines_from_buffer() {
        let mut reader =
            LineReader::from_bytes("test\n#include <aa>\n  #include \"x\"\n\n").stripping(true);
        let includes = read_include_lines(&mut reader, |_| {}).unwrap();
        assert_eq!(
            includes,
            vec![IncludeRef::Angle("aa".into()), IncludeRef::Quoted("x".into())]
        );
    }

    #[test]
    fn read_lines_reports_computed() {
        let mut reader = LineReader::from_bytes("#include FOO\n#include <a.h>\n");
        let mut computed = Vec::new();
        let includes = read_include_lines(&mut reader, |line| computed.push(line.to_string()))
            .unwrap();
        assert_eq!(includes.len(), 1);
        assert_eq!(computed, vec!["#include FOO"]);
    }

    #[test]
    fn malformed_directive_is_fatal() {
        let tmp = tempdir().unwrap();
        let root = write(tmp.path(), "bad.c", "#include <stdio.h\n");
        let mut deps = Deps::new(ScanOptions::new());
        let err = deps.closure(&root).unwrap_err();
        assert!(matches!(err, CdepError::InvalidInclude { .. }));
    }

    #[test]
    fn closure_follows_includes() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.c", "#include \"b.h\"\n");
        let b = write(tmp.path(), "b.h", "#include \"c.h\"\n");
        let c = write(tmp.path(), "c.h", "int c;\n");

        let mut deps = Deps::new(ScanOptions::new());
        assert_eq!(deps.closure(&a).unwrap().into_vec(), vec![b.clone(), c]);

        let mut deps = Deps::new(ScanOptions::new().depth(ScanDepth::Immediate));
        assert_eq!(deps.dependencies(&a).unwrap(), vec![b]);
    }

    #[test]
    fn closure_is_breadth_first() {
        let tmp = tempdir().unwrap();
        let main = write(tmp.path(), "main.c", "#include \"a.h\"\n#include \"b.h\"\n");
        let a = write(tmp.path(), "a.h", "#include \"a2.h\"\n");
        let b = write(tmp.path(), "b.h", "#include \"a2.h\"\n#include \"b2.h\"\n");
        let a2 = write(tmp.path(), "a2.h", "");
        let b2 = write(tmp.path(), "b2.h", "");

        let mut deps = Deps::new(ScanOptions::new());
        assert_eq!(deps.closure(&main).unwrap().into_vec(), vec![a, b, a2, b2]);
    }

    #[test]
    fn cycles_terminate_without_duplicates() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.h", "#include \"b.h\"\n#include \"a.h\"\n");
        let b = write(tmp.path(), "b.h", "#include \"a.h\"\n#include \"b.h\"\n");

        let mut deps = Deps::new(ScanOptions::new());
        let closure = deps.closure(&a).unwrap().into_vec();
        assert_eq!(closure, vec![b, a]);
    }

    #[test]
    fn self_include_terminates() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "self.h", "#include \"self.h\"\n");

        let mut deps = Deps::new(ScanOptions::new());
        assert_eq!(deps.closure(&a).unwrap().into_vec(), vec![a]);
    }

    #[test]
    fn closure_leaves_immediate_cache_intact() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.c", "#include \"b.h\"\n");
        let b = write(tmp.path(), "b.h", "#include \"c.h\"\n");
        write(tmp.path(), "c.h", "");

        let mut deps = Deps::new(ScanOptions::new());
        assert_eq!(deps.closure(&a).unwrap().len(), 2);
        let immediate: Vec<&DepPath> = deps.immediate_includes(&a, true).unwrap().iter().collect();
        assert_eq!(immediate, vec![&b]);
    }

    #[test]
    fn quoted_include_prefers_parent_directory() {
        let tmp = tempdir().unwrap();
        let src = write(tmp.path(), "src/main.c", "#include \"config.h\"\n");
        let local = write(tmp.path(), "src/config.h", "");
        write(tmp.path(), "inc/config.h", "");

        let mut deps = Deps::new(ScanOptions::new().include_dir(dir(tmp.path(), "inc")));
        assert_eq!(deps.closure(&src).unwrap().into_vec(), vec![local]);
    }

    #[test]
    fn angle_include_skips_parent_directory() {
        let tmp = tempdir().unwrap();
        let src = write(tmp.path(), "src/main.c", "#include <config.h>\n");
        write(tmp.path(), "src/config.h", "");
        let sys = write(tmp.path(), "inc/config.h", "");

        let mut deps = Deps::new(ScanOptions::new().include_dir(dir(tmp.path(), "inc")));
        assert_eq!(deps.closure(&src).unwrap().into_vec(), vec![sys]);
    }

    #[test]
    fn search_path_order() {
        let tmp = tempdir().unwrap();
        let src = write(tmp.path(), "main.c", "#include <x.h>\n");
        write(tmp.path(), "second/x.h", "");
        let first = write(tmp.path(), "first/x.h", "");

        let options = ScanOptions::new()
            .include_dir(dir(tmp.path(), "missing"))
            .include_dir(dir(tmp.path(), "first"))
            .include_dir(dir(tmp.path(), "second"));
        let mut deps = Deps::new(options);
        assert_eq!(deps.closure(&src).unwrap().into_vec(), vec![first]);
    }

    #[test]
    fn resolved_paths_are_normalized() {
        let tmp = tempdir().unwrap();
        let src = write(tmp.path(), "src/main.c", "#include \"../inc/./a.h\"\n");
        let a = write(tmp.path(), "inc/a.h", "");

        let mut deps = Deps::new(ScanOptions::new());
        assert_eq!(deps.closure(&src).unwrap().into_vec(), vec![a]);
    }

    #[test]
    fn search_results_are_cached() {
        let tmp = tempdir().unwrap();
        let one = write(tmp.path(), "one/a.c", "#include \"common.h\"\n");
        let two = write(tmp.path(), "two/b.c", "#include \"common.h\"\n");
        let common = write(tmp.path(), "inc/common.h", "");

        let mut deps = Deps::new(ScanOptions::new().include_dir(dir(tmp.path(), "inc")));
        assert_eq!(deps.closure(&one).unwrap().into_vec(), vec![common.clone()]);
        let after_first = deps.counters();
        assert_eq!(deps.closure(&two).unwrap().into_vec(), vec![common]);
        let after_second = deps.counters();

        // second root: one local check, then the cached search result
        assert_eq!(after_second.file_checks - after_first.file_checks, 1);
        assert_eq!(after_second.search_hits, 1);
    }

    #[test]
    fn misses_are_cached() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.c", "#include <gone.h>\n");
        let b = write(tmp.path(), "b.c", "#include <gone.h>\n");

        let mut deps = Deps::new(ScanOptions::new().include_dir(dir(tmp.path(), "inc")));
        assert!(deps.closure(&a).unwrap().is_empty());
        let checks = deps.counters().file_checks;
        assert!(deps.closure(&b).unwrap().is_empty());
        assert_eq!(deps.counters().file_checks, checks);
    }

    #[test]
    fn files_are_scanned_once() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.c", "#include \"common.h\"\n");
        let b = write(tmp.path(), "b.c", "#include \"common.h\"\n");
        write(tmp.path(), "common.h", "#include \"leaf.h\"\n");
        write(tmp.path(), "leaf.h", "");

        let mut deps = Deps::new(ScanOptions::new());
        deps.closure(&a).unwrap();
        assert_eq!(deps.counters().scans, 3);
        deps.closure(&b).unwrap();
        assert_eq!(deps.counters().scans, 4);
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = tempdir().unwrap();
        let mut deps = Deps::new(ScanOptions::new());
        let err = deps.closure(&dir(tmp.path(), "nope.c")).unwrap_err();
        assert!(matches!(err, CdepError::CannotRead(_)));
    }

    #[test]
    fn missing_transitive_file_is_empty() {
        let mut deps = Deps::new(ScanOptions::new());
        let missing = DepPath::from("/no/such/dir/x.h");
        let list = deps.immediate_includes(&missing, false).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn unresolved_includes_are_dropped_silently() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.c", "#include <nowhere.h>\n#include \"b.h\"\n");
        let b = write(tmp.path(), "b.h", "");

        let mut deps = Deps::new(ScanOptions::new());
        assert_eq!(deps.closure(&a).unwrap().into_vec(), vec![b]);
        assert!(deps.diagnostics().is_empty());
    }

    #[test]
    fn not_found_reports_ancestry() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.c", "#include \"b.h\"\n");
        let b = write(tmp.path(), "b.h", "#include \"c.h\"\n");
        let c = write(tmp.path(), "c.h", "#include <missing.h>\n#include SYMBOL\n");

        let mut deps = Deps::new(ScanOptions::new().warn(true));
        deps.closure(&a).unwrap();

        let diagnostics = deps.take_diagnostics();
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::NotUnderstood {
                    file: c.clone(),
                    line: "#include SYMBOL".into(),
                },
                Diagnostic::NotFound {
                    include: IncludeRef::Angle("missing.h".into()),
                    included_by: vec![c, b, a],
                },
            ]
        );
        assert!(deps.diagnostics().is_empty());
    }

    #[test]
    fn first_includer_wins() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.c", "#include \"x.h\"\n#include \"y.h\"\n");
        write(tmp.path(), "x.h", "#include \"z.h\"\n");
        write(tmp.path(), "y.h", "#include \"z.h\"\n");
        let z = write(tmp.path(), "z.h", "");

        let mut deps = Deps::new(ScanOptions::new());
        deps.closure(&a).unwrap();
        assert_eq!(deps.ancestry(&z), vec![z.clone(), dir(tmp.path(), "x.h"), a]);
    }

    #[test]
    fn ancestry_stops_on_cycles() {
        let tmp = tempdir().unwrap();
        let a = write(tmp.path(), "a.h", "#include \"b.h\"\n");
        let b = write(tmp.path(), "b.h", "#include \"a.h\"\n");

        let mut deps = Deps::new(ScanOptions::new());
        deps.closure(&a).unwrap();
        assert_eq!(deps.ancestry(&b), vec![b.clone(), a]);
    }

    #[test]
    fn unresolved_depth_lists_directives() {
        let tmp = tempdir().unwrap();
        let a = write(
            tmp.path(),
            "a.c",
            "#include <stdio.h>\n#include \"a.h\"\n#include <stdio.h>\n",
        );

        let mut deps = Deps::new(ScanOptions::new().depth(ScanDepth::Unresolved));
        assert_eq!(
            deps.dependencies(&a).unwrap(),
            vec!["<stdio.h>", "\"a.h\"", "<stdio.h>"]
        );
    }

    #[test]
    fn diagnostic_display() {
        let diagnostic = Diagnostic::NotFound {
            include: IncludeRef::Quoted("x.h".into()),
            included_by: vec!["b.h".into(), "a.c".into()],
        };
        assert_eq!(
            diagnostic.to_string(),
            "NOT FOUND: \"x.h\"\n  Included by: b.h\n  Included by: a.c"
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_include_names_resolve() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempdir().unwrap();
        let header = tmp.path().join(OsStr::from_bytes(b"caf\xe9.h"));
        fs::write(&header, "int cafe;\n").unwrap();
        let main = tmp.path().join("main.c");
        fs::write(&main, b"#include \"caf\xe9.h\"\n").unwrap();

        let mut deps = Deps::new(ScanOptions::new());
        let closure = deps.closure(&DepPath::from(main)).unwrap().into_vec();
        assert_eq!(closure, vec![DepPath::from(header)]);
        assert!(closure[0].as_bytes().ends_with(b"/caf\xe9.h"));
    }
}
