//! # cdeplib
//!
//! A conservative include dependency scanner for C-family sources.
//!
//! ## Overview
//!
//! Given root source files and an ordered include search path, cdeplib finds
//! every file textually reachable through `#include` directives. It reads
//! raw text and does not preprocess: `#ifdef` branches are all followed and
//! macros are never expanded. The dependency sets it produces may be larger
//! than what a particular build really uses, never smaller.
//!
//! - **Line reading**: chunked, restartable, byte-oriented ([`LineReader`])
//! - **Directive scanning**: `#include <...>` / `#include "..."` ([`scan_include`])
//! - **Resolution**: parent-relative lookup, then the search path, cached ([`Deps`])
//! - **Closure**: breadth-first transitive expansion, each file scanned once
//! - **Statistics**: line, byte and comment-aware code counts ([`ScoreCache`])
//!
//! ## Example
//!
//! ```rust
//! use cdeplib::{render, scan_files, OutputFormat, OutputOptions, ScanOptions};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! fs::create_dir(dir.path().join("inc")).unwrap();
//! fs::write(dir.path().join("main.c"), "#include <api.h>\nint main;\n").unwrap();
//! fs::write(dir.path().join("inc/api.h"), "#include \"types.h\"\n").unwrap();
//! fs::write(dir.path().join("inc/types.h"), "typedef int id;\n").unwrap();
//!
//! let main = dir.path().join("main.c");
//! let inc = dir.path().join("inc");
//!
//! let result = scan_files([main], ScanOptions::new().include_dir(inc)).unwrap();
//! assert_eq!(result.files[0].deps.len(), 2);
//!
//! let out = render(&result, &OutputOptions::new().format(OutputFormat::List)).unwrap();
//! assert!(out.ends_with(b"inc/types.h\n"));
//! ```

pub mod deps;
pub mod error;
pub mod list;
pub mod options;
pub mod output;
pub mod path;
pub mod reader;
pub mod scan;
pub mod scanner;
pub mod score;
pub mod source;

pub use deps::{read_include_lines, CacheCounters, Deps, Diagnostic};
pub use error::{CdepError, Malformed};
pub use list::DepList;
pub use options::{
    ObjectName, OutputFormat, OutputOptions, ScanDepth, ScanOptions, StatsField, StatsFields,
};
pub use output::{object_name, render};
pub use path::DepPath;
pub use reader::LineReader;
pub use scan::{scan_files, FileDeps, ScanResult};
pub use scanner::{scan_include, Directive, IncludeRef};
pub use score::{score_file, DepStats, Score, ScoreCache};
pub use source::{
    discover_sources, existing_files, expand_roots, read_include_dirs, read_path_list,
    read_source_list, FilterConfig, SourceList,
};

/// Result type for cdeplib operations
pub type Result<T> = std::result::Result<T, CdepError>;
