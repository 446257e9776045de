//! Input options for dependency scans and output rendering.
//!
//! Everything that controls a scan is carried in these values and passed in
//! explicitly, so independent scans never share configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::path::DepPath;

/// How far to follow include directives from each root file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDepth {
    /// Full transitive closure
    #[default]
    Full,
    /// Only the files a root includes directly
    Immediate,
    /// The include directives themselves, not resolved to files
    Unresolved,
}

/// Options for scanning root files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Search path, searched in order
    pub include_dirs: Vec<DepPath>,
    /// How far to follow includes
    pub depth: ScanDepth,
    /// Record diagnostics for unresolved and computed includes
    pub warn: bool,
}

impl ScanOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory to the search path.
    pub fn include_dir(mut self, dir: impl Into<DepPath>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// Append several directories to the search path.
    pub fn include_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<DepPath>,
    {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Set the scan depth.
    pub fn depth(mut self, depth: ScanDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Enable or disable diagnostics.
    pub fn warn(mut self, warn: bool) -> Self {
        self.warn = warn;
        self
    }
}

/// One column of a statistics line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsField {
    /// `F`: source file name
    File,
    /// `B`: source file size in bytes
    Bytes,
    /// `L`: source file size in lines
    Lines,
    /// `S`: source file score
    Score,
    /// `n`: number of dependencies
    Count,
    /// `b`: total bytes in dependencies
    TotalBytes,
    /// `l`: total lines in dependencies
    TotalLines,
    /// `s`: total score of dependencies
    TotalScore,
}

impl StatsField {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'F' => StatsField::File,
            'B' => StatsField::Bytes,
            'L' => StatsField::Lines,
            'S' => StatsField::Score,
            'n' => StatsField::Count,
            'b' => StatsField::TotalBytes,
            'l' => StatsField::TotalLines,
            's' => StatsField::TotalScore,
            _ => return None,
        })
    }
}

/// Field selection and delimiter for statistics output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsFields {
    pub delimiter: char,
    pub fields: Vec<StatsField>,
    /// Letters that named no field; reported and skipped
    #[serde(skip)]
    pub unknown: Vec<char>,
}

impl StatsFields {
    pub const DEFAULT_FIELDS: &'static str = "FBLnbls";
}

impl Default for StatsFields {
    fn default() -> Self {
        Self::from_str("").unwrap_or_else(|e| match e {})
    }
}

impl FromStr for StatsFields {
    type Err = std::convert::Infallible;

    /// Parse `[<delimiter>]<fields>`.
    ///
    /// A leading non-alphanumeric character is the delimiter (default
    /// space). An empty field list selects `FBLnbls`.
    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let mut delimiter = ' ';
        let mut letters = arg;
        if let Some(first) = arg.chars().next() {
            if !first.is_ascii_alphanumeric() {
                delimiter = first;
                letters = &arg[first.len_utf8()..];
            }
        }
        if letters.is_empty() {
            letters = Self::DEFAULT_FIELDS;
        }

        let mut fields = Vec::new();
        let mut unknown = Vec::new();
        for c in letters.chars() {
            match StatsField::from_char(c) {
                Some(field) => fields.push(field),
                None => unknown.push(c),
            }
        }

        Ok(Self {
            delimiter,
            fields,
            unknown,
        })
    }
}

/// Output format for scan results.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// `object: dependency` lines
    Make,
    /// Like `Make`, preceded by an empty rule for each dependency
    #[default]
    MakePlus,
    /// Dependencies only, one per line
    List,
    /// One statistics line per root
    Stats(StatsFields),
    /// Structured JSON
    Json,
}

/// Left-hand side of generated make rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectName {
    /// The source file itself
    #[default]
    Source,
    /// A fixed object name
    File(String),
    /// A directory prefix; the object is `<prefix><stem>.o`
    Dir(String),
}

impl ObjectName {
    /// Parse an object argument: a trailing `/` denotes a directory.
    pub fn parse(arg: &str) -> Self {
        if arg.ends_with('/') {
            ObjectName::Dir(arg.to_string())
        } else {
            ObjectName::File(arg.to_string())
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectName::Source => write!(f, "(source)"),
            ObjectName::File(name) | ObjectName::Dir(name) => write!(f, "{name}"),
        }
    }
}

/// Options for rendering scan results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub object: ObjectName,
    /// Reduce object names to their final path component
    pub strip_path: bool,
}

impl OutputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the object name rule.
    pub fn object(mut self, object: ObjectName) -> Self {
        self.object = object;
        self
    }

    /// Enable or disable path stripping of object names.
    pub fn strip_path(mut self, strip: bool) -> Self {
        self.strip_path = strip;
        self
    }
}
