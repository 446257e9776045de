//! Size and complexity statistics for source files.

use std::io::Read;
use std::ops::{Add, AddAssign};

use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::path::{file_size, DepPath};
use crate::reader::{is_white, LineReader};
use crate::Result;

/// Size figures for one file (or a sum over several).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Number of lines
    pub lines: u64,
    /// Number of bytes
    pub bytes: u64,
    /// Lines with something other than whitespace and comments
    pub code: u64,
}

impl Add for Score {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            lines: self.lines + other.lines,
            bytes: self.bytes + other.bytes,
            code: self.code + other.code,
        }
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Count lines and code lines from a reader.
///
/// `bytes` is left at zero; it comes from the file size, not from the
/// text. Block comments carry over line ends; a line where a block comment
/// closes only counts if the comment also opened there or the line had no
/// code before the comment started.
pub fn score_reader<R: Read>(reader: &mut LineReader<R>) -> Result<Score> {
    let mut score = Score::default();
    let mut in_comment = false;
    let mut blank = true;

    while let Some(line) = reader.next_line()? {
        score.lines += 1;
        if !in_comment {
            blank = true;
        }

        let mut i = 0;
        while i < line.len() {
            if in_comment {
                match line[i..].windows(2).position(|w| w == b"*/") {
                    Some(offset) => {
                        in_comment = false;
                        i += offset + 2;
                    }
                    None => i = line.len(),
                }
                continue;
            }

            while i < line.len() && is_white(line[i]) {
                i += 1;
            }
            match &line[i..] {
                [] => {}
                [b'/', b'*', ..] => {
                    in_comment = true;
                    i += 2;
                }
                [b'/', b'/', ..] => break,
                _ => {
                    if blank {
                        blank = false;
                        score.code += 1;
                    }
                    i += 1;
                }
            }
        }
    }

    Ok(score)
}

/// Score a file. A file that cannot be opened scores zero.
pub fn score_file(path: &DepPath) -> Result<Score> {
    let mut score = match LineReader::open(path.to_path(), false) {
        Ok(mut reader) => score_reader(&mut reader)?,
        Err(e) => {
            debug!("cannot score {path}: {e}");
            Score::default()
        }
    };
    score.bytes = file_size(path.as_bytes());
    Ok(score)
}

/// Statistics for a root file and its dependency set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepStats {
    pub file: DepPath,
    /// The root file's own figures
    pub own: Score,
    /// Number of dependencies
    pub count: u64,
    /// Sum over the dependencies
    pub total: Score,
}

/// Per-path cache of file scores.
#[derive(Debug, Default)]
pub struct ScoreCache {
    scores: FxHashMap<DepPath, Score>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score `path`, scanning it only the first time.
    pub fn get(&mut self, path: &DepPath) -> Result<Score> {
        if let Some(score) = self.scores.get(path) {
            return Ok(*score);
        }
        let score = score_file(path)?;
        self.scores.insert(path.clone(), score);
        Ok(score)
    }

    /// Aggregate statistics for `file` over its dependencies.
    pub fn stats<'a>(
        &mut self,
        file: &DepPath,
        deps: impl IntoIterator<Item = &'a DepPath>,
    ) -> Result<DepStats> {
        let mut stats = DepStats {
            file: file.clone(),
            ..DepStats::default()
        };
        for dep in deps {
            stats.total += self.get(dep)?;
            stats.count += 1;
        }
        stats.own = self.get(file)?;
        Ok(stats)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn score(text: &str) -> Score {
        score_reader(&mut LineReader::from_bytes(text)).unwrap()
    }

    #[test]
    fn comments_and_blank_lines() {
        let text = "// line comment\n\n/* block\n   comment */\n\nint x;\n\n";
        let s = score(text);
        assert_eq!(s.code, 1);
        assert_eq!(s.lines, 7);
    }

    #[test]
    fn blank_lines_do_not_change_score() {
        let sparse = "// c\n\n\n/* a\n b */\n\n\nint x;\n\n\n";
        let dense = "// c\n/* a\n b */\nint x;\n";
        assert_eq!(score(sparse).code, 1);
        assert_eq!(score(dense).code, 1);
    }

    #[test]
    fn code_counts_once_per_line() {
        assert_eq!(score("int a; int b; int c;\n").code, 1);
        assert_eq!(score("a\nb\n  c\n").code, 3);
    }

    #[test]
    fn code_around_comments() {
        assert_eq!(score("int a; // trailing\n").code, 1);
        assert_eq!(score("/* lead */ int a;\n").code, 1);
        assert_eq!(score("/* only */\n").code, 0);
        assert_eq!(score("/* a */ /* b */\n").code, 0);
        assert_eq!(score("x / y;\n").code, 1);
    }

    #[test]
    fn code_after_multiline_comment_close() {
        // the comment opened on a blank line, so the closing line counts
        assert_eq!(score("/* start\n end */ int a;\n").code, 1);
        // the comment opened after code; that line already counted
        assert_eq!(score("int a; /* start\n end */ int b;\n").code, 1);
    }

    #[test]
    fn unterminated_comment() {
        let s = score("int a;\n/* never\nclosed\n");
        assert_eq!(s.code, 1);
        assert_eq!(s.lines, 3);
    }

    #[test]
    fn file_score_includes_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.c");
        fs::write(&path, "int a;\n\n// c\n").unwrap();

        let s = score_file(&DepPath::from(path)).unwrap();
        assert_eq!(
            s,
            Score {
                lines: 3,
                bytes: 13,
                code: 1
            }
        );
    }

    #[test]
    fn missing_file_scores_zero() {
        let dir = tempdir().unwrap();
        let s = score_file(&DepPath::from(dir.path().join("gone.c"))).unwrap();
        assert_eq!(s, Score::default());
    }

    #[test]
    fn cache_aggregates_dependencies() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("main.c");
        let a = dir.path().join("a.h");
        let b = dir.path().join("b.h");
        fs::write(&main, "int main;\n").unwrap();
        fs::write(&a, "int a;\nint aa;\n").unwrap();
        fs::write(&b, "/* b */\n").unwrap();

        let main = DepPath::from(main);
        let a = DepPath::from(a);
        let b = DepPath::from(b);

        let mut cache = ScoreCache::new();
        let stats = cache.stats(&main, [&a, &b]).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(
            stats.own,
            Score {
                lines: 1,
                bytes: 10,
                code: 1
            }
        );
        assert_eq!(
            stats.total,
            Score {
                lines: 3,
                bytes: 23,
                code: 2
            }
        );
        assert_eq!(cache.len(), 3);

        cache.stats(&b, [&a]).unwrap();
        assert_eq!(cache.len(), 3);
    }
}
