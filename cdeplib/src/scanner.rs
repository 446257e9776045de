//! Include directive recognition on raw source lines.
//!
//! This is a literal scan, not a preprocessor: conditional compilation is
//! ignored and macros are never expanded, so every `#include` line found in
//! a file counts, whether or not it would be compiled.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::Malformed;
use crate::reader::is_white;

/// A textual include reference, as written between its delimiters.
///
/// Names are kept as raw bytes; they are decoded only for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IncludeRef {
    /// `#include "name"`: looked up next to the including file first
    Quoted(Vec<u8>),
    /// `#include <name>`: looked up on the search path only
    Angle(Vec<u8>),
}

impl IncludeRef {
    /// The reference without delimiters.
    pub fn name(&self) -> &[u8] {
        match self {
            IncludeRef::Quoted(name) | IncludeRef::Angle(name) => name,
        }
    }

    /// Check if this is a `"..."` reference
    pub fn is_quoted(&self) -> bool {
        matches!(self, IncludeRef::Quoted(_))
    }

    /// The reference with its delimiters, as written in the source.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (open, close) = if self.is_quoted() {
            (b'"', b'"')
        } else {
            (b'<', b'>')
        };
        let mut bytes = Vec::with_capacity(self.name().len() + 2);
        bytes.push(open);
        bytes.extend_from_slice(self.name());
        bytes.push(close);
        bytes
    }
}

impl fmt::Display for IncludeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl Serialize for IncludeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = if self.is_quoted() { "quoted" } else { "angle" };
        let mut state = serializer.serialize_struct("IncludeRef", 2)?;
        state.serialize_field("kind", kind)?;
        state.serialize_field("name", &String::from_utf8_lossy(self.name()))?;
        state.end()
    }
}

/// What a line that starts with `#include` turned out to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// A `<...>` or `"..."` reference
    Include(IncludeRef),
    /// Something else, e.g. `#include SYMBOL`; cannot be followed
    Computed,
}

fn skip_white(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|&b| !is_white(b)).unwrap_or(line.len());
    &line[start..]
}

/// Recognize an include directive on one line.
///
/// Whitespace is allowed before the `#` and between `#` and `include`.
/// Returns `Ok(None)` for lines that are not include directives at all.
/// The word after `#` is only prefix-matched, so `#include_next <x>` is
/// read as an include of `x`.
pub fn scan_include(line: &[u8]) -> Result<Option<Directive>, Malformed> {
    let rest = skip_white(line);
    let Some(rest) = rest.strip_prefix(b"#") else {
        return Ok(None);
    };
    let Some(rest) = skip_white(rest).strip_prefix(b"include") else {
        return Ok(None);
    };
    let rest = skip_white(rest);

    let (quoted, close) = match rest.first() {
        Some(b'"') => (true, b'"'),
        Some(b'<') => (false, b'>'),
        _ => return Ok(Some(Directive::Computed)),
    };

    let body = &rest[1..];
    let len = body
        .iter()
        .position(|&b| b == close)
        .ok_or(Malformed::Unterminated)?;
    if len == 0 {
        return Err(Malformed::Empty);
    }

    let name = body[..len].to_vec();
    let include = if quoted {
        IncludeRef::Quoted(name)
    } else {
        IncludeRef::Angle(name)
    };
    Ok(Some(Directive::Include(include)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn include(line: &str) -> Option<IncludeRef> {
        match scan_include(line.as_bytes()).unwrap() {
            Some(Directive::Include(include)) => Some(include),
            _ => None,
        }
    }

    #[test]
    fn quoted_include() {
        assert_eq!(
            include("#include \"foo.h\""),
            Some(IncludeRef::Quoted("foo.h".into()))
        );
    }

    #[test]
    fn angle_include_with_interior_whitespace() {
        assert_eq!(
            include("\t   #   include <xxx.h>"),
            Some(IncludeRef::Angle("xxx.h".into()))
        );
        assert_eq!(
            include("#include<sys/types.h>  // stat"),
            Some(IncludeRef::Angle("sys/types.h".into()))
        );
    }

    #[test]
    fn non_directives() {
        assert_eq!(scan_include(b"   #   includ <>"), Ok(None));
        assert_eq!(scan_include(b"int x = 1;"), Ok(None));
        assert_eq!(scan_include(b"#define FOO 1"), Ok(None));
        assert_eq!(scan_include(b"// #include <commented.h>"), Ok(None));
        assert_eq!(scan_include(b""), Ok(None));
    }

    #[test]
    fn computed_include() {
        assert_eq!(
            scan_include(b"#include CONFIG_HEADER"),
            Ok(Some(Directive::Computed))
        );
        assert_eq!(scan_include(b"#include"), Ok(Some(Directive::Computed)));
    }

    #[test]
    fn malformed_includes() {
        assert_eq!(scan_include(b"#include <stdio.h"), Err(Malformed::Unterminated));
        assert_eq!(scan_include(b"#include \"util.h"), Err(Malformed::Unterminated));
        assert_eq!(scan_include(b"#include <>"), Err(Malformed::Empty));
        assert_eq!(scan_include(b"#include \"\""), Err(Malformed::Empty));
    }

    #[test]
    fn display_restores_delimiters() {
        assert_eq!(IncludeRef::Quoted("a.h".into()).to_string(), "\"a.h\"");
        assert_eq!(IncludeRef::Angle("b.h".into()).to_string(), "<b.h>");
        assert_eq!(IncludeRef::Angle("b.h".into()).name(), b"b.h");
        assert!(IncludeRef::Quoted("a.h".into()).is_quoted());
        assert_eq!(IncludeRef::Angle("b.h".into()).to_bytes(), b"<b.h>");
    }

    #[test]
    fn non_utf8_names_are_kept_verbatim() {
        assert_eq!(
            scan_include(b"#include \"caf\xe9.h\""),
            Ok(Some(Directive::Include(IncludeRef::Quoted(
                b"caf\xe9.h".to_vec()
            ))))
        );
    }

    #[test]
    fn serializes_kind_and_name() {
        let json = serde_json::to_value(IncludeRef::Angle("x.h".into())).unwrap();
        assert_eq!(json["kind"], "angle");
        assert_eq!(json["name"], "x.h");
    }
}
