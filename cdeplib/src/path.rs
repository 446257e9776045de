//! Path byte-string helpers.
//!
//! Dependency paths are handled as `/`-separated byte strings rather than
//! [`std::path::PathBuf`] values: they are compared, hashed, and printed in
//! exactly the form they were composed in, and normalization is purely
//! textual (no symlink resolution, no filesystem access). Source files are
//! not required to name their headers in UTF-8, so nothing here decodes.

use std::borrow::{Borrow, Cow};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A file path as raw bytes.
///
/// Displayed and serialized lossily; everything else sees the exact bytes.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepPath(Vec<u8>);

impl DepPath {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        DepPath(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The path for filesystem calls.
    pub fn to_path(&self) -> Cow<'_, Path> {
        to_path(&self.0)
    }

    /// The path as text, with invalid UTF-8 replaced.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for DepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for DepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl Borrow<[u8]> for DepPath {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for DepPath {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for DepPath {
    fn from(bytes: Vec<u8>) -> Self {
        DepPath(bytes)
    }
}

impl From<&[u8]> for DepPath {
    fn from(bytes: &[u8]) -> Self {
        DepPath(bytes.to_vec())
    }
}

impl From<&str> for DepPath {
    fn from(s: &str) -> Self {
        DepPath(s.as_bytes().to_vec())
    }
}

impl From<String> for DepPath {
    fn from(s: String) -> Self {
        DepPath(s.into_bytes())
    }
}

impl From<&String> for DepPath {
    fn from(s: &String) -> Self {
        DepPath::from(s.as_str())
    }
}

impl From<&DepPath> for DepPath {
    fn from(path: &DepPath) -> Self {
        path.clone()
    }
}

impl From<&OsStr> for DepPath {
    fn from(s: &OsStr) -> Self {
        DepPath(os_bytes(s).into_owned())
    }
}

impl From<OsString> for DepPath {
    fn from(s: OsString) -> Self {
        DepPath::from(s.as_os_str())
    }
}

impl From<&Path> for DepPath {
    fn from(path: &Path) -> Self {
        DepPath::from(path.as_os_str())
    }
}

impl From<PathBuf> for DepPath {
    fn from(path: PathBuf) -> Self {
        DepPath::from(path.as_path())
    }
}

impl PartialEq<str> for DepPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for DepPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<String> for DepPath {
    fn eq(&self, other: &String) -> bool {
        self.0 == other.as_bytes()
    }
}

impl Serialize for DepPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl<'de> Deserialize<'de> for DepPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(DepPath::from)
    }
}

/// Raw bytes of an OS string.
#[cfg(unix)]
pub fn os_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(s.as_bytes())
}

#[cfg(not(unix))]
pub fn os_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    match s.to_string_lossy() {
        Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
        Cow::Owned(text) => Cow::Owned(text.into_bytes()),
    }
}

/// A filesystem path for raw path bytes.
#[cfg(unix)]
pub fn to_path(bytes: &[u8]) -> Cow<'_, Path> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(Path::new(OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
pub fn to_path(bytes: &[u8]) -> Cow<'_, Path> {
    Cow::Owned(PathBuf::from(String::from_utf8_lossy(bytes).into_owned()))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Join a directory and a relative path.
///
/// Returns `relative` unchanged when `dir` is absent or empty, or when
/// `relative` is absolute.
pub fn join(dir: Option<&[u8]>, relative: &[u8]) -> Vec<u8> {
    match dir {
        Some(dir) if !dir.is_empty() && !relative.starts_with(b"/") => {
            let mut joined = Vec::with_capacity(dir.len() + 1 + relative.len());
            joined.extend_from_slice(dir);
            joined.push(b'/');
            joined.extend_from_slice(relative);
            joined
        }
        _ => relative.to_vec(),
    }
}

/// Remove redundant `./` and `name/../` segments.
///
/// Backslashes are converted to forward slashes first. Leading `../`
/// segments are kept, as is any `../` directly following another `../`.
pub fn normalize(path: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = path
        .iter()
        .map(|&b| if b == b'\\' { b'/' } else { b })
        .collect();

    let mut skip = 0;
    while s[skip..].starts_with(b"./") {
        skip += 2;
    }
    s.drain(..skip);

    let mut from = 0;
    while let Some(offset) = find(&s[from..], b"/./") {
        let at = from + offset;
        s.drain(at..at + 2);
        from = at;
    }

    // Delete "name/../"; `mark` moves past any "../" that must stay.
    let mut mark = 0;
    while let Some(offset) = find(&s[mark..], b"/../") {
        let at = mark + offset;
        let segment = s[mark..at]
            .iter()
            .rposition(|&b| b == b'/')
            .map_or(mark, |slash| mark + slash + 1);
        if segment < at && !s[segment..].starts_with(b"../") {
            s.drain(segment..at + 4);
        } else {
            mark = at + 4;
        }
    }

    s
}

/// Directory part of a path, or `None` if it has no `/`.
pub fn split_dir(path: &[u8]) -> Option<&[u8]> {
    path.iter().rposition(|&b| b == b'/').map(|slash| &path[..slash])
}

/// File name part of a path (the whole path if it has no `/`).
pub fn split_file(path: &[u8]) -> &[u8] {
    path.iter()
        .rposition(|&b| b == b'/')
        .map_or(path, |slash| &path[slash + 1..])
}

/// Whether `path` names something that exists and is not a directory.
pub fn file_exists(path: &[u8]) -> bool {
    fs::metadata(to_path(path)).is_ok_and(|meta| !meta.is_dir())
}

/// Size of a file in bytes, 0 if it cannot be queried.
pub fn file_size(path: &[u8]) -> u64 {
    fs::metadata(to_path(path)).map(|meta| meta.len()).unwrap_or(0)
}
