//! Read-only file access with a fixed override priority.
//!
//! Every implementation shares the same read semantics: paths are relative,
//! `/`-separated, and a missing path is always `io::ErrorKind::NotFound` so
//! callers can tell "absent" apart from real I/O failures.

mod dir;
mod embedded;
mod memory;

pub use dir::DirLayer;
pub use embedded::EmbeddedLayer;
pub use memory::MemoryLayer;
pub use strata_api::LayerLevel;

use std::fmt;
use std::io::{self, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

pub trait Layer: Send + Sync {
    fn level(&self) -> LayerLevel;

    /// Human readable identifier used in logs.
    fn name(&self) -> &str;

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>>;

    fn stat(&self, path: &str) -> io::Result<EntryKind>;

    /// Immediate children of a directory, sorted by name.
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    /// Every file path this layer physically contains, sorted.
    /// Used by administrative listing, not by resolution.
    fn walk(&self) -> io::Result<Vec<String>>;

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn exists(&self, path: &str) -> io::Result<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl fmt::Debug for dyn Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name())
            .field("level", &self.level())
            .finish()
    }
}

pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

pub(crate) fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file or directory"))
}

/// Normalize a layer path: strip leading `/` and `./`, collapse empty
/// segments, and reject `..` so a layer can never escape its root.
pub fn normalize(path: &str) -> io::Result<String> {
    let mut parts = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{path}: parent segments are not allowed"),
                ));
            }
            s => parts.push(s),
        }
    }
    Ok(parts.join("/"))
}

/// Join two layer paths with a single separator.
pub fn join(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = rest.trim_start_matches('/');
    if base.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/static//app.css").unwrap(), "static/app.css");
        assert_eq!(normalize("./templates/en/").unwrap(), "templates/en");
        assert_eq!(normalize("").unwrap(), "");
        assert!(normalize("static/../secrets.json").is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(join("static", "app.css"), "static/app.css");
        assert_eq!(join("", "app.css"), "app.css");
        assert_eq!(join("static/", "/en"), "static/en");
    }
}
