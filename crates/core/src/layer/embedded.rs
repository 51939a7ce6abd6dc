use super::{DirEntry, EntryKind, Layer, LayerLevel, normalize, not_found};
use include_dir::{Dir, DirEntry as EmbeddedEntry};
use std::io::{self, Cursor, Read};
use std::path::Path;

/// Layer over a directory snapshot compiled into the binary with `include_dir!`.
#[derive(Debug, Clone)]
pub struct EmbeddedLayer {
    name: String,
    level: LayerLevel,
    dir: &'static Dir<'static>,
}

impl EmbeddedLayer {
    pub fn new(name: impl Into<String>, level: LayerLevel, dir: &'static Dir<'static>) -> Self {
        Self {
            name: name.into(),
            level,
            dir,
        }
    }

    fn entry(&self, path: &str) -> io::Result<Option<&'static EmbeddedEntry<'static>>> {
        let path = normalize(path)?;
        if path.is_empty() {
            return Ok(None);
        }
        // Entry paths are relative to the `include_dir!` root, not to `self.dir`.
        self.dir
            .get_entry(self.dir.path().join(&path))
            .map(Some)
            .ok_or_else(|| not_found(&path))
    }

    fn dir_at(&self, path: &str) -> io::Result<&'static Dir<'static>> {
        match self.entry(path)? {
            None => Ok(self.dir),
            Some(EmbeddedEntry::Dir(dir)) => Ok(dir),
            Some(EmbeddedEntry::File(_)) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{path}: not a directory"),
            )),
        }
    }
}

fn entry_name(path: &Path) -> Option<String> {
    path.file_name()?.to_str().map(str::to_string)
}

fn slash_path(path: &Path) -> Option<String> {
    let segments: Option<Vec<&str>> = path.components().map(|c| c.as_os_str().to_str()).collect();
    segments.map(|s| s.join("/"))
}

fn collect_files(root: &Path, dir: &'static Dir<'static>, out: &mut Vec<String>) {
    for entry in dir.entries() {
        match entry {
            EmbeddedEntry::Dir(sub) => collect_files(root, sub, out),
            EmbeddedEntry::File(file) => {
                let relative = file.path().strip_prefix(root).unwrap_or(file.path());
                if let Some(path) = slash_path(relative) {
                    out.push(path);
                }
            }
        }
    }
}

impl Layer for EmbeddedLayer {
    fn level(&self) -> LayerLevel {
        self.level
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        match self.entry(path)? {
            Some(EmbeddedEntry::File(file)) => Ok(Box::new(Cursor::new(file.contents()))),
            _ => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{path}: is a directory"),
            )),
        }
    }

    fn stat(&self, path: &str) -> io::Result<EntryKind> {
        match self.entry(path)? {
            Some(EmbeddedEntry::File(_)) => Ok(EntryKind::File),
            _ => Ok(EntryKind::Dir),
        }
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let dir = self.dir_at(path)?;
        let mut entries: Vec<DirEntry> = dir
            .entries()
            .iter()
            .filter_map(|entry| {
                let kind = match entry {
                    EmbeddedEntry::Dir(_) => EntryKind::Dir,
                    EmbeddedEntry::File(_) => EntryKind::File,
                };
                Some(DirEntry {
                    name: entry_name(entry.path())?,
                    kind,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn walk(&self) -> io::Result<Vec<String>> {
        let mut paths = Vec::new();
        collect_files(self.dir.path(), self.dir, &mut paths);
        paths.sort();
        Ok(paths)
    }
}
