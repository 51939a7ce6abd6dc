use super::{DirEntry, EntryKind, Layer, LayerLevel, normalize};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Layer backed by an OS directory.
///
/// Contents are read straight from disk on every call; they are expected to
/// stay put while a manager is alive but may change between runs.
#[derive(Debug, Clone)]
pub struct DirLayer {
    name: String,
    level: LayerLevel,
    root: PathBuf,
}

impl DirLayer {
    pub fn new(root: impl Into<PathBuf>, level: LayerLevel) -> Self {
        let root = root.into();
        Self {
            name: root.display().to_string(),
            level,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let path = normalize(path)?;
        if path.is_empty() {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(path))
    }
}

impl Layer for DirLayer {
    fn level(&self) -> LayerLevel {
        self.level
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let full = self.resolve(path)?;
        if fs::metadata(&full)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{path}: is a directory"),
            ));
        }
        Ok(Box::new(fs::File::open(full)?))
    }

    fn stat(&self, path: &str) -> io::Result<EntryKind> {
        let meta = fs::metadata(self.resolve(path)?)?;
        Ok(if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        })
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(DirEntry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn walk(&self) -> io::Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let segments: Option<Vec<&str>> = relative
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect();
            if let Some(segments) = segments {
                paths.push(segments.join("/"));
            }
        }
        paths.sort();
        Ok(paths)
    }
}
