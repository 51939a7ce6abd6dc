use super::{DirEntry, EntryKind, Layer, LayerLevel, normalize, not_found};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};

/// In-memory layer for tests and for staging edits before they are committed.
///
/// Mutation goes through `&mut self`, so once the layer is shared behind an
/// `Arc` its contents are frozen.
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    name: String,
    level: LayerLevel,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryLayer {
    pub fn new(name: impl Into<String>, level: LayerLevel) -> Self {
        Self {
            name: name.into(),
            level,
            files: BTreeMap::new(),
        }
    }

    /// Copy every file of another layer into a new in-memory layer.
    pub fn from_layer(layer: &dyn Layer, name: impl Into<String>) -> io::Result<Self> {
        let mut copy = Self::new(name, layer.level());
        for path in layer.walk()? {
            let data = layer.read(&path)?;
            copy.files.insert(path, data);
        }
        Ok(copy)
    }

    pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        // Unnormalizable paths are dropped; they could never be read back.
        if let Ok(path) = normalize(path) {
            if !path.is_empty() {
                self.files.insert(path, data.into());
            }
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        let path = normalize(path).ok()?;
        self.files.remove(&path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_dir(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        let prefix = format!("{path}/");
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }
}

impl Layer for MemoryLayer {
    fn level(&self) -> LayerLevel {
        self.level
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send + '_>> {
        let path = normalize(path)?;
        match self.files.get(&path) {
            Some(data) => Ok(Box::new(Cursor::new(data.as_slice()))),
            None if self.is_dir(&path) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{path}: is a directory"),
            )),
            None => Err(not_found(&path)),
        }
    }

    fn stat(&self, path: &str) -> io::Result<EntryKind> {
        let path = normalize(path)?;
        if self.files.contains_key(&path) {
            Ok(EntryKind::File)
        } else if self.is_dir(&path) {
            Ok(EntryKind::Dir)
        } else {
            Err(not_found(&path))
        }
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let path = normalize(path)?;
        if self.files.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{path}: not a directory"),
            ));
        }
        if !self.is_dir(&path) {
            return Err(not_found(&path));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for key in self.files.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => {
                    children.insert(dir.to_string(), EntryKind::Dir);
                }
                None => {
                    children.entry(rest.to_string()).or_insert(EntryKind::File);
                }
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, kind)| DirEntry { name, kind })
            .collect())
    }

    fn walk(&self) -> io::Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::is_not_found;

    fn sample() -> MemoryLayer {
        MemoryLayer::new("mem", LayerLevel::App)
            .with_file("static/en/logo.png", b"en".to_vec())
            .with_file("static/zh/logo.png", b"zh".to_vec())
            .with_file("static/app.css", "a{}")
    }

    #[test]
    fn test_read_and_missing() {
        let layer = sample();
        assert_eq!(layer.read("static/app.css").unwrap(), b"a{}");
        assert_eq!(layer.read("/static/app.css").unwrap(), b"a{}");

        let err = layer.read("static/missing.css").unwrap_err();
        assert!(is_not_found(&err));
    }

    #[test]
    fn test_implicit_directories() {
        let layer = sample();
        assert_eq!(layer.stat("static").unwrap(), EntryKind::Dir);
        assert_eq!(layer.stat("").unwrap(), EntryKind::Dir);
        assert!(layer.open("static/en").is_err());

        let entries = layer.read_dir("static").unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("app.css", EntryKind::File),
                ("en", EntryKind::Dir),
                ("zh", EntryKind::Dir),
            ]
        );

        assert!(is_not_found(&layer.read_dir("templates").unwrap_err()));
    }

    #[test]
    fn test_copy_and_remove() {
        let layer = sample();
        let mut copy = MemoryLayer::from_layer(&layer, "copy").unwrap();
        assert_eq!(copy.len(), 3);
        assert_eq!(copy.level(), LayerLevel::App);

        assert!(copy.remove("static/app.css").is_some());
        assert!(!copy.exists("static/app.css").unwrap());
        assert!(layer.exists("static/app.css").unwrap());
    }
}
