//! Resolution of logical resources across an ordered stack of layers.
//!
//! ```text
//!   Manager::read(descriptor, view)
//!        │
//!        ├─► for layer in layers (builtin → custom → app)
//!        │       descriptor.find_resources(layer) ──► [Location]
//!        │       read each Location              ──► [ResourceFile]
//!        │
//!        └─► descriptor.view_resources(files, view) ──► Artifact
//! ```

pub mod descriptor;
pub mod edit;
pub mod manager;
pub mod registry;

pub use descriptor::{
    Descriptor, ResourceFinder, ResourceMatch, ResourceMatcher, ResourceUpdater, ResourceViewer,
};
pub use edit::{StagedEdit, Update, checksum};
pub use manager::{DescribedPath, Manager};
pub use registry::Registry;

use crate::layer::{Layer, LayerLevel, is_not_found};
use std::fmt;
use std::io;
use std::sync::Arc;

/// A candidate occurrence of a resource. Holds no data.
#[derive(Clone)]
pub struct Location {
    pub layer: Arc<dyn Layer>,
    pub path: String,
}

impl Location {
    pub fn new(layer: &Arc<dyn Layer>, path: impl Into<String>) -> Self {
        Self {
            layer: Arc::clone(layer),
            path: path.into(),
        }
    }

    pub fn level(&self) -> LayerLevel {
        self.layer.level()
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        self.layer.read(&self.path)
    }

    /// Whether the location currently holds a file.
    pub fn exists(&self) -> io::Result<bool> {
        match self.layer.stat(&self.path) {
            Ok(kind) => Ok(kind == crate::layer::EntryKind::File),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn same_layer(&self, other: &Location) -> bool {
        Arc::ptr_eq(&self.layer, &other.layer)
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Location")
            .field("layer", &self.layer.name())
            .field("level", &self.layer.level())
            .field("path", &self.path)
            .finish()
    }
}

/// Bytes actually read from a location.
#[derive(Debug, Clone)]
pub struct ResourceFile {
    pub location: Location,
    pub data: Vec<u8>,
}

impl ResourceFile {
    pub fn path(&self) -> &str {
        &self.location.path
    }

    pub fn level(&self) -> LayerLevel {
        self.location.level()
    }
}

/// What an edit should persist at a location; `None` deletes the file.
#[derive(Debug, Clone)]
pub struct PatchedFile {
    pub location: Location,
    pub data: Option<Vec<u8>>,
}

impl PatchedFile {
    pub fn write(location: Location, data: Vec<u8>) -> Self {
        Self {
            location,
            data: Some(data),
        }
    }

    pub fn delete(location: Location) -> Self {
        Self {
            location,
            data: None,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.data.is_none()
    }
}

/// Location for `path` in `layer` if a file is there, `None` if it is absent.
pub fn probe(layer: &Arc<dyn Layer>, path: &str) -> io::Result<Option<Location>> {
    let location = Location::new(layer, path);
    Ok(location.exists()?.then_some(location))
}

/// Names of the subdirectories of `dir`, or nothing if `dir` is absent.
pub fn subdirectories(layer: &dyn Layer, dir: &str) -> io::Result<Vec<String>> {
    match layer.read_dir(dir) {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter(|e| e.is_dir())
            .map(|e| e.name)
            .collect()),
        Err(err) if is_not_found(&err) || err.kind() == io::ErrorKind::NotADirectory => {
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}
