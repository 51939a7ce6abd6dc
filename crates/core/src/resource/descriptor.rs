use super::{Location, PatchedFile, ResourceFile};
use crate::error::{ResourceError, Result};
use crate::layer::{Layer, LayerLevel};
use std::sync::Arc;
use strata_api::{AppFileView, Artifact, View};

/// Default edit size limit for kinds that do not declare their own.
pub const DEFAULT_SIZE_LIMIT: usize = 100 * 1024;

/// What a matcher learned from a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMatch {
    pub language_tag: Option<String>,
}

impl ResourceMatch {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn localized(tag: impl Into<String>) -> Self {
        Self {
            language_tag: Some(tag.into()),
        }
    }
}

/// Recognizes the paths owned by a resource kind.
pub trait ResourceMatcher: Send + Sync {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch>;
}

/// Enumerates candidate locations of a resource inside one layer.
///
/// An absent path or directory yields an empty list, never an error.
pub trait ResourceFinder: Send + Sync {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>>;
}

/// Reduces raw files, in ascending layer priority, into one artifact.
pub trait ResourceViewer: Send + Sync {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact>;
}

/// The app-layer file an edit targets.
#[derive(Debug, Clone, Copy)]
pub struct ExistingFile<'a> {
    pub location: &'a Location,
    /// Current content, `None` if the file does not exist yet.
    pub data: Option<&'a [u8]>,
    /// Every raw file of the same descriptor across all layers.
    pub all: &'a [ResourceFile],
}

/// Turns externally validated content into what should be persisted.
pub trait ResourceUpdater: Send + Sync {
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        view: &AppFileView,
    ) -> Result<PatchedFile>;

    fn size_limit(&self) -> usize {
        DEFAULT_SIZE_LIMIT
    }
}

/// A resource kind: the four capabilities plus a stable name.
pub trait Descriptor: ResourceMatcher + ResourceFinder + ResourceViewer + ResourceUpdater {
    fn name(&self) -> &str;
}

/// Persist `data` as is, or delete when there is none.
pub fn pass_through(existing: &ExistingFile<'_>, data: Option<&[u8]>) -> PatchedFile {
    PatchedFile {
        location: existing.location.clone(),
        data: data.map(<[u8]>::to_vec),
    }
}

/// The editable-layer file at exactly `path`.
pub fn app_file<'a>(files: &'a [ResourceFile], path: &str) -> Result<&'a ResourceFile> {
    files
        .iter()
        .rev()
        .find(|f| f.level() == LayerLevel::App && f.path() == path)
        .ok_or(ResourceError::NotFound)
}

/// The highest-priority file at exactly `path`.
pub fn last_file<'a>(files: &'a [ResourceFile], path: &str) -> Result<&'a ResourceFile> {
    files
        .iter()
        .rev()
        .find(|f| f.path() == path)
        .ok_or(ResourceError::NotFound)
}

pub fn require_utf8<'a>(file: &'a ResourceFile) -> Result<&'a str> {
    std::str::from_utf8(&file.data)
        .map_err(|e| ResourceError::Format(format!("{}: not valid UTF-8: {}", file.path(), e)))
}
