use crate::error::{ResourceError, Result};
use crate::layer::{Layer, join};
use crate::manifest::ManifestResolver;
use crate::resource::descriptor::{ExistingFile, app_file, last_file, pass_through};
use crate::resource::{
    Descriptor, Location, PatchedFile, ResourceFile, ResourceFinder, ResourceMatch,
    ResourceMatcher, ResourceUpdater, ResourceViewer, probe,
};
use std::sync::Arc;
use strata_api::{AppFileView, Artifact, StaticAsset, View};

const MAP_SUFFIX: &str = ".map";

/// A fixed path whose effective content is the highest layer's copy.
#[derive(Debug, Clone)]
pub struct PassthroughDescriptor {
    name: String,
    path: String,
}

impl PassthroughDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{path}"),
            path,
        }
    }
}

impl ResourceMatcher for PassthroughDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        (path == self.path).then(ResourceMatch::plain)
    }
}

impl ResourceFinder for PassthroughDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        Ok(probe(layer, &self.path)?.into_iter().collect())
    }
}

impl ResourceViewer for PassthroughDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => Ok(Artifact::Bytes(app_file(files, &v.path)?.data.clone())),
            View::EffectiveFile(_) | View::EffectiveResource(_) => {
                Ok(Artifact::Bytes(last_file(files, &self.path)?.data.clone()))
            }
            View::ValidateResource => Ok(Artifact::Validated),
        }
    }
}

impl ResourceUpdater for PassthroughDescriptor {
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        Ok(pass_through(existing, data))
    }
}

impl Descriptor for PassthroughDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A build-generated asset addressed by its logical key.
///
/// `<root>/<key>` resolves through the manifest to `<root>/<physical>`, and
/// `<root>/<key>.map` to `<root>/<physical>.map`. Content hashes come from an
/// external build, so edits are refused.
pub struct GeneratedAssetDescriptor {
    name: String,
    root: String,
    key: String,
    manifest: Arc<ManifestResolver>,
}

impl GeneratedAssetDescriptor {
    pub fn new(root: impl Into<String>, key: impl Into<String>, manifest: Arc<ManifestResolver>) -> Self {
        let root = root.into();
        let key = key.into();
        Self {
            name: format!("generated:{}", join(&root, &key)),
            root,
            key,
            manifest,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current physical path, including the root.
    fn physical_path(&self) -> Result<String> {
        let physical = self.manifest.asset_name(&self.key)?;
        Ok(join(&self.root, &physical))
    }

    fn logical_path(&self) -> String {
        join(&self.root, &self.key)
    }

    /// Pick from the files `find_resources` found; the manifest is not read again.
    fn resolve(&self, files: &[ResourceFile], source_map: bool) -> Result<StaticAsset> {
        let file = files
            .iter()
            .rev()
            .find(|f| f.path().ends_with(MAP_SUFFIX) == source_map)
            .ok_or(ResourceError::NotFound)?;
        Ok(StaticAsset {
            path: file.path().to_string(),
            language_tag: None,
            data: file.data.clone(),
        })
    }
}

impl ResourceMatcher for GeneratedAssetDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        let logical = self.logical_path();
        let rest = path.strip_prefix(logical.as_str())?;
        (rest.is_empty() || rest == MAP_SUFFIX).then(ResourceMatch::plain)
    }
}

impl ResourceFinder for GeneratedAssetDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        let asset = match self.physical_path() {
            Ok(path) => path,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let map = format!("{asset}{MAP_SUFFIX}");
        let mut locations = Vec::new();
        for path in [asset, map] {
            if let Some(location) = probe(layer, &path)? {
                locations.push(location);
            }
        }
        Ok(locations)
    }
}

impl ResourceViewer for GeneratedAssetDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => Ok(Artifact::Bytes(app_file(files, &v.path)?.data.clone())),
            View::EffectiveFile(v) => {
                let source_map = v.path.ends_with(MAP_SUFFIX) && v.path != self.logical_path();
                Ok(Artifact::Asset(self.resolve(files, source_map)?))
            }
            View::EffectiveResource(_) => Ok(Artifact::Asset(self.resolve(files, false)?)),
            View::ValidateResource => Ok(Artifact::Validated),
        }
    }
}

impl ResourceUpdater for GeneratedAssetDescriptor {
    fn update_resource(
        &self,
        _existing: &ExistingFile<'_>,
        _data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        Err(ResourceError::UnsupportedUpdate(format!(
            "{} is generated by the asset build",
            self.logical_path()
        )))
    }
}

impl Descriptor for GeneratedAssetDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}
