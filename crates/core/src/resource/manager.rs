use super::{Descriptor, Location, Registry, ResourceFile};
use crate::error::{ResourceError, Result};
use crate::layer::{Layer, LayerLevel};
use std::collections::BTreeSet;
use std::sync::Arc;
use strata_api::{Artifact, View};

/// A path together with the descriptor that owns it.
#[derive(Clone)]
pub struct DescribedPath {
    pub path: String,
    pub descriptor: Arc<dyn Descriptor>,
}

/// Orchestrates one logical resolution across all layers and one descriptor.
///
/// Cheap to clone: the registry and layer list are shared. Layers are held in
/// ascending priority and that order never changes for a given manager.
#[derive(Clone)]
pub struct Manager {
    registry: Arc<Registry>,
    layers: Arc<Vec<Arc<dyn Layer>>>,
}

impl Manager {
    pub fn new(registry: Arc<Registry>, layers: Vec<Arc<dyn Layer>>) -> Result<Self> {
        check_ascending(&layers)?;
        Ok(Self {
            registry,
            layers: Arc::new(layers),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn layers(&self) -> &[Arc<dyn Layer>] {
        &self.layers
    }

    /// The highest-priority editable layer, if any.
    pub fn app_layer(&self) -> Option<&Arc<dyn Layer>> {
        self.layers.iter().rev().find(|l| l.level().is_editable())
    }

    pub fn resolve(&self, path: &str) -> Option<Arc<dyn Descriptor>> {
        self.registry.resolve(path)
    }

    /// Raw files of `descriptor` across all layers, lowest priority first.
    pub fn read_files(&self, descriptor: &dyn Descriptor) -> Result<Vec<ResourceFile>> {
        let mut files = Vec::new();
        for layer in self.layers.iter() {
            for location in descriptor.find_resources(layer)? {
                tracing::trace!(
                    "reading {} from {} layer {}",
                    location.path,
                    layer.level(),
                    layer.name()
                );
                let data = location.read()?;
                files.push(ResourceFile { location, data });
            }
        }
        Ok(files)
    }

    pub fn read(&self, descriptor: &dyn Descriptor, view: &View) -> Result<Artifact> {
        let files = self.read_files(descriptor)?;
        tracing::debug!(
            "resolving {} as {} over {} file(s)",
            descriptor.name(),
            view.kind(),
            files.len()
        );
        if files.is_empty() {
            return Err(ResourceError::NotFound);
        }
        descriptor.view_resources(&files, view)
    }

    /// Resolve the descriptor owning `path` and read it.
    pub fn read_path(&self, path: &str, view: &View) -> Result<Artifact> {
        let descriptor = self
            .resolve(path)
            .ok_or_else(|| ResourceError::UnknownResource(path.to_string()))?;
        self.read(descriptor.as_ref(), view)
    }

    /// A new manager with `layer` appended as the highest priority.
    /// The receiver is left untouched.
    pub fn overlay(&self, layer: Arc<dyn Layer>) -> Result<Manager> {
        let mut layers: Vec<Arc<dyn Layer>> = self.layers.iter().cloned().collect();
        layers.push(layer);
        Manager::new(Arc::clone(&self.registry), layers)
    }

    /// A new manager with the layer at `index` swapped for `layer`.
    pub(crate) fn replace_layer(&self, index: usize, layer: Arc<dyn Layer>) -> Result<Manager> {
        let mut layers: Vec<Arc<dyn Layer>> = self.layers.iter().cloned().collect();
        match layers.get_mut(index) {
            Some(slot) => *slot = layer,
            None => {
                return Err(ResourceError::Configuration(format!(
                    "no layer at index {index}"
                )));
            }
        }
        Manager::new(Arc::clone(&self.registry), layers)
    }

    /// Sorted union of every path, in every layer, that some descriptor owns.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut paths = BTreeSet::new();
        for layer in self.layers.iter() {
            for path in layer.walk()? {
                paths.insert(path);
            }
        }
        Ok(paths
            .into_iter()
            .filter(|p| self.registry.resolve(p).is_some())
            .collect())
    }

    /// Pair each path with its descriptor, failing on the first unknown one.
    pub fn associate<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<DescribedPath>> {
        paths
            .iter()
            .map(|p| {
                let path = p.as_ref();
                self.resolve(path)
                    .map(|descriptor| DescribedPath {
                        path: path.to_string(),
                        descriptor,
                    })
                    .ok_or_else(|| ResourceError::UnknownResource(path.to_string()))
            })
            .collect()
    }

    /// Location of `path` in the editable layer, whether or not it exists yet.
    pub fn app_location(&self, path: &str) -> Result<Location> {
        let layer = self.app_layer().ok_or_else(|| {
            ResourceError::Configuration("manager has no app layer".to_string())
        })?;
        Ok(Location::new(layer, path))
    }
}

fn check_ascending(layers: &[Arc<dyn Layer>]) -> Result<()> {
    let mut previous = LayerLevel::Builtin;
    for layer in layers {
        if layer.level() < previous {
            return Err(ResourceError::Configuration(format!(
                "layer {} ({}) is out of order after a {} layer",
                layer.name(),
                layer.level(),
                previous
            )));
        }
        previous = layer.level();
    }
    Ok(())
}
