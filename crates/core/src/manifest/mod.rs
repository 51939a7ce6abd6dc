//! Logical asset key to content-hashed file name, hot reloadable.
//!
//! The current [`ManifestContext`] lives in a [`ManifestCell`]. The watcher
//! task is its only writer; readers load a complete snapshot without locking
//! and never observe a half-applied manifest.

mod watch;

pub use watch::{WatchBackend, WatchOptions};

use crate::error::{ResourceError, Result, json_format};
use crate::layer::{DirLayer, Layer, LayerLevel, is_not_found};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use watch::WatchHandle;

pub const DEFAULT_MANIFEST_FILE: &str = "manifest.json";

/// An immutable manifest snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestContext {
    entries: HashMap<String, String>,
}

impl ManifestContext {
    /// Decode a UTF-8 JSON object of string values.
    pub fn from_slice(origin: &str, data: &[u8]) -> Result<Self> {
        let entries: HashMap<String, String> =
            serde_json::from_slice(data).map_err(|e| json_format(origin, e))?;
        Ok(Self { entries })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Atomically swapped reference to the current snapshot.
#[derive(Debug)]
pub struct ManifestCell {
    current: ArcSwap<ManifestContext>,
}

impl ManifestCell {
    pub fn new(context: ManifestContext) -> Self {
        Self {
            current: ArcSwap::from_pointee(context),
        }
    }

    pub fn load(&self) -> Arc<ManifestContext> {
        self.current.load_full()
    }

    pub(crate) fn store(&self, context: Arc<ManifestContext>) {
        self.current.store(context);
    }
}

fn read_context(layer: &dyn Layer, file_name: &str) -> Result<ManifestContext> {
    match layer.read(file_name) {
        Ok(data) => ManifestContext::from_slice(file_name, &data),
        Err(err) if is_not_found(&err) => Ok(ManifestContext::default()),
        Err(err) => Err(err.into()),
    }
}

/// Resolves logical asset keys and opens the physical files they map to.
pub struct ManifestResolver {
    layer: Arc<dyn Layer>,
    file_name: String,
    cell: Arc<ManifestCell>,
    watch: Mutex<Option<WatchHandle>>,
}

impl ManifestResolver {
    /// Read the manifest once from `layer`; no watching.
    /// A missing manifest yields an empty snapshot.
    pub fn from_layer(layer: Arc<dyn Layer>, file_name: impl Into<String>) -> Result<Self> {
        let file_name = file_name.into();
        let context = read_context(layer.as_ref(), &file_name)?;
        Ok(Self {
            layer,
            file_name,
            cell: Arc::new(ManifestCell::new(context)),
            watch: Mutex::new(None),
        })
    }

    /// Load the manifest in `dir` and keep it current in a background task.
    ///
    /// Must be called from within a tokio runtime. An initially missing
    /// manifest starts out empty; an initially invalid one is an error.
    pub fn watch_dir(
        dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        options: WatchOptions,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ResourceError::Configuration(format!("live manifest needs a tokio runtime: {e}"))
        })?;
        let dir = dir.into();
        let file_name = file_name.into();
        let layer: Arc<dyn Layer> = Arc::new(DirLayer::new(&dir, LayerLevel::Builtin));
        let cell = Arc::new(ManifestCell::new(ManifestContext::default()));

        // Watch first, then read, so no write can fall between the two.
        let handle = watch::spawn(&runtime, dir.join(&file_name), Arc::clone(&cell), options);
        match read_context(layer.as_ref(), &file_name) {
            Ok(context) => cell.store(Arc::new(context)),
            Err(err) => {
                handle.stop();
                return Err(err);
            }
        }

        Ok(Self {
            layer,
            file_name,
            cell,
            watch: Mutex::new(Some(handle)),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The snapshot readers currently see.
    pub fn current(&self) -> Arc<ManifestContext> {
        self.cell.load()
    }

    /// Physical name for `key` in the current snapshot.
    pub fn asset_name(&self, key: &str) -> Result<String> {
        self.cell
            .load()
            .get(key)
            .map(str::to_string)
            .ok_or(ResourceError::NotFound)
    }

    #[cfg(test)]
    pub(crate) fn replace(&self, context: ManifestContext) {
        self.cell.store(Arc::new(context));
    }

    pub fn open(&self, physical: &str) -> Result<Box<dyn Read + Send + '_>> {
        self.layer.open(physical).map_err(|err| {
            if is_not_found(&err) {
                ResourceError::NotFound
            } else {
                err.into()
            }
        })
    }

    pub fn read(&self, physical: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open(physical)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn is_live(&self) -> bool {
        self.watch
            .lock()
            .map(|slot| slot.as_ref().is_some_and(WatchHandle::is_running))
            .unwrap_or(false)
    }

    /// Stop the watcher, if any. The last snapshot stays readable.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.watch.lock() {
            if let Some(handle) = slot.take() {
                handle.stop();
            }
        }
    }
}

impl Drop for ManifestResolver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ManifestResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestResolver")
            .field("layer", &self.layer.name())
            .field("file_name", &self.file_name)
            .field("entries", &self.cell.load().len())
            .finish()
    }
}
