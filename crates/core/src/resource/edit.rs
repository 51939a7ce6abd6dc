use super::descriptor::ExistingFile;
use super::{Location, Manager, PatchedFile};
use crate::error::{ResourceError, Result};
use crate::layer::{Layer, MemoryLayer, is_not_found};
use std::sync::Arc;
use strata_api::{AppFileView, View};
use xxhash_rust::xxh3::xxh3_64;

/// One requested change to an app-layer file. `data: None` deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub path: String,
    pub data: Option<Vec<u8>>,
    /// Checksum of the content the caller based the edit on.
    pub checksum: Option<String>,
}

impl Update {
    pub fn write(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: Some(data.into()),
            checksum: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: None,
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

/// Result of staging: a validated manager over the edited app layer, and the
/// files the edit would persist.
pub struct StagedEdit {
    pub manager: Manager,
    pub files: Vec<PatchedFile>,
}

impl std::fmt::Debug for StagedEdit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedEdit")
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

impl StagedEdit {
    pub fn changed_paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.location.path.as_str())
    }
}

/// Content checksum used for optimistic concurrency on edits.
pub fn checksum(data: &[u8]) -> String {
    format!("{:016x}", xxh3_64(data))
}

impl Manager {
    /// Apply `updates` to a copy of the app layer and validate the result.
    ///
    /// The receiver is never mutated; on success the returned manager sees the
    /// edited app layer in place of the original one.
    pub fn stage_updates(&self, updates: &[Update], allowed_keys: &[String]) -> Result<StagedEdit> {
        let (index, app) = self
            .layers()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, l)| l.level().is_editable())
            .ok_or_else(|| ResourceError::Configuration("manager has no app layer".to_string()))?;

        let mut staged = MemoryLayer::from_layer(app.as_ref(), format!("staged:{}", app.name()))?;
        let mut patched = Vec::with_capacity(updates.len());

        for update in updates {
            let layer: Arc<dyn Layer> = Arc::new(staged.clone());
            let current = self.replace_layer(index, Arc::clone(&layer))?;
            let file = self.stage_one(&current, &layer, update, allowed_keys)?;
            match &file.data {
                Some(data) => staged.insert(&file.location.path, data.clone()),
                None => {
                    staged.remove(&file.location.path);
                }
            }
            patched.push(file);
        }

        let layer: Arc<dyn Layer> = Arc::new(staged);
        let manager = self.replace_layer(index, Arc::clone(&layer))?;
        validate_all(&manager)?;

        let files = patched
            .into_iter()
            .map(|f| PatchedFile {
                location: Location::new(&layer, f.location.path),
                data: f.data,
            })
            .collect();
        Ok(StagedEdit { manager, files })
    }

    fn stage_one(
        &self,
        current: &Manager,
        layer: &Arc<dyn Layer>,
        update: &Update,
        allowed_keys: &[String],
    ) -> Result<PatchedFile> {
        let existing = match layer.read(&update.path) {
            Ok(data) => Some(data),
            Err(err) if is_not_found(&err) => None,
            Err(err) => return Err(err.into()),
        };

        if let Some(expected) = &update.checksum {
            let actual = checksum(existing.as_deref().unwrap_or_default());
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(ResourceError::Conflict(format!(
                    "{}: checksum {} does not match current {}",
                    update.path, expected, actual
                )));
            }
        }

        let descriptor = current
            .resolve(&update.path)
            .ok_or_else(|| ResourceError::UnknownResource(update.path.clone()))?;

        if let Some(data) = &update.data {
            let max = descriptor.size_limit();
            if data.len() > max {
                return Err(ResourceError::TooLarge {
                    path: update.path.clone(),
                    size: data.len(),
                    max,
                });
            }
        }

        let all = current.read_files(descriptor.as_ref())?;
        let location = Location::new(layer, update.path.clone());
        let view = AppFileView::new(update.path.clone()).with_allowed_keys(allowed_keys.iter().cloned());
        let file = descriptor.update_resource(
            &ExistingFile {
                location: &location,
                data: existing.as_deref(),
                all: &all,
            },
            update.data.as_deref(),
            &view,
        )?;
        tracing::debug!(
            "staged {} for {} via {}",
            if file.is_delete() { "delete" } else { "write" },
            update.path,
            descriptor.name()
        );
        Ok(file)
    }
}

fn validate_all(manager: &Manager) -> Result<()> {
    for descriptor in manager.registry().descriptors() {
        match manager.read(descriptor.as_ref(), &View::ValidateResource) {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
