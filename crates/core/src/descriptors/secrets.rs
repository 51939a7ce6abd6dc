use crate::error::{ResourceError, Result, json_format};
use crate::layer::Layer;
use crate::resource::descriptor::{ExistingFile, app_file};
use crate::resource::{
    Descriptor, Location, PatchedFile, ResourceFile, ResourceFinder, ResourceMatch,
    ResourceMatcher, ResourceUpdater, ResourceViewer, probe,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use strata_api::{AppFileView, Artifact, View};

pub const SECRETS_FILE: &str = "secrets.json";

type Secrets = Map<String, Value>;

fn parse_secrets(origin: &str, data: &[u8]) -> Result<Secrets> {
    match serde_json::from_slice::<Value>(data).map_err(|e| json_format(origin, e))? {
        Value::Object(map) => Ok(map),
        _ => Err(ResourceError::Format(format!(
            "{origin}: secrets must be a JSON object"
        ))),
    }
}

/// `secrets.json`: a flat object of secret entries.
///
/// Only allow-listed keys are ever shown or changed through the app file.
/// The merged file is never exposed as text.
#[derive(Debug, Clone, Default)]
pub struct SecretsDescriptor;

impl SecretsDescriptor {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceMatcher for SecretsDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        (path == SECRETS_FILE).then(ResourceMatch::plain)
    }
}

impl ResourceFinder for SecretsDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        Ok(probe(layer, SECRETS_FILE)?.into_iter().collect())
    }
}

impl ResourceViewer for SecretsDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => {
                let file = app_file(files, &v.path)?;
                let mut secrets = parse_secrets(file.path(), &file.data)?;
                secrets.retain(|key, _| v.is_key_allowed(key));
                Ok(Artifact::Document(Value::Object(secrets)))
            }
            View::EffectiveFile(_) => Err(ResourceError::Forbidden(
                "cannot view effective secrets".to_string(),
            )),
            View::EffectiveResource(_) => {
                let mut merged = Secrets::new();
                for file in files {
                    merged.extend(parse_secrets(file.path(), &file.data)?);
                }
                Ok(Artifact::Document(Value::Object(merged)))
            }
            View::ValidateResource => {
                for file in files {
                    parse_secrets(file.path(), &file.data)?;
                }
                Ok(Artifact::Validated)
            }
        }
    }
}

impl ResourceUpdater for SecretsDescriptor {
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        view: &AppFileView,
    ) -> Result<PatchedFile> {
        let location = existing.location.clone();
        let Some(data) = data else {
            return Err(ResourceError::InvalidUpdate(format!("cannot delete {SECRETS_FILE}")));
        };

        let original = match existing.data {
            Some(bytes) => parse_secrets(&location.path, bytes)?,
            None => Secrets::new(),
        };
        let incoming = parse_secrets(&location.path, data)?;

        for (key, value) in &incoming {
            if !view.is_key_allowed(key) && original.get(key) != Some(value) {
                return Err(ResourceError::InvalidUpdate(format!(
                    "secret '{key}' is not editable"
                )));
            }
        }

        // Allowed keys take the incoming state, absent meaning removed.
        let mut updated: Secrets = original
            .into_iter()
            .filter(|(key, _)| !view.is_key_allowed(key))
            .collect();
        for (key, value) in incoming {
            if view.is_key_allowed(&key) {
                updated.insert(key, value);
            }
        }

        let mut out = serde_json::to_vec_pretty(&Value::Object(updated))
            .map_err(|e| ResourceError::Format(format!("cannot encode secrets: {e}")))?;
        out.push(b'\n');
        Ok(PatchedFile::write(location, out))
    }
}

impl Descriptor for SecretsDescriptor {
    fn name(&self) -> &str {
        "secrets"
    }
}
