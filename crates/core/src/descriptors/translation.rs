use super::{TEMPLATES_ROOT, effective_candidates, find_localized, is_locale_dir, locale_of};
use crate::config::DEFAULT_LANGUAGE;
use crate::error::{ResourceError, Result, json_format};
use crate::intl::{self, LanguageItem, LanguageMatcher};
use crate::layer::{Layer, LayerLevel};
use crate::resource::descriptor::{ExistingFile, app_file};
use crate::resource::{
    Descriptor, Location, PatchedFile, ResourceFile, ResourceFinder, ResourceMatch,
    ResourceMatcher, ResourceUpdater, ResourceViewer,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_api::{AppFileView, Artifact, Translation, View};

pub const TRANSLATION_FILE: &str = "translation.json";

/// Keys whose value belongs to one app rather than to the product default.
static APP_SPECIFIC_KEYS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^app\.name$",
        r"^email\..+\.sender$",
        r"^email\..+\.reply-to$",
        r"^sms\..+\.sender$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Failed to compile app-specific key pattern"))
    .collect()
});

pub fn is_app_specific_key(key: &str) -> bool {
    APP_SPECIFIC_KEYS.iter().any(|r| r.is_match(key))
}

type Catalog = BTreeMap<String, String>;

fn parse_catalog(origin: &str, data: &[u8]) -> Result<Catalog> {
    let value: serde_json::Value = serde_json::from_slice(data).map_err(|e| json_format(origin, e))?;
    let serde_json::Value::Object(object) = value else {
        return Err(ResourceError::Format(format!(
            "{origin}: translation file must be a JSON object"
        )));
    };
    object
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => Ok((key, s)),
            other => Err(ResourceError::Format(format!(
                "{origin}: translation `{key}` must be a string, got {other}"
            ))),
        })
        .collect()
}

fn render(catalog: &Catalog) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(catalog)
        .map_err(|e| ResourceError::Format(format!("cannot encode translations: {e}")))?;
    out.push(b'\n');
    Ok(out)
}

struct Candidate<'a> {
    language_tag: &'a str,
    value: &'a str,
}

impl LanguageItem for Candidate<'_> {
    fn language_tag(&self) -> &str {
        self.language_tag
    }
}

/// Per-tag values of one key, keeping first-discovery order of tags.
#[derive(Default)]
struct Values<'a> {
    by_tag: Vec<(&'a str, &'a str)>,
}

impl<'a> Values<'a> {
    fn set(&mut self, tag: &'a str, value: &'a str) {
        match self.by_tag.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.by_tag.push((tag, value)),
        }
    }

    fn candidates(&self) -> Vec<Candidate<'a>> {
        self.by_tag
            .iter()
            .map(|&(language_tag, value)| Candidate { language_tag, value })
            .collect()
    }
}

/// `templates/<tag>/translation.json`, merged key by key.
#[derive(Debug, Clone)]
pub struct TranslationDescriptor {
    matcher: Arc<LanguageMatcher>,
    /// Tag whose lower-layer defaults include `__default__` catalogs on update.
    default_tag: String,
}

impl TranslationDescriptor {
    pub fn new(matcher: Arc<LanguageMatcher>) -> Self {
        Self {
            matcher,
            default_tag: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = tag.into();
        self
    }

    fn resolve_key(
        &self,
        key: &str,
        values: &Values<'_>,
        preferred: &[String],
        default_tag: &str,
    ) -> Result<Option<Translation>> {
        let candidates = values.candidates();
        match intl::match_item(&self.matcher, preferred, default_tag, &candidates) {
            Ok(found) => Ok(Some(Translation {
                language_tag: found.language_tag.to_string(),
                value: found.value.to_string(),
            })),
            Err(err) if err.is_not_found() => {
                tracing::trace!("translation {} has no {} value", key, default_tag);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn effective_resource(
        &self,
        files: &[ResourceFile],
        preferred: &[String],
        default_tag: &str,
    ) -> Result<Artifact> {
        let prepared = intl::prepare(files, default_tag, |f| locale_of(TEMPLATES_ROOT, f.path()))?;

        let catalogs = prepared
            .iter()
            .map(|p| Ok((p, parse_catalog(p.file.path(), &p.file.data)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut shared: BTreeMap<&str, Values<'_>> = BTreeMap::new();
        let mut specific: BTreeMap<&str, BTreeMap<LayerLevel, Values<'_>>> = BTreeMap::new();
        for (item, catalog) in &catalogs {
            for (key, value) in catalog {
                if is_app_specific_key(key) {
                    specific
                        .entry(key.as_str())
                        .or_default()
                        .entry(item.file.level())
                        .or_default()
                        .set(item.language_tag, value);
                } else {
                    shared.entry(key.as_str()).or_default().set(item.language_tag, value);
                }
            }
        }

        let mut resolved = BTreeMap::new();
        for (key, values) in &shared {
            if let Some(t) = self.resolve_key(key, values, preferred, default_tag)? {
                resolved.insert(key.to_string(), t);
            }
        }
        // App-specific keys come from the highest level that can answer them.
        for (key, levels) in &specific {
            for values in levels.values().rev() {
                if let Some(t) = self.resolve_key(key, values, preferred, default_tag)? {
                    resolved.insert(key.to_string(), t);
                    break;
                }
            }
        }
        Ok(Artifact::Translations(resolved))
    }
}

impl ResourceMatcher for TranslationDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        let tag = locale_of(TEMPLATES_ROOT, path)?;
        let rest = &path[TEMPLATES_ROOT.len() + tag.len() + 2..];
        (rest == TRANSLATION_FILE && is_locale_dir(tag)).then(|| ResourceMatch::localized(tag))
    }
}

impl ResourceFinder for TranslationDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        find_localized(layer, TEMPLATES_ROOT, &[TRANSLATION_FILE])
    }
}

impl ResourceViewer for TranslationDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => Ok(Artifact::Bytes(app_file(files, &v.path)?.data.clone())),
            View::EffectiveFile(v) => {
                let tag = locale_of(TEMPLATES_ROOT, &v.path).ok_or(ResourceError::NotFound)?;
                let mut merged = Catalog::new();
                for file in effective_candidates(files, TEMPLATES_ROOT, tag, &v.default_tag) {
                    merged.extend(parse_catalog(file.path(), &file.data)?);
                }
                if merged.is_empty() {
                    return Err(ResourceError::NotFound);
                }
                Ok(Artifact::Bytes(render(&merged)?))
            }
            View::EffectiveResource(v) => {
                self.effective_resource(files, &v.preferred_tags, &v.default_tag)
            }
            View::ValidateResource => {
                for file in files {
                    parse_catalog(file.path(), &file.data)?;
                }
                Ok(Artifact::Validated)
            }
        }
    }
}

impl ResourceUpdater for TranslationDescriptor {
    /// Keep only the keys that differ from what lower layers already say;
    /// nothing left means the app file is deleted.
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        let location = existing.location.clone();
        let Some(data) = data else {
            return Ok(PatchedFile::delete(location));
        };
        let tag = locale_of(TEMPLATES_ROOT, &location.path).ok_or(ResourceError::NotFound)?;

        let mut defaults = Catalog::new();
        for file in effective_candidates(existing.all, TEMPLATES_ROOT, tag, &self.default_tag) {
            if file.level() == location.level() {
                continue;
            }
            defaults.extend(parse_catalog(file.path(), &file.data)?);
        }

        let mut incoming = parse_catalog(&location.path, data)?;
        incoming.retain(|key, value| defaults.get(key) != Some(value));
        if incoming.is_empty() {
            return Ok(PatchedFile::delete(location));
        }
        Ok(PatchedFile::write(location, render(&incoming)?))
    }
}

impl Descriptor for TranslationDescriptor {
    fn name(&self) -> &str {
        "translation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::MemoryLayer;

    fn files_of(d: &TranslationDescriptor, layers: &[Arc<dyn Layer>]) -> Vec<ResourceFile> {
        let mut files = Vec::new();
        for layer in layers {
            for location in d.find_resources(layer).unwrap() {
                let data = location.read().unwrap();
                files.push(ResourceFile { location, data });
            }
        }
        files
    }

    fn layers() -> Vec<Arc<dyn Layer>> {
        vec![
            Arc::new(
                MemoryLayer::new("builtin", LayerLevel::Builtin)
                    .with_file(
                        "templates/__default__/translation.json",
                        r#"{"greeting": "Hello", "app.name": "Strata", "bye": "Bye"}"#,
                    )
                    .with_file(
                        "templates/zh/translation.json",
                        r#"{"greeting": "你好", "app.name": "层"}"#,
                    ),
            ),
            Arc::new(MemoryLayer::new("app", LayerLevel::App).with_file(
                "templates/en/translation.json",
                r#"{"app.name": "Acme"}"#,
            )),
        ]
    }

    #[test]
    fn test_app_specific_keys() {
        assert!(is_app_specific_key("app.name"));
        assert!(is_app_specific_key("email.otp.sender"));
        assert!(is_app_specific_key("email.otp.reply-to"));
        assert!(is_app_specific_key("sms.otp.sender"));
        assert!(!is_app_specific_key("email.otp.subject"));
    }

    #[test]
    fn test_effective_resource_per_key() {
        let d = TranslationDescriptor::new(Arc::new(LanguageMatcher::default()));
        let files = files_of(&d, &layers());

        let zh = d
            .view_resources(&files, &View::effective_resource(["zh-HK"], "en"))
            .unwrap()
            .into_translations()
            .unwrap();
        assert_eq!(zh["greeting"].value, "你好");
        assert_eq!(zh["bye"].value, "Bye");
        assert_eq!(zh["bye"].language_tag, "en");
        // The app layer only has English, and it wins for app-specific keys.
        assert_eq!(zh["app.name"].value, "Acme");

        let en = d
            .view_resources(&files, &View::effective_resource(Vec::<String>::new(), "en"))
            .unwrap()
            .into_translations()
            .unwrap();
        assert_eq!(en["greeting"].value, "Hello");
    }

    #[test]
    fn test_effective_file_merges_layers() {
        let d = TranslationDescriptor::new(LanguageMatcher::global());
        let files = files_of(&d, &layers());
        let out = d
            .view_resources(&files, &View::effective_file("templates/en/translation.json", "en"))
            .unwrap()
            .into_bytes()
            .unwrap();
        let merged: Catalog = serde_json::from_slice(&out).unwrap();
        assert_eq!(merged["app.name"], "Acme");
        assert_eq!(merged["greeting"], "Hello");
        assert!(out.ends_with(b"}\n"));
    }

    #[test]
    fn test_update_drops_defaults() {
        let d = TranslationDescriptor::new(LanguageMatcher::global());
        let all_layers = layers();
        let files = files_of(&d, &all_layers);
        let location = Location::new(&all_layers[1], "templates/zh/translation.json");
        let existing = ExistingFile {
            location: &location,
            data: None,
            all: &files,
        };
        let view = AppFileView::new("templates/zh/translation.json");

        let unchanged = d
            .update_resource(&existing, Some(r#"{"greeting": "你好"}"#.as_bytes()), &view)
            .unwrap();
        assert!(unchanged.is_delete());

        let changed = d
            .update_resource(
                &existing,
                Some(r#"{"greeting": "你好", "bye": "再见"}"#.as_bytes()),
                &view,
            )
            .unwrap();
        let kept: Catalog = serde_json::from_slice(changed.data.as_deref().unwrap()).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept["bye"], "再见");
    }

    #[test]
    fn test_update_drops_values_from_default_marker() {
        let all_layers = layers();
        let files = files_of(&TranslationDescriptor::new(LanguageMatcher::global()), &all_layers);
        let location = Location::new(&all_layers[1], "templates/en/translation.json");
        let existing = ExistingFile {
            location: &location,
            data: Some(r#"{"app.name": "Acme"}"#.as_bytes()),
            all: &files,
        };
        let view = AppFileView::new("templates/en/translation.json");
        let saved = br#"{"greeting": "Hello", "bye": "Bye"}"#;

        let d = TranslationDescriptor::new(LanguageMatcher::global());
        assert!(d.update_resource(&existing, Some(&saved[..]), &view).unwrap().is_delete());

        // `__default__` stands for another tag, so nothing matches English.
        let fr = TranslationDescriptor::new(LanguageMatcher::global()).with_default_tag("fr");
        let kept = fr.update_resource(&existing, Some(&saved[..]), &view).unwrap();
        let kept: Catalog = serde_json::from_slice(kept.data.as_deref().unwrap()).unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_validate_requires_string_values() {
        let d = TranslationDescriptor::new(LanguageMatcher::global());
        let layer: Arc<dyn Layer> = Arc::new(
            MemoryLayer::new("app", LayerLevel::App)
                .with_file("templates/en/translation.json", r#"{"n": 1}"#),
        );
        let files = files_of(&d, &[layer]);
        assert!(matches!(
            d.view_resources(&files, &View::ValidateResource),
            Err(ResourceError::Format(_))
        ));
    }
}
