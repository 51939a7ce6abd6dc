use super::{TEMPLATES_ROOT, effective_candidates, find_localized, is_locale_dir, locale_of};
use crate::error::{ResourceError, Result};
use crate::intl::{self, LanguageMatcher};
use crate::layer::Layer;
use crate::resource::descriptor::{ExistingFile, app_file, pass_through, require_utf8};
use crate::resource::{
    Descriptor, Location, PatchedFile, ResourceFile, ResourceFinder, ResourceMatch,
    ResourceMatcher, ResourceUpdater, ResourceViewer,
};
use std::sync::Arc;
use strata_api::{AppFileView, Artifact, StaticAsset, View};

/// A text template at `templates/<tag>/<name>`.
#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    name: String,
    template: String,
    matcher: Arc<LanguageMatcher>,
}

impl TemplateDescriptor {
    pub fn new(template: impl Into<String>, matcher: Arc<LanguageMatcher>) -> Self {
        let template = template.into();
        Self {
            name: format!("template:{template}"),
            template,
            matcher,
        }
    }
}

impl ResourceMatcher for TemplateDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        let tag = locale_of(TEMPLATES_ROOT, path)?;
        // templates/<tag>/<rest>
        let rest = &path[TEMPLATES_ROOT.len() + tag.len() + 2..];
        if rest != self.template || !is_locale_dir(tag) {
            return None;
        }
        Some(ResourceMatch::localized(tag))
    }
}

impl ResourceFinder for TemplateDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        find_localized(layer, TEMPLATES_ROOT, &[self.template.as_str()])
    }
}

impl ResourceViewer for TemplateDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => Ok(Artifact::Bytes(app_file(files, &v.path)?.data.clone())),
            View::EffectiveFile(v) => {
                let tag = locale_of(TEMPLATES_ROOT, &v.path).ok_or(ResourceError::NotFound)?;
                let file = effective_candidates(files, TEMPLATES_ROOT, tag, &v.default_tag)
                    .pop()
                    .ok_or(ResourceError::NotFound)?;
                Ok(Artifact::Bytes(file.data.clone()))
            }
            View::EffectiveResource(v) => {
                let prepared = intl::prepare(files, &v.default_tag, |f| {
                    locale_of(TEMPLATES_ROOT, f.path())
                })?;
                let items = intl::group(&prepared);
                let matched =
                    intl::match_item(&self.matcher, &v.preferred_tags, &v.default_tag, &items)?;
                Ok(Artifact::Asset(StaticAsset {
                    path: matched.file.path().to_string(),
                    language_tag: Some(matched.language_tag.to_string()),
                    data: matched.file.data.clone(),
                }))
            }
            View::ValidateResource => {
                for file in files {
                    require_utf8(file)?;
                }
                Ok(Artifact::Validated)
            }
        }
    }
}

impl ResourceUpdater for TemplateDescriptor {
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        Ok(pass_through(existing, data))
    }
}

impl Descriptor for TemplateDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}
