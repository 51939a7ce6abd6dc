use crate::error::Result;
use crate::layer::Layer;
use crate::resource::descriptor::{ExistingFile, app_file, pass_through, require_utf8};
use crate::resource::{
    Descriptor, Location, PatchedFile, ResourceFile, ResourceFinder, ResourceMatch,
    ResourceMatcher, ResourceUpdater, ResourceViewer, probe,
};
use std::sync::Arc;
use strata_api::{AppFileView, Artifact, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Css,
    Js,
}

impl BundleKind {
    fn append(self, out: &mut Vec<u8>, body: &[u8]) {
        match self {
            BundleKind::Css => {
                out.extend_from_slice(body);
                out.push(b'\n');
            }
            // Each file gets its own scope so top-level bindings cannot collide.
            BundleKind::Js => {
                out.extend_from_slice(b"(function(){\n");
                out.extend_from_slice(body);
                out.extend_from_slice(b"\n})();\n");
            }
        }
    }
}

/// A stylesheet or script whose effective content concatenates every layer,
/// lowest priority first.
#[derive(Debug, Clone)]
pub struct BundleDescriptor {
    name: String,
    path: String,
    kind: BundleKind,
}

impl BundleDescriptor {
    pub fn new(path: impl Into<String>, kind: BundleKind) -> Self {
        let path = path.into();
        Self {
            name: format!("bundle:{path}"),
            path,
            kind,
        }
    }

    pub fn css(path: impl Into<String>) -> Self {
        Self::new(path, BundleKind::Css)
    }

    pub fn js(path: impl Into<String>) -> Self {
        Self::new(path, BundleKind::Js)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn concatenate(&self, files: &[ResourceFile]) -> Vec<u8> {
        let mut out = Vec::with_capacity(files.iter().map(|f| f.data.len() + 16).sum());
        for file in files {
            self.kind.append(&mut out, &file.data);
        }
        out
    }
}

impl ResourceMatcher for BundleDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        (path == self.path).then(ResourceMatch::plain)
    }
}

impl ResourceFinder for BundleDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        Ok(probe(layer, &self.path)?.into_iter().collect())
    }
}

impl ResourceViewer for BundleDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => Ok(Artifact::Bytes(app_file(files, &v.path)?.data.clone())),
            View::EffectiveFile(_) | View::EffectiveResource(_) => {
                Ok(Artifact::Bytes(self.concatenate(files)))
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

impl ResourceUpdater for BundleDescriptor {
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        Ok(pass_through(existing, data))
    }
}

impl Descriptor for BundleDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerLevel, MemoryLayer};

    fn file(layer: &Arc<dyn Layer>, path: &str) -> ResourceFile {
        let location = Location::new(layer, path);
        let data = location.read().unwrap();
        ResourceFile { location, data }
    }

    #[test]
    fn test_css_concatenates_in_layer_order() {
        let low: Arc<dyn Layer> =
            Arc::new(MemoryLayer::new("low", LayerLevel::Builtin).with_file("static/app.css", "a{}"));
        let high: Arc<dyn Layer> =
            Arc::new(MemoryLayer::new("high", LayerLevel::App).with_file("static/app.css", "b{}"));
        let files = vec![file(&low, "static/app.css"), file(&high, "static/app.css")];

        let d = BundleDescriptor::css("static/app.css");
        let out = d
            .view_resources(&files, &View::effective_file("static/app.css", "en"))
            .unwrap();
        assert_eq!(out.as_bytes().unwrap(), b"a{}\nb{}\n");

        let app = d.view_resources(&files, &View::app_file("static/app.css")).unwrap();
        assert_eq!(app.as_bytes().unwrap(), b"b{}");
    }

    #[test]
    fn test_js_wraps_each_file() {
        let layer: Arc<dyn Layer> = Arc::new(
            MemoryLayer::new("low", LayerLevel::Builtin).with_file("static/app.js", "var x = 1;"),
        );
        let files = vec![file(&layer, "static/app.js"), file(&layer, "static/app.js")];
        let d = BundleDescriptor::js("static/app.js");
        let out = d
            .view_resources(&files, &View::effective_file("static/app.js", "en"))
            .unwrap()
            .into_bytes()
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("(function(){\nvar x = 1;\n})();\n").count(), 2);
    }

    #[test]
    fn test_validate_rejects_binary() {
        let layer: Arc<dyn Layer> = Arc::new(
            MemoryLayer::new("low", LayerLevel::Builtin).with_file("static/app.css", vec![0xff, 0xfe]),
        );
        let files = vec![file(&layer, "static/app.css")];
        let d = BundleDescriptor::css("static/app.css");
        assert!(d.view_resources(&files, &View::ValidateResource).is_err());
    }

    #[test]
    fn test_matches_exact_path_only() {
        let d = BundleDescriptor::css("static/app.css");
        assert!(d.match_resource("static/app.css").is_some());
        assert!(d.match_resource("static/app.css.map").is_none());
    }
}
