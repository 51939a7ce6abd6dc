use super::{STATIC_ROOT, find_localized, locale_of};
use crate::error::{ResourceError, Result};
use crate::intl::{self, LanguageMatcher};
use crate::layer::{Layer, LayerLevel, join};
use crate::resource::descriptor::{DEFAULT_SIZE_LIMIT, ExistingFile, pass_through};
use crate::resource::{
    Descriptor, Location, PatchedFile, ResourceFile, ResourceFinder, ResourceMatch,
    ResourceMatcher, ResourceUpdater, ResourceViewer, probe,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use strata_api::{AppFileView, Artifact, StaticAsset, View};

/// Every extension an image may be stored under, in lookup order.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpe", "jpeg", "jpg", "gif"];

static PLAIN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^static/(.+)\.(png|jpe|jpeg|jpg|gif)$").expect("Failed to compile image path pattern")
});

static LOCALE_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^static/([a-zA-Z0-9_-]+)/(.+)\.(png|jpe|jpeg|jpg|gif)$")
        .expect("Failed to compile locale image path pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
}

impl ImageType {
    pub fn mime(self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpeg => "image/jpeg",
            ImageType::Gif => "image/gif",
        }
    }

    /// Extension used when an image of this type is served.
    pub fn preferred_extension(self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Jpeg => "jpeg",
            ImageType::Gif => "gif",
        }
    }
}

/// Detect a supported image type from its magic bytes.
pub fn sniff(data: &[u8]) -> Option<ImageType> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageType::Png)
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageType::Jpeg)
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(ImageType::Gif)
    } else {
        None
    }
}

fn sniff_format(path: &str, data: &[u8]) -> Result<ImageType> {
    sniff(data).ok_or_else(|| ResourceError::Format(format!("{path}: unsupported image format")))
}

fn check_upload(data: Option<&[u8]>) -> Result<()> {
    match data {
        Some(data) if !data.is_empty() && sniff(data).is_none() => Err(ResourceError::InvalidUpdate(
            "unsupported image file".to_string(),
        )),
        _ => Ok(()),
    }
}

fn image_candidates(layer: &Arc<dyn Layer>, dir: &str, name: &str) -> Result<Vec<Location>> {
    let mut locations = Vec::new();
    for ext in IMAGE_EXTENSIONS {
        if let Some(location) = probe(layer, &join(dir, &format!("{name}.{ext}")))? {
            locations.push(location);
        }
    }
    Ok(locations)
}

fn extension_of(regex: &Regex, group: usize, path: &str) -> Option<String> {
    regex
        .captures(path)
        .and_then(|c| c.get(group))
        .map(|m| m.as_str().to_string())
}

/// Reject more than one image per layer, keyed by an extra discriminator.
fn reject_duplicates<F>(files: &[ResourceFile], key_of: F) -> Result<Artifact>
where
    F: Fn(&ResourceFile) -> String,
{
    let mut seen: Vec<(&ResourceFile, String, Vec<&str>)> = Vec::new();
    for file in files {
        let key = key_of(file);
        match seen
            .iter_mut()
            .find(|(f, k, _)| f.location.same_layer(&file.location) && *k == key)
        {
            Some((_, _, paths)) => paths.push(file.path()),
            None => seen.push((file, key, vec![file.path()])),
        }
    }
    for (_, _, mut paths) in seen {
        if paths.len() > 1 {
            paths.sort();
            return Err(ResourceError::Format(format!(
                "duplicate resource: {}",
                paths.join(", ")
            )));
        }
    }
    Ok(Artifact::Validated)
}

/// The image of the highest layer that has one.
fn highest_layer_file(files: &[ResourceFile]) -> Option<&ResourceFile> {
    let top = files.last()?;
    files.iter().find(|f| f.location.same_layer(&top.location))
}

/// An image at `static/<name>.<ext>` resolved without regard to language.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    name: String,
    image: String,
    size_limit: usize,
}

impl ImageDescriptor {
    pub fn new(image: impl Into<String>) -> Self {
        let image = image.into();
        Self {
            name: format!("image:{image}"),
            image,
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }

    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    fn asset(&self, data: &[u8], origin: &str) -> Result<StaticAsset> {
        let kind = sniff_format(origin, data)?;
        Ok(StaticAsset {
            path: join(STATIC_ROOT, &format!("{}.{}", self.image, kind.preferred_extension())),
            language_tag: None,
            data: data.to_vec(),
        })
    }
}

fn view_by_extension<'a>(
    files: impl Iterator<Item = &'a ResourceFile>,
    regex: &Regex,
    group: usize,
    path: &str,
) -> Result<&'a ResourceFile> {
    let requested = extension_of(regex, group, path).ok_or(ResourceError::NotFound)?;
    files
        .filter(|f| extension_of(regex, group, f.path()).as_deref() == Some(requested.as_str()))
        .last()
        .ok_or(ResourceError::NotFound)
}

impl ResourceMatcher for ImageDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        let caps = PLAIN_IMAGE.captures(path)?;
        (caps.get(1)?.as_str() == self.image).then(ResourceMatch::plain)
    }
}

impl ResourceFinder for ImageDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        image_candidates(layer, STATIC_ROOT, &self.image)
    }
}

impl ResourceViewer for ImageDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => {
                let app = files.iter().filter(|f| f.level() == LayerLevel::App);
                let file = view_by_extension(app, &PLAIN_IMAGE, 2, &v.path)?;
                sniff_format(file.path(), &file.data)?;
                Ok(Artifact::Bytes(file.data.clone()))
            }
            View::EffectiveFile(v) => {
                let file = view_by_extension(files.iter(), &PLAIN_IMAGE, 2, &v.path)?;
                sniff_format(file.path(), &file.data)?;
                Ok(Artifact::Bytes(file.data.clone()))
            }
            View::EffectiveResource(_) => {
                let file = highest_layer_file(files).ok_or(ResourceError::NotFound)?;
                Ok(Artifact::Asset(self.asset(&file.data, file.path())?))
            }
            View::ValidateResource => reject_duplicates(files, |_| String::new()),
        }
    }
}

impl ResourceUpdater for ImageDescriptor {
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        check_upload(data)?;
        Ok(pass_through(existing, data))
    }

    fn size_limit(&self) -> usize {
        self.size_limit
    }
}

impl Descriptor for ImageDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A builtin-only image; other layers are never consulted and edits are refused.
#[derive(Debug, Clone)]
pub struct StaticImageDescriptor {
    name: String,
    inner: ImageDescriptor,
}

impl StaticImageDescriptor {
    pub fn new(image: impl Into<String>) -> Self {
        let inner = ImageDescriptor::new(image);
        Self {
            name: format!("static-image:{}", inner.image),
            inner,
        }
    }
}

impl ResourceMatcher for StaticImageDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        self.inner.match_resource(path)
    }
}

impl ResourceFinder for StaticImageDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        if layer.level() != LayerLevel::Builtin {
            return Ok(Vec::new());
        }
        self.inner.find_resources(layer)
    }
}

impl ResourceViewer for StaticImageDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(_) => Err(ResourceError::NotFound),
            View::ValidateResource => Ok(Artifact::Validated),
            View::EffectiveFile(_) | View::EffectiveResource(_) => {
                self.inner.view_resources(files, view)
            }
        }
    }
}

impl ResourceUpdater for StaticImageDescriptor {
    fn update_resource(
        &self,
        _existing: &ExistingFile<'_>,
        _data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        Err(ResourceError::UnsupportedUpdate(format!(
            "{} is builtin only; use a locale or plain image instead",
            self.inner.image
        )))
    }
}

impl Descriptor for StaticImageDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

/// An image at `static/<tag>/<name>.<ext>`, resolved by language.
#[derive(Debug, Clone)]
pub struct LocaleImageDescriptor {
    name: String,
    image: String,
    size_limit: usize,
    matcher: Arc<LanguageMatcher>,
}

impl LocaleImageDescriptor {
    pub fn new(image: impl Into<String>, matcher: Arc<LanguageMatcher>) -> Self {
        let image = image.into();
        Self {
            name: format!("locale-image:{image}"),
            image,
            size_limit: DEFAULT_SIZE_LIMIT,
            matcher,
        }
    }

    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    fn candidate_names(&self) -> Vec<String> {
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| format!("{}.{}", self.image, ext))
            .collect()
    }
}

fn same_locale_and_extension(path: &str) -> Option<(String, String)> {
    let caps = LOCALE_IMAGE.captures(path)?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(3)?.as_str().to_string()))
}

fn view_localized_path<'a>(
    files: impl Iterator<Item = &'a ResourceFile>,
    path: &str,
) -> Result<&'a ResourceFile> {
    let requested = same_locale_and_extension(path).ok_or(ResourceError::NotFound)?;
    files
        .filter(|f| same_locale_and_extension(f.path()).as_ref() == Some(&requested))
        .last()
        .ok_or(ResourceError::NotFound)
}

impl ResourceMatcher for LocaleImageDescriptor {
    fn match_resource(&self, path: &str) -> Option<ResourceMatch> {
        let caps = LOCALE_IMAGE.captures(path)?;
        if caps.get(2)?.as_str() != self.image {
            return None;
        }
        Some(ResourceMatch::localized(caps.get(1)?.as_str()))
    }
}

impl ResourceFinder for LocaleImageDescriptor {
    fn find_resources(&self, layer: &Arc<dyn Layer>) -> Result<Vec<Location>> {
        find_localized(layer, STATIC_ROOT, &self.candidate_names())
    }
}

impl ResourceViewer for LocaleImageDescriptor {
    fn view_resources(&self, files: &[ResourceFile], view: &View) -> Result<Artifact> {
        match view {
            View::AppFile(v) => {
                let app = files.iter().filter(|f| f.level() == LayerLevel::App);
                let file = view_localized_path(app, &v.path)?;
                sniff_format(file.path(), &file.data)?;
                Ok(Artifact::Bytes(file.data.clone()))
            }
            View::EffectiveFile(v) => {
                let file = view_localized_path(files.iter(), &v.path)?;
                sniff_format(file.path(), &file.data)?;
                Ok(Artifact::Bytes(file.data.clone()))
            }
            View::EffectiveResource(v) => {
                let prepared = intl::prepare(files, &v.default_tag, |f| {
                    locale_of(STATIC_ROOT, f.path())
                })?;
                let items = intl::group(&prepared);
                if items.is_empty() {
                    return Err(ResourceError::NotFound);
                }
                let matched =
                    intl::match_item(&self.matcher, &v.preferred_tags, &v.default_tag, &items)?;
                let file = matched.file;
                let real_tag = locale_of(STATIC_ROOT, file.path()).ok_or(ResourceError::NotFound)?;
                let kind = sniff_format(file.path(), &file.data)?;
                Ok(Artifact::Asset(StaticAsset {
                    path: join(
                        &join(STATIC_ROOT, real_tag),
                        &format!("{}.{}", self.image, kind.preferred_extension()),
                    ),
                    language_tag: Some(matched.language_tag.to_string()),
                    data: file.data.clone(),
                }))
            }
            View::ValidateResource => reject_duplicates(files, |f| {
                locale_of(STATIC_ROOT, f.path()).unwrap_or_default().to_string()
            }),
        }
    }
}

impl ResourceUpdater for LocaleImageDescriptor {
    fn update_resource(
        &self,
        existing: &ExistingFile<'_>,
        data: Option<&[u8]>,
        _view: &AppFileView,
    ) -> Result<PatchedFile> {
        check_upload(data)?;
        Ok(pass_through(existing, data))
    }

    fn size_limit(&self) -> usize {
        self.size_limit
    }
}

impl Descriptor for LocaleImageDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::MemoryLayer;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const GIF: &[u8] = b"GIF89a\x01\0\x01\0";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];

    fn read_all(d: &dyn Descriptor, layers: &[Arc<dyn Layer>]) -> Vec<ResourceFile> {
        let mut files = Vec::new();
        for layer in layers {
            for location in d.find_resources(layer).unwrap() {
                let data = location.read().unwrap();
                files.push(ResourceFile { location, data });
            }
        }
        files
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff(PNG), Some(ImageType::Png));
        assert_eq!(sniff(GIF), Some(ImageType::Gif));
        assert_eq!(sniff(JPEG), Some(ImageType::Jpeg));
        assert_eq!(sniff(b"<svg/>"), None);
    }

    #[test]
    fn test_plain_image_uses_preferred_extension() {
        let builtin: Arc<dyn Layer> =
            Arc::new(MemoryLayer::new("builtin", LayerLevel::Builtin).with_file("static/logo.png", PNG));
        let app: Arc<dyn Layer> =
            Arc::new(MemoryLayer::new("app", LayerLevel::App).with_file("static/logo.jpg", JPEG));
        let d = ImageDescriptor::new("logo");
        let files = read_all(&d, &[builtin, app]);

        let asset = d
            .view_resources(&files, &View::effective_resource(Vec::<String>::new(), "en"))
            .unwrap()
            .into_asset()
            .unwrap();
        assert_eq!(asset.path, "static/logo.jpeg");
        assert_eq!(asset.data, JPEG);

        let png = d
            .view_resources(&files, &View::effective_file("static/logo.png", "en"))
            .unwrap();
        assert_eq!(png.as_bytes().unwrap(), PNG);
    }

    #[test]
    fn test_duplicate_images_in_one_layer_are_invalid() {
        let app: Arc<dyn Layer> = Arc::new(
            MemoryLayer::new("app", LayerLevel::App)
                .with_file("static/logo.png", PNG)
                .with_file("static/logo.gif", GIF),
        );
        let d = ImageDescriptor::new("logo");
        let files = read_all(&d, &[app]);
        assert!(matches!(
            d.view_resources(&files, &View::ValidateResource),
            Err(ResourceError::Format(_))
        ));
    }

    #[test]
    fn test_locale_image_matches_language() {
        let builtin: Arc<dyn Layer> = Arc::new(
            MemoryLayer::new("builtin", LayerLevel::Builtin)
                .with_file("static/__default__/logo.png", PNG)
                .with_file("static/zh/logo.gif", GIF),
        );
        let d = LocaleImageDescriptor::new("logo", Arc::new(LanguageMatcher::default()));
        let files = read_all(&d, &[builtin]);

        let zh = d
            .view_resources(&files, &View::effective_resource(["zh-HK"], "en"))
            .unwrap()
            .into_asset()
            .unwrap();
        assert_eq!(zh.path, "static/zh/logo.gif");
        assert_eq!(zh.language_tag.as_deref(), Some("zh"));

        let en = d
            .view_resources(&files, &View::effective_resource(["ja"], "en"))
            .unwrap()
            .into_asset()
            .unwrap();
        assert_eq!(en.path, "static/__default__/logo.png");
        assert_eq!(en.language_tag.as_deref(), Some("en"));
    }

    #[test]
    fn test_rejects_unsupported_upload() {
        let layer: Arc<dyn Layer> = Arc::new(MemoryLayer::new("app", LayerLevel::App));
        let location = Location::new(&layer, "static/logo.png");
        let existing = ExistingFile {
            location: &location,
            data: None,
            all: &[],
        };
        let d = ImageDescriptor::new("logo");
        let view = AppFileView::new("static/logo.png");
        assert!(matches!(
            d.update_resource(&existing, Some(&b"<svg/>"[..]), &view),
            Err(ResourceError::InvalidUpdate(_))
        ));
        assert!(d.update_resource(&existing, Some(PNG), &view).is_ok());
    }

    #[test]
    fn test_static_image_ignores_other_layers() {
        let app: Arc<dyn Layer> =
            Arc::new(MemoryLayer::new("app", LayerLevel::App).with_file("static/icon.png", PNG));
        let d = StaticImageDescriptor::new("icon");
        assert!(d.find_resources(&app).unwrap().is_empty());
    }
}
