//! Concrete resource kinds.

mod bundle;
mod image;
mod passthrough;
mod secrets;
mod template;
mod translation;

pub use bundle::{BundleDescriptor, BundleKind};
pub use image::{ImageDescriptor, ImageType, LocaleImageDescriptor, StaticImageDescriptor, sniff};
pub use passthrough::{GeneratedAssetDescriptor, PassthroughDescriptor};
pub use secrets::{SECRETS_FILE, SecretsDescriptor};
pub use template::TemplateDescriptor;
pub use translation::{TRANSLATION_FILE, TranslationDescriptor, is_app_specific_key};

use crate::error::Result;
use crate::intl::{DEFAULT_MARKER, LanguageTag, same_tag};
use crate::layer::{Layer, join};
use crate::resource::{Location, ResourceFile, probe, subdirectories};
use std::sync::Arc;

pub const STATIC_ROOT: &str = "static";
pub const TEMPLATES_ROOT: &str = "templates";

/// The language directory of `path` directly under `root`.
pub(crate) fn locale_of<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(root)?.strip_prefix('/')?;
    let (tag, tail) = rest.split_once('/')?;
    (!tag.is_empty() && !tail.is_empty()).then_some(tag)
}

/// A directory name usable as a locale key.
pub(crate) fn is_locale_dir(name: &str) -> bool {
    name == DEFAULT_MARKER || LanguageTag::parse(name).is_ok()
}

/// One candidate per language directory under `root` and per file name.
pub(crate) fn find_localized<S: AsRef<str>>(
    layer: &Arc<dyn Layer>,
    root: &str,
    names: &[S],
) -> Result<Vec<Location>> {
    let mut locations = Vec::new();
    for tag in subdirectories(layer.as_ref(), root)? {
        if !is_locale_dir(&tag) {
            continue;
        }
        for name in names {
            let path = join(&join(root, &tag), name.as_ref());
            if let Some(location) = probe(layer, &path)? {
                locations.push(location);
            }
        }
    }
    Ok(locations)
}

/// Files contributing to the effective file for `requested_tag`, in
/// override order.
///
/// When the requested tag is the default tag, files under the default marker
/// contribute too and sort ahead of explicit files of the same layer.
pub(crate) fn effective_candidates<'a>(
    files: &'a [ResourceFile],
    root: &str,
    requested_tag: &str,
    default_tag: &str,
) -> Vec<&'a ResourceFile> {
    let with_marker = requested_tag != DEFAULT_MARKER
        && !default_tag.is_empty()
        && same_tag(requested_tag, default_tag);

    let mut run = 0usize;
    let mut keyed = Vec::new();
    for (i, file) in files.iter().enumerate() {
        if i > 0 && !file.location.same_layer(&files[i - 1].location) {
            run += 1;
        }
        let Some(tag) = locale_of(root, file.path()) else {
            continue;
        };
        if tag == requested_tag {
            keyed.push(((run, true), file));
        } else if with_marker && tag == DEFAULT_MARKER {
            keyed.push(((run, false), file));
        }
    }
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, f)| f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_of() {
        assert_eq!(locale_of("templates", "templates/en/a.html"), Some("en"));
        assert_eq!(locale_of("templates", "templates/en/sub/a.html"), Some("en"));
        assert_eq!(locale_of("templates", "templates/en"), None);
        assert_eq!(locale_of("templates", "templatesx/en/a"), None);
        assert_eq!(locale_of("static", "static/a.png"), None);
    }

    #[test]
    fn test_locale_dirs() {
        assert!(is_locale_dir("zh-HK"));
        assert!(is_locale_dir(DEFAULT_MARKER));
        assert!(!is_locale_dir("generated"));
        assert!(!is_locale_dir("v1.2"));
    }
}
