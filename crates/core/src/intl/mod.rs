//! Language tags, BCP-47 matching and locale-keyed resource selection.

pub mod cache;
pub mod matcher;
pub mod tag;

pub use cache::MatcherCache;
pub use matcher::{CompiledMatcher, Confidence, LanguageMatcher, MIN_CONFIDENCE, TagMatch};
pub use tag::LanguageTag;

use crate::error::{ResourceError, Result};
use crate::resource::ResourceFile;

/// Reserved directory name holding content for whatever the default tag is.
pub const DEFAULT_MARKER: &str = "__default__";

pub trait LanguageItem {
    fn language_tag(&self) -> &str;
}

/// A raw file attributed to a concrete language tag.
#[derive(Debug, Clone, Copy)]
pub struct LocalizedFile<'a> {
    pub language_tag: &'a str,
    pub file: &'a ResourceFile,
}

impl LanguageItem for LocalizedFile<'_> {
    fn language_tag(&self) -> &str {
        self.language_tag
    }
}

/// Whether two tags name the same language once normalized.
pub fn same_tag(a: &str, b: &str) -> bool {
    match (LanguageTag::parse(a), LanguageTag::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

/// Attribute every file to a language tag, in override order.
///
/// Files under [`DEFAULT_MARKER`] count as `default_tag`. Within one layer
/// they are placed before the explicit files, so an explicit default-tag file
/// in the same or a higher layer overrides them when folded last-wins.
/// Files whose tag cannot be extracted are skipped.
pub fn prepare<'a, F>(files: &'a [ResourceFile], default_tag: &'a str, tag_of: F) -> Result<Vec<LocalizedFile<'a>>>
where
    F: Fn(&'a ResourceFile) -> Option<&'a str>,
{
    if default_tag.is_empty() {
        return Err(ResourceError::MatcherConfig(
            "default language tag must not be empty".to_string(),
        ));
    }

    let mut keyed = Vec::with_capacity(files.len());
    let mut run = 0usize;
    for (i, file) in files.iter().enumerate() {
        if i > 0 && !file.location.same_layer(&files[i - 1].location) {
            run += 1;
        }
        let Some(tag) = tag_of(file) else { continue };
        let (is_marker, language_tag) = if tag == DEFAULT_MARKER {
            (true, default_tag)
        } else {
            (false, tag)
        };
        keyed.push(((run, !is_marker), LocalizedFile { language_tag, file }));
    }
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, f)| f).collect())
}

/// Fold prepared files last-wins per tag, keeping first-discovery order.
pub fn group<'a>(prepared: &[LocalizedFile<'a>]) -> Vec<LocalizedFile<'a>> {
    let mut grouped: Vec<LocalizedFile<'a>> = Vec::new();
    for item in prepared {
        match grouped
            .iter_mut()
            .find(|g| g.language_tag == item.language_tag)
        {
            Some(slot) => *slot = *item,
            None => grouped.push(*item),
        }
    }
    grouped
}

/// Pick the item for the preferred tags.
///
/// The default tag must itself be present among `items`, otherwise the
/// resolution fails with `NotFound` instead of degrading to another language.
/// The default item is offered to the matcher first, then the rest in the
/// given order, so an empty preferred list yields the default.
pub fn match_item<'i, T, P>(
    matcher: &LanguageMatcher,
    preferred: &[P],
    default_tag: &str,
    items: &'i [T],
) -> Result<&'i T>
where
    T: LanguageItem,
    P: AsRef<str>,
{
    if default_tag.is_empty() {
        return Err(ResourceError::MatcherConfig(
            "default language tag must not be empty".to_string(),
        ));
    }
    let default_index = items
        .iter()
        .position(|i| same_tag(i.language_tag(), default_tag))
        .ok_or(ResourceError::NotFound)?;

    let mut order = Vec::with_capacity(items.len());
    order.push(default_index);
    order.extend((0..items.len()).filter(|&i| i != default_index));
    let supported: Vec<&str> = order.iter().map(|&i| items[i].language_tag()).collect();

    let index = matcher
        .best_index(preferred, &supported, supported[0])
        .map_err(|err| match err {
            ResourceError::NoLanguageMatch => ResourceError::NotFound,
            other => other,
        })?;
    Ok(&items[order[index]])
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str);

    impl LanguageItem for Item {
        fn language_tag(&self) -> &str {
            self.0
        }
    }

    fn pick(preferred: &[&str], default_tag: &str, items: &[Item]) -> Result<&'static str> {
        match_item(&LanguageMatcher::default(), preferred, default_tag, items).map(|i| i.0)
    }

    #[test]
    fn test_empty_preferred_yields_default() {
        let items = [Item("zh"), Item("en")];
        assert_eq!(pick(&[], "en", &items).unwrap(), "en");
    }

    #[test]
    fn test_script_region_fallback() {
        let items = [Item("zh"), Item("en")];
        assert_eq!(pick(&["zh-HK"], "en", &items).unwrap(), "zh");
    }

    #[test]
    fn test_missing_default_is_not_found() {
        let items = [Item("fr")];
        for preferred in [&[][..], &["fr"][..], &["en"][..], &["ja"][..]] {
            assert!(matches!(pick(preferred, "en", &items), Err(ResourceError::NotFound)));
        }
    }

    #[test]
    fn test_unmatched_falls_back_to_default() {
        let items = [Item("zh"), Item("en-US")];
        assert_eq!(pick(&["ja"], "en-us", &items).unwrap(), "en-US");
    }

    #[test]
    fn test_empty_default_is_config_error() {
        let items = [Item("en")];
        assert!(matches!(pick(&["en"], "", &items), Err(ResourceError::MatcherConfig(_))));
    }

    #[test]
    fn test_same_tag() {
        assert!(same_tag("zh_hant", "zh-Hant"));
        assert!(!same_tag("zh", "zh-CN"));
        assert!(same_tag("__DEFAULT__", "__default__"));
    }
}
