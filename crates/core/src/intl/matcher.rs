use super::cache::MatcherCache;
use super::tag::LanguageTag;
use crate::error::{ResourceError, Result};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// How well a supported tag satisfies a preferred one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    No,
    Low,
    High,
    Exact,
}

/// Lowest confidence that still counts as a match.
pub const MIN_CONFIDENCE: Confidence = Confidence::Low;

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMatch {
    /// Index into the supported list the matcher was compiled over.
    pub index: usize,
    pub confidence: Confidence,
}

/// Supported tags parsed and maximized once, in their original order.
///
/// Tags that fail to parse keep their slot so indices stay aligned, but never
/// match anything.
#[derive(Debug)]
pub struct CompiledMatcher {
    supported: Vec<Option<LanguageTag>>,
}

impl CompiledMatcher {
    pub fn compile<S: AsRef<str>>(supported: &[S]) -> Self {
        let supported = supported
            .iter()
            .map(|s| match LanguageTag::parse(s.as_ref()) {
                Ok(tag) => Some(tag.maximize()),
                Err(err) => {
                    tracing::debug!("ignoring supported tag: {}", err);
                    None
                }
            })
            .collect();
        Self { supported }
    }

    pub fn len(&self) -> usize {
        self.supported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supported.is_empty()
    }

    /// Best supported tag for the preferred list.
    ///
    /// Preferred tags are tried in order and a later one only replaces the
    /// current best on strictly higher confidence. For one preferred tag,
    /// ties between supported tags go to the earliest supported index.
    pub fn best_match<S: AsRef<str>>(&self, preferred: &[S]) -> TagMatch {
        let mut best = TagMatch {
            index: 0,
            confidence: Confidence::No,
        };
        for want in preferred {
            let Ok(want) = LanguageTag::parse(want.as_ref()) else {
                continue;
            };
            let want = want.maximize();
            for (index, have) in self.supported.iter().enumerate() {
                let Some(have) = have else { continue };
                let confidence = compare(&want, have);
                if confidence > best.confidence {
                    best = TagMatch { index, confidence };
                }
            }
            if best.confidence == Confidence::Exact {
                break;
            }
        }
        best
    }
}

/// Confidence of `have` for `want`, both maximized.
fn compare(want: &LanguageTag, have: &LanguageTag) -> Confidence {
    if want.language != have.language {
        return Confidence::No;
    }
    if want.script != have.script {
        return Confidence::Low;
    }
    if want.region != have.region || want.variants != have.variants {
        return Confidence::High;
    }
    Confidence::Exact
}

/// BCP-47 best-match over a preferred list and a discovered supported set,
/// memoizing compiled matchers per ordered supported list.
#[derive(Debug)]
pub struct LanguageMatcher {
    cache: MatcherCache,
}

static GLOBAL: Lazy<Arc<LanguageMatcher>> =
    Lazy::new(|| Arc::new(LanguageMatcher::new(DEFAULT_IDLE_TTL)));

impl LanguageMatcher {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            cache: MatcherCache::new(idle_ttl),
        }
    }

    /// Process-wide matcher with the default idle TTL.
    pub fn global() -> Arc<LanguageMatcher> {
        Arc::clone(&GLOBAL)
    }

    pub fn cache(&self) -> &MatcherCache {
        &self.cache
    }

    /// Raw match result without default-tag fallback.
    pub fn match_tags<P, S>(&self, preferred: &[P], supported: &[S]) -> TagMatch
    where
        P: AsRef<str>,
        S: AsRef<str>,
    {
        self.cache.get_or_compile(supported).best_match(preferred)
    }

    /// Index of the supported tag to use.
    ///
    /// An empty preferred list picks index 0. When no preferred tag reaches
    /// [`MIN_CONFIDENCE`], the default tag is used if it is literally in the
    /// supported list; otherwise the result is [`ResourceError::NoLanguageMatch`].
    pub fn best_index<P, S>(&self, preferred: &[P], supported: &[S], default_tag: &str) -> Result<usize>
    where
        P: AsRef<str>,
        S: AsRef<str>,
    {
        if default_tag.is_empty() {
            return Err(ResourceError::MatcherConfig(
                "default language tag must not be empty".to_string(),
            ));
        }
        if supported.is_empty() {
            return Err(ResourceError::NoLanguageMatch);
        }
        if preferred.is_empty() {
            return Ok(0);
        }

        let found = self.match_tags(preferred, supported);
        if found.confidence >= MIN_CONFIDENCE {
            return Ok(found.index);
        }
        supported
            .iter()
            .position(|s| s.as_ref() == default_tag)
            .ok_or(ResourceError::NoLanguageMatch)
    }
}

impl Default for LanguageMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(preferred: &[&str], supported: &[&str], default_tag: &str) -> Result<String> {
        let matcher = LanguageMatcher::default();
        matcher
            .best_index(preferred, supported, default_tag)
            .map(|i| supported[i].to_string())
    }

    #[test]
    fn test_empty_preferred_picks_first() {
        assert_eq!(pick(&[], &["en", "zh"], "en").unwrap(), "en");
        assert_eq!(pick(&[], &["zh", "en"], "en").unwrap(), "zh");
    }

    #[test]
    fn test_exact_and_region_fallback() {
        assert_eq!(pick(&["zh"], &["en", "zh"], "en").unwrap(), "zh");
        assert_eq!(pick(&["en-US"], &["zh", "en"], "zh").unwrap(), "en");
        assert_eq!(pick(&["zh-HK"], &["zh", "en"], "en").unwrap(), "zh");
    }

    #[test]
    fn test_traditional_chinese_prefers_same_script() {
        assert_eq!(pick(&["zh-Hant"], &["zh-CN", "zh-HK"], "en").unwrap(), "zh-HK");
        let m = LanguageMatcher::default().match_tags(&["zh-Hant"], &["zh-CN", "zh-HK"]);
        assert_eq!(m.confidence, Confidence::High);
        assert_eq!(m.index, 1);
    }

    #[test]
    fn test_ties_go_to_earliest_supported() {
        assert_eq!(pick(&["en-CA"], &["en-GB", "en-AU"], "en").unwrap(), "en-GB");
        assert_eq!(pick(&["en-CA"], &["en-AU", "en-GB"], "en").unwrap(), "en-AU");
    }

    #[test]
    fn test_earlier_preference_wins_at_equal_confidence() {
        // fr-CA and de-AT are both High; the first preference decides.
        assert_eq!(pick(&["fr-CA", "de-AT"], &["de", "fr"], "en").unwrap(), "fr");
        // A later preference can still win with strictly higher confidence.
        assert_eq!(pick(&["fr-CA", "de"], &["de", "fr"], "en").unwrap(), "de");
    }

    #[test]
    fn test_falls_back_to_default_tag() {
        assert_eq!(pick(&["ja"], &["zh", "en"], "en").unwrap(), "en");
        assert!(matches!(
            pick(&["ja"], &["zh", "fr"], "en"),
            Err(ResourceError::NoLanguageMatch)
        ));
    }

    #[test]
    fn test_empty_default_is_config_error() {
        assert!(matches!(
            pick(&["en"], &["en"], ""),
            Err(ResourceError::MatcherConfig(_))
        ));
    }

    #[test]
    fn test_invalid_tags_are_skipped() {
        assert_eq!(pick(&["???", "zh"], &["bad tag", "zh"], "en").unwrap(), "zh");
    }

    #[test]
    fn test_deterministic_across_cache_state() {
        let matcher = LanguageMatcher::default();
        let first = matcher.best_index(&["zh-Hant"], &["zh-CN", "zh-HK"], "en").unwrap();
        for _ in 0..10 {
            let again = matcher.best_index(&["zh-Hant"], &["zh-CN", "zh-HK"], "en").unwrap();
            assert_eq!(first, again);
        }
        assert_eq!(matcher.cache().len(), 1);
    }
}
