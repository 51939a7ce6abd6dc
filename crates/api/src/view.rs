//! Request shapes understood by every descriptor.
//!
//! A [`View`] is built per call and never mutated. Descriptors dispatch on the
//! variant with an exhaustive `match`, so adding a variant is a compile error
//! in every policy until it is handled.

use serde::{Deserialize, Serialize};

/// Fetch exactly one path from the editable layer only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppFileView {
    pub path: String,
    /// Keys that may be shown and edited for secret-bearing kinds.
    #[serde(default)]
    pub allowed_keys: Vec<String>,
}

impl AppFileView {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            allowed_keys: Vec::new(),
        }
    }

    pub fn with_allowed_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_key_allowed(&self, key: &str) -> bool {
        self.allowed_keys.iter().any(|k| k == key)
    }
}

/// Fetch one path merged across all layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveFileView {
    pub path: String,
    /// Language tag that files under the default marker stand in for.
    #[serde(default)]
    pub default_tag: String,
}

impl EffectiveFileView {
    pub fn new(path: impl Into<String>, default_tag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_tag: default_tag.into(),
        }
    }
}

/// Fetch a locale-resolved artifact with no fixed path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveResourceView {
    /// Most preferred first.
    #[serde(default)]
    pub preferred_tags: Vec<String>,
    pub default_tag: String,
}

impl EffectiveResourceView {
    pub fn new<I, S>(preferred_tags: I, default_tag: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preferred_tags: preferred_tags.into_iter().map(Into::into).collect(),
            default_tag: default_tag.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    AppFile(AppFileView),
    EffectiveFile(EffectiveFileView),
    EffectiveResource(EffectiveResourceView),
    /// Validate every discovered file; yields no payload.
    ValidateResource,
}

impl View {
    pub fn app_file(path: impl Into<String>) -> Self {
        View::AppFile(AppFileView::new(path))
    }

    pub fn effective_file(path: impl Into<String>, default_tag: impl Into<String>) -> Self {
        View::EffectiveFile(EffectiveFileView::new(path, default_tag))
    }

    pub fn effective_resource<I, S>(preferred_tags: I, default_tag: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        View::EffectiveResource(EffectiveResourceView::new(preferred_tags, default_tag))
    }

    /// Short name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            View::AppFile(_) => "app_file",
            View::EffectiveFile(_) => "effective_file",
            View::EffectiveResource(_) => "effective_resource",
            View::ValidateResource => "validate_resource",
        }
    }
}

impl From<AppFileView> for View {
    fn from(view: AppFileView) -> Self {
        View::AppFile(view)
    }
}

impl From<EffectiveFileView> for View {
    fn from(view: EffectiveFileView) -> Self {
        View::EffectiveFile(view)
    }
}

impl From<EffectiveResourceView> for View {
    fn from(view: EffectiveResourceView) -> Self {
        View::EffectiveResource(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_json_shape() {
        let view = View::effective_resource(["zh-HK", "en"], "en");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["kind"], "effective_resource");
        assert_eq!(json["preferred_tags"][0], "zh-HK");

        let back: View = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }

    #[test]
    fn test_allowed_keys() {
        let view = AppFileView::new("secrets.json").with_allowed_keys(["smtp.password"]);
        assert!(view.is_key_allowed("smtp.password"));
        assert!(!view.is_key_allowed("db.url"));
    }
}
