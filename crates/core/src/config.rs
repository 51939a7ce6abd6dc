use crate::error::ResourceError;
use crate::manifest::{DEFAULT_MANIFEST_FILE, WatchBackend, WatchOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LANGUAGE: &str = "en";
pub use crate::resource::descriptor::DEFAULT_SIZE_LIMIT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for ResourceError {
    fn from(err: ConfigError) -> Self {
        ResourceError::Configuration(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overrides the embedded builtin snapshot.
    pub builtin_dir: Option<PathBuf>,
    pub custom_dir: Option<PathBuf>,
    pub app_dir: Option<PathBuf>,
    pub default_language: String,
    /// Largest file, in bytes, an edit may write.
    pub size_limit: usize,
    pub matcher: MatcherConfig,
    pub manifest: ManifestConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            builtin_dir: None,
            custom_dir: None,
            app_dir: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            size_limit: DEFAULT_SIZE_LIMIT,
            matcher: MatcherConfig::default(),
            manifest: ManifestConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.default_language.trim().is_empty() {
            return Err(ConfigError::Invalid("default_language is empty".to_string()));
        }
        if self.manifest.mode == ManifestMode::Live
            && self.manifest.dir.is_none()
            && self.builtin_dir.is_none()
        {
            return Err(ConfigError::Invalid(
                "live manifest mode needs manifest.dir or builtin_dir".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Compiled matchers unused for this long are evicted.
    pub idle_ttl_secs: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { idle_ttl_secs: 600 }
    }
}

impl MatcherConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestMode {
    /// Read once at startup.
    #[default]
    Static,
    /// Reloaded in the background whenever the file changes.
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub mode: ManifestMode,
    /// Directory holding the manifest. Defaults to the generated root of the
    /// builtin layer.
    pub dir: Option<PathBuf>,
    pub file_name: String,
    /// Logical keys served as generated assets.
    pub assets: Vec<String>,
    pub backend: WatchBackend,
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            mode: ManifestMode::Static,
            dir: None,
            file_name: DEFAULT_MANIFEST_FILE.to_string(),
            assets: Vec::new(),
            backend: WatchBackend::Native,
            debounce_ms: 100,
            poll_interval_ms: 1000,
        }
    }
}

impl ManifestConfig {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            backend: self.backend,
            debounce: Duration::from_millis(self.debounce_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_takes_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"app_dir": "/srv/app", "manifest": {{"mode": "live", "dir": "/srv/gen", "backend": "poll"}}}}"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.app_dir, Some(PathBuf::from("/srv/app")));
        assert_eq!(config.default_language, "en");
        assert_eq!(config.size_limit, DEFAULT_SIZE_LIMIT);
        assert_eq!(config.matcher.idle_ttl(), Duration::from_secs(600));
        assert_eq!(config.manifest.mode, ManifestMode::Live);
        assert_eq!(config.manifest.file_name, "manifest.json");

        let options = config.manifest.watch_options();
        assert_eq!(options.backend, WatchBackend::Poll);
        assert_eq!(options.debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_live_without_dir_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"manifest": {{"mode": "live"}}}}"#).unwrap();
        assert!(matches!(
            EngineConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_json_maps_to_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err: ResourceError = EngineConfig::load(file.path()).unwrap_err().into();
        assert!(matches!(err, ResourceError::Configuration(_)));
    }
}
