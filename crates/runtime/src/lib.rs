use include_dir::{Dir, include_dir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_api::{Artifact, View};
use strata_core::config::{EngineConfig, ManifestMode};
use strata_core::descriptors::{
    BundleDescriptor, GeneratedAssetDescriptor, ImageDescriptor, LocaleImageDescriptor,
    PassthroughDescriptor, STATIC_ROOT, SecretsDescriptor, StaticImageDescriptor,
    TemplateDescriptor, TranslationDescriptor,
};
use strata_core::intl::LanguageMatcher;
use strata_core::layer::{DirLayer, EmbeddedLayer, Layer, LayerLevel};
use strata_core::manifest::ManifestResolver;
use strata_core::{Manager, Registry, ResourceError, Result};
use tracing_appender::non_blocking::WorkerGuard;

/// Builtin resources compiled into the binary.
static BUILTIN: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/resources");

/// Where build-generated assets and their manifest live in every layer.
pub const GENERATED_ROOT: &str = "static/generated";

pub const TEMPLATES: &[&str] = &["email/welcome.txt", "sms/otp.txt"];

/// A manager over the configured layers plus the manifest it serves
/// generated assets through.
pub struct Engine {
    manager: Manager,
    manifest: Arc<ManifestResolver>,
    matcher: Arc<LanguageMatcher>,
    default_language: String,
}

impl Engine {
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn manifest(&self) -> &Arc<ManifestResolver> {
        &self.manifest
    }

    pub fn matcher(&self) -> &Arc<LanguageMatcher> {
        &self.matcher
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// The view a caller usually wants for `path`: the app file, the
    /// locale-resolved resource when languages are given, else the merged file.
    pub fn view_for(&self, path: &str, preferred: &[String], app: bool) -> View {
        if app {
            View::app_file(path)
        } else if preferred.is_empty() {
            View::effective_file(path, self.default_language.as_str())
        } else {
            View::effective_resource(preferred.iter().cloned(), self.default_language.as_str())
        }
    }

    pub fn read(&self, path: &str, view: &View) -> Result<Artifact> {
        self.manager.read_path(path, view)
    }

    /// Physical name and content of the generated asset `key`.
    pub fn asset(&self, key: &str) -> Result<(String, Vec<u8>)> {
        let physical = self.manifest.asset_name(key)?;
        let data = self.manifest.read(&physical)?;
        Ok((physical, data))
    }

    pub fn shutdown(&self) {
        self.manifest.shutdown();
    }
}

/// Assemble the default engine described by `config`.
///
/// Live manifests spawn their watcher on the current tokio runtime, so call
/// this from inside one when `manifest.mode` is `live`.
pub fn build_engine(config: &EngineConfig) -> Result<Engine> {
    config.validate()?;

    let builtin: Arc<dyn Layer> = match &config.builtin_dir {
        Some(dir) => Arc::new(DirLayer::new(dir, LayerLevel::Builtin)),
        None => Arc::new(EmbeddedLayer::new("embedded", LayerLevel::Builtin, &BUILTIN)),
    };
    let mut layers = vec![builtin];
    if let Some(dir) = &config.custom_dir {
        layers.push(Arc::new(DirLayer::new(dir, LayerLevel::Custom)));
    }
    if let Some(dir) = &config.app_dir {
        layers.push(Arc::new(DirLayer::new(dir, LayerLevel::App)));
    }

    let manifest = Arc::new(open_manifest(config)?);
    let matcher = Arc::new(LanguageMatcher::new(config.matcher.idle_ttl()));
    let registry = default_registry(config, &matcher, &manifest);
    tracing::info!(
        "engine ready: {} layer(s), {} descriptor(s), manifest {}",
        layers.len(),
        registry.len(),
        if manifest.is_live() { "live" } else { "static" }
    );

    Ok(Engine {
        manager: Manager::new(Arc::new(registry), layers)?,
        manifest,
        matcher,
        default_language: config.default_language.clone(),
    })
}

fn open_manifest(config: &EngineConfig) -> Result<ManifestResolver> {
    let manifest = &config.manifest;
    let dir: Option<PathBuf> = manifest
        .dir
        .clone()
        .or_else(|| config.builtin_dir.as_deref().map(generated_dir));

    match (manifest.mode, dir) {
        (ManifestMode::Live, Some(dir)) => {
            ManifestResolver::watch_dir(dir, &manifest.file_name, manifest.watch_options())
        }
        (ManifestMode::Live, None) => Err(ResourceError::Configuration(
            "live manifest needs a directory".to_string(),
        )),
        (ManifestMode::Static, Some(dir)) => ManifestResolver::from_layer(
            Arc::new(DirLayer::new(dir, LayerLevel::Builtin)),
            &manifest.file_name,
        ),
        (ManifestMode::Static, None) => {
            let generated = BUILTIN.get_dir(GENERATED_ROOT).ok_or_else(|| {
                ResourceError::Configuration(format!("embedded resources lack {GENERATED_ROOT}"))
            })?;
            ManifestResolver::from_layer(
                Arc::new(EmbeddedLayer::new("embedded-generated", LayerLevel::Builtin, generated)),
                &manifest.file_name,
            )
        }
    }
}

fn generated_dir(builtin: &Path) -> PathBuf {
    builtin.join(GENERATED_ROOT)
}

/// Every resource kind the default engine serves.
pub fn default_registry(
    config: &EngineConfig,
    matcher: &Arc<LanguageMatcher>,
    manifest: &Arc<ManifestResolver>,
) -> Registry {
    let static_path = |name: &str| format!("{STATIC_ROOT}/{name}");
    let mut registry = Registry::new()
        .with(Arc::new(BundleDescriptor::css(static_path("app.css"))))
        .with(Arc::new(BundleDescriptor::js(static_path("app.js"))))
        .with(Arc::new(PassthroughDescriptor::new(static_path("robots.txt"))))
        .with(Arc::new(
            TranslationDescriptor::new(Arc::clone(matcher))
                .with_default_tag(config.default_language.as_str()),
        ))
        .with(Arc::new(
            LocaleImageDescriptor::new("logo", Arc::clone(matcher)).with_size_limit(config.size_limit),
        ))
        .with(Arc::new(StaticImageDescriptor::new("favicon")))
        .with(Arc::new(
            ImageDescriptor::new("banner").with_size_limit(config.size_limit),
        ))
        .with(Arc::new(SecretsDescriptor::new()));

    for template in TEMPLATES {
        registry.register(Arc::new(TemplateDescriptor::new(*template, Arc::clone(matcher))));
    }
    for key in &config.manifest.assets {
        registry.register(Arc::new(GeneratedAssetDescriptor::new(
            GENERATED_ROOT,
            key.as_str(),
            Arc::clone(manifest),
        )));
    }
    registry
}

/// Initializes logging for a component. This delegates to the core logging module.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    strata_core::logging::init_logging(component, to_stderr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.manifest.assets = vec!["index.js".to_string()];
        config
    }

    #[test]
    fn test_embedded_defaults_resolve() {
        let engine = build_engine(&config()).unwrap();
        assert!(!engine.manifest().is_live());

        let css = engine
            .read("static/app.css", &engine.view_for("static/app.css", &[], false))
            .unwrap();
        assert!(String::from_utf8_lossy(css.as_bytes().unwrap()).contains("--strata-primary"));

        let welcome = engine
            .read(
                "templates/en/email/welcome.txt",
                &engine.view_for("templates/en/email/welcome.txt", &["zh-HK".to_string()], false),
            )
            .unwrap()
            .into_asset()
            .unwrap();
        assert_eq!(welcome.language_tag.as_deref(), Some("zh-Hant"));

        let logo = engine
            .read("static/en/logo.png", &engine.view_for("static/en/logo.png", &["fr".to_string()], false))
            .unwrap()
            .into_asset()
            .unwrap();
        assert_eq!(logo.path, "static/__default__/logo.png");
        assert_eq!(logo.language_tag.as_deref(), Some("en"));
    }

    #[test]
    fn test_generated_asset_through_manifest() {
        let engine = build_engine(&config()).unwrap();
        let (physical, data) = engine.asset("index.js").unwrap();
        assert_eq!(physical, "index.3f9a1c0d.js");
        assert!(data.starts_with(b"window.strataBuild"));

        let via_manager = engine
            .read(
                "static/generated/index.js.map",
                &View::effective_file("static/generated/index.js.map", "en"),
            )
            .unwrap()
            .into_asset()
            .unwrap();
        assert_eq!(via_manager.path, "static/generated/index.3f9a1c0d.js.map");
        assert!(engine.asset("missing.js").unwrap_err().is_not_found());
    }

    #[test]
    fn test_app_dir_overrides_builtin() {
        let app = TempDir::new().unwrap();
        std::fs::create_dir_all(app.path().join("templates/en")).unwrap();
        std::fs::write(
            app.path().join("templates/en/translation.json"),
            r#"{"app.name": "Acme"}"#,
        )
        .unwrap();

        let mut config = config();
        config.app_dir = Some(app.path().to_path_buf());
        let engine = build_engine(&config).unwrap();

        let translations = engine
            .read(
                "templates/en/translation.json",
                &View::effective_resource(["zh-TW"], "en"),
            )
            .unwrap()
            .into_translations()
            .unwrap();
        assert_eq!(translations["app.name"].value, "Acme");
        assert_eq!(translations["greeting"].value, "您好");

        let app_file = engine
            .read(
                "templates/en/translation.json",
                &engine.view_for("templates/en/translation.json", &[], true),
            )
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(app_file.as_bytes().unwrap()).unwrap();
        assert_eq!(doc["app.name"], "Acme");
    }

    #[test]
    fn test_live_manifest_requires_runtime() {
        let dir = TempDir::new().unwrap();
        let mut config = config();
        config.manifest.mode = ManifestMode::Live;
        config.manifest.dir = Some(dir.path().to_path_buf());
        assert!(matches!(
            build_engine(&config),
            Err(ResourceError::Configuration(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_live_manifest_follows_rebuilds() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("manifest.json"), r#"{"index.js": "index.a.js"}"#).unwrap();
        let mut config = config();
        config.manifest.mode = ManifestMode::Live;
        config.manifest.dir = Some(dir.path().to_path_buf());
        config.manifest.debounce_ms = 20;

        let engine = build_engine(&config).unwrap();
        assert!(engine.manifest().is_live());
        assert_eq!(engine.manifest().asset_name("index.js").unwrap(), "index.a.js");

        std::fs::write(dir.path().join("manifest.json"), r#"{"index.js": "index.bb.js"}"#).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while engine.manifest().asset_name("index.js").unwrap() != "index.bb.js" {
            assert!(tokio::time::Instant::now() < deadline, "manifest was not reloaded");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        engine.shutdown();
    }
}
