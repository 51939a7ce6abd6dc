mod common;

use common::memory;
use include_dir::{Dir, include_dir};
use std::sync::Arc;
use strata_core::descriptors::{BundleDescriptor, GeneratedAssetDescriptor, TranslationDescriptor};
use strata_core::intl::LanguageMatcher;
use strata_core::layer::{EmbeddedLayer, Layer, LayerLevel};
use strata_core::{ManifestResolver, Manager, Registry, View};

static BUILTIN: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/tests/fixtures/builtin");

fn builtin() -> Arc<dyn Layer> {
    Arc::new(EmbeddedLayer::new("embedded", LayerLevel::Builtin, &BUILTIN))
}

#[test]
fn test_embedded_layer_reads_and_walks() {
    let layer = builtin();
    assert_eq!(layer.read("static/app.css").unwrap(), b"body{margin:0}");
    let err = layer.read("static/missing.css").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);

    let paths = layer.walk().unwrap();
    assert!(paths.contains(&"templates/zh-Hant/translation.json".to_string()));
    assert!(paths.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_embedded_subdirectory_is_its_own_root() {
    let layer = EmbeddedLayer::new(
        "embedded-generated",
        LayerLevel::Builtin,
        BUILTIN.get_dir("generated").unwrap(),
    );
    assert_eq!(
        layer.walk().unwrap(),
        vec!["index.5f3a9c.js".to_string(), "manifest.json".to_string()]
    );
    assert!(layer.read("manifest.json").is_ok());
    assert_eq!(layer.stat("manifest.json").unwrap(), strata_core::layer::EntryKind::File);
    assert!(layer.read("generated/manifest.json").is_err());

    let names: Vec<String> = layer.read_dir("").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["index.5f3a9c.js", "manifest.json"]);

    let manifest = ManifestResolver::from_layer(Arc::new(layer), "manifest.json").unwrap();
    assert_eq!(manifest.asset_name("index.js").unwrap(), "index.5f3a9c.js");
}

#[test]
fn test_embedded_builtin_under_directory_overrides() {
    let matcher = Arc::new(LanguageMatcher::default());
    let manifest: Arc<dyn Layer> = Arc::new(EmbeddedLayer::new(
        "embedded-generated",
        LayerLevel::Builtin,
        BUILTIN.get_dir("generated").unwrap(),
    ));
    let manifest = Arc::new(ManifestResolver::from_layer(manifest, "manifest.json").unwrap());
    let registry = Registry::new()
        .with(Arc::new(BundleDescriptor::css("static/app.css")))
        .with(Arc::new(TranslationDescriptor::new(matcher)))
        .with(Arc::new(GeneratedAssetDescriptor::new(
            "generated",
            "index.js",
            Arc::clone(&manifest),
        )));
    let app = memory(
        "app",
        LayerLevel::App,
        &[("templates/zh-Hant/translation.json", r#"{"greeting": "哈囉"}"#)],
    );
    let manager = Manager::new(Arc::new(registry), vec![builtin(), app]).unwrap();

    let translations = manager
        .read_path(
            "templates/zh-Hant/translation.json",
            &View::effective_resource(["zh-TW"], "en"),
        )
        .unwrap()
        .into_translations()
        .unwrap();
    assert_eq!(translations["greeting"].value, "哈囉");
    assert_eq!(translations["app.name"].value, "Strata");

    let asset = manager
        .read_path("generated/index.js", &View::effective_file("generated/index.js", "en"))
        .unwrap()
        .into_asset()
        .unwrap();
    assert_eq!(asset.path, "generated/index.5f3a9c.js");
    assert_eq!(asset.data, b"console.log(\"strata\");\n");

    let listed = manager.list().unwrap();
    assert!(listed.contains(&"static/app.css".to_string()));
    assert!(listed.contains(&"templates/__default__/translation.json".to_string()));
    // Only physical files are listed; the logical key has none.
    assert!(!listed.contains(&"generated/index.js".to_string()));
}
