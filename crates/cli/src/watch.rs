use strata_core::config::{EngineConfig, ManifestMode};
use tracing::info;

pub async fn run(mut config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.manifest.mode = ManifestMode::Live;
    let engine = strata_runtime::build_engine(&config)?;

    let manifest = engine.manifest();
    info!(
        "Watching manifest {} ({} entries).",
        manifest.file_name(),
        manifest.current().len()
    );
    info!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    engine.shutdown();
    info!("Watcher stopped.");

    Ok(())
}
