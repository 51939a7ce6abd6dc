use std::io::Write;
use strata_api::Artifact;
use strata_core::config::EngineConfig;

pub fn run(
    config: &EngineConfig,
    path: &str,
    langs: &[String],
    app: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = strata_runtime::build_engine(config)?;
    let view = engine.view_for(path, langs, app);

    match engine.read(path, &view)? {
        Artifact::Bytes(data) => std::io::stdout().write_all(&data)?,
        Artifact::Asset(asset) => {
            eprintln!(
                "{} ({})",
                asset.path,
                asset.language_tag.as_deref().unwrap_or("-")
            );
            std::io::stdout().write_all(&asset.data)?;
        }
        Artifact::Translations(map) => {
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        Artifact::Document(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Artifact::Validated => println!("ok"),
    }
    Ok(())
}
