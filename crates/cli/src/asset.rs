use std::io::Write;
use strata_core::config::EngineConfig;

pub fn run(config: &EngineConfig, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = strata_runtime::build_engine(config)?;
    let (physical, data) = engine.asset(key)?;
    eprintln!("{key} -> {physical} ({} bytes)", data.len());
    std::io::stdout().write_all(&data)?;
    Ok(())
}
