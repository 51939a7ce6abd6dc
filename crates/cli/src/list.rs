use strata_core::config::EngineConfig;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Descriptor")]
    descriptor: String,
    #[tabled(rename = "Layers")]
    layers: String,
}

pub fn run(config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = strata_runtime::build_engine(config)?;
    let manager = engine.manager();

    let paths = manager.list()?;
    let rows: Vec<ResourceRow> = manager
        .associate(paths.as_slice())?
        .into_iter()
        .map(|described| {
            let layers: Vec<&str> = manager
                .layers()
                .iter()
                .filter(|layer| layer.exists(&described.path).unwrap_or(false))
                .map(|layer| layer.level().as_str())
                .collect();
            ResourceRow {
                descriptor: described.descriptor.name().to_string(),
                path: described.path,
                layers: layers.join(", "),
            }
        })
        .collect();

    if rows.is_empty() {
        println!("No resources found.");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}
