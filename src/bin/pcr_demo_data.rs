//! Writes the synthetic demo tables into the current directory.

use anyhow::{Context, Result};
use expression_pcr::generator::{generate_demo_data, write_demo_data};
use expression_pcr::DemoConfig;

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = DemoConfig::default();
    let data = generate_demo_data(&config).context("generating demo data")?;
    let (expression, labels) =
        write_demo_data(&data, ".").context("writing demo tables to the current directory")?;

    println!(
        "Demo data generated: {} and {}",
        expression.display(),
        labels.display()
    );
    Ok(())
}
