use anyhow::{Context, Result};

use teg_stats::config::Paths;
use teg_stats::pipeline;

fn main() -> Result<()> {
    teg_stats::init_logging();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let paths = Paths::resolve(&args);

    let summary = pipeline::rebuild_all_data(&paths)
        .with_context(|| format!("rebuilding canonical data in {}", paths.data_dir.display()))?;

    println!("Canonical data rebuilt");
    println!("Parquet: {}", paths.all_data_parquet().display());
    println!("CSV: {}", paths.all_data_csv().display());
    println!("Rows: {}", summary.rows);
    println!("Players: {}", summary.players);
    println!("Editions: {}", summary.editions);
    Ok(())
}
