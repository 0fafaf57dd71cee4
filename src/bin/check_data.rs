use anyhow::{Context, Result};

use teg_stats::config::Paths;
use teg_stats::pipeline;
use teg_stats::reconcile::{EntryCount, ValidationReport};

fn main() -> Result<()> {
    teg_stats::init_logging();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let paths = Paths::resolve(&args);

    let check = pipeline::check_data(&paths)
        .with_context(|| format!("checking stores in {}", paths.data_dir.display()))?;

    print_report("all-scores.csv", &check.scores);
    print_report("all-data.parquet", &check.data);
    println!(
        "Row counts: all-scores {} / all-data {}",
        check.scores_rows, check.data_rows
    );
    if !check.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(store: &str, report: &ValidationReport) {
    println!("== {store} ==");
    print_table("Incomplete", &report.incomplete);
    print_table("Duplicate", &report.duplicate);
}

fn print_table(label: &str, rows: &[EntryCount]) {
    if rows.is_empty() {
        println!("{label}: none");
        return;
    }
    println!("{label}:");
    println!("{:>6} {:>5} {:<4} {:>10}", "TEGNum", "Round", "Pl", "EntryCount");
    for r in rows {
        println!(
            "{:>6} {:>5} {:<4} {:>10}",
            r.teg_num, r.round, r.pl, r.entry_count
        );
    }
}
