use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use teg_stats::config::{LeagueConfig, Paths};
use teg_stats::pipeline::{self, ImportOptions};
use teg_stats::reconcile::{
    AlwaysAbort, AlwaysReplace, ConflictReport, MergeDecider, MergeDecision, Resolution,
};

const PROMPT: &str = "Replace all existing scores with new data? (yes/no)";

fn main() -> Result<()> {
    teg_stats::init_logging();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let paths = Paths::resolve(&args);
    let config = LeagueConfig::load(&paths.config)
        .with_context(|| format!("loading league config {}", paths.config.display()))?;

    if has_flag(&args, "--init") && pipeline::init_store(&paths)? {
        println!("Created empty score store {}", paths.all_scores().display());
    }

    let options = ImportOptions {
        complete_rounds_only: has_flag(&args, "--complete-only"),
    };
    let mut decider: Box<dyn MergeDecider> = if has_flag(&args, "--yes") {
        Box::new(AlwaysReplace)
    } else if has_flag(&args, "--no") {
        Box::new(AlwaysAbort)
    } else {
        Box::new(ConsoleDecider::new(io::stdin().lock(), io::stdout()))
    };

    let summary = pipeline::import_rounds(&paths, &config, decider.as_mut(), options)
        .with_context(|| format!("importing rounds from {}", paths.round_input().display()))?;

    println!("Round import complete");
    println!("Data dir: {}", paths.data_dir.display());
    println!("Incoming rows: {}", summary.incoming_rows);
    if summary.skipped_rows > 0 {
        println!("Skipped (incomplete rounds): {}", summary.skipped_rows);
    }
    if !summary.unknown_players.is_empty() {
        println!("Unknown players: {}", summary.unknown_players.join(", "));
    }
    match summary.decision {
        MergeDecision::Appended => println!("Appended to score store"),
        MergeDecision::Replaced => println!("Replaced existing rounds"),
        MergeDecision::Aborted => println!("No changes made"),
    }
    println!("Score store rows: {}", summary.store_rows);
    if let Some(rebuilt) = summary.rebuilt {
        println!(
            "Canonical data: {} rows, {} players, {} editions",
            rebuilt.rows, rebuilt.players, rebuilt.editions
        );
    }
    Ok(())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Shows the conflict summary and asks before overwriting. Anything but
/// `yes`/`y`, including end of input, aborts.
struct ConsoleDecider<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleDecider<R, W> {
    fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, report: &ConflictReport) -> io::Result<Resolution> {
        writeln!(self.output, "Existing data for the rounds being imported:")?;
        write!(self.output, "{}", report.summary)?;
        writeln!(self.output, "New data:")?;
        write!(self.output, "{}", report.incoming)?;
        if !report.unknown_players.is_empty() {
            writeln!(
                self.output,
                "Unknown players in new data: {}",
                report.unknown_players.join(", ")
            )?;
        }
        write!(self.output, "{PROMPT} ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Resolution::Abort);
        }
        Ok(match line.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Resolution::Replace,
            _ => Resolution::Abort,
        })
    }
}

impl<R: BufRead, W: Write> MergeDecider for ConsoleDecider<R, W> {
    fn decide(&mut self, report: &ConflictReport) -> Resolution {
        self.ask(report).unwrap_or_else(|err| {
            tracing::warn!(%err, "could not read answer, treating as no");
            Resolution::Abort
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teg_stats::reconcile::ConflictSummary;

    fn report() -> ConflictReport {
        ConflictReport {
            pairs: vec![(5, 2)],
            existing_rows: 18,
            incoming_rows: 18,
            summary: ConflictSummary::from_scores(vec![(5, 2, "AB", 90)]),
            incoming: ConflictSummary::from_scores(vec![(5, 2, "AB", 87)]),
            unknown_players: vec!["ZZ".to_string()],
        }
    }

    #[test]
    fn console_accepts_only_yes() {
        for (answer, want) in [
            ("yes\n", Resolution::Replace),
            ("Y\n", Resolution::Replace),
            ("no\n", Resolution::Abort),
            ("maybe\n", Resolution::Abort),
            ("", Resolution::Abort),
        ] {
            let mut out = Vec::new();
            let mut decider = ConsoleDecider::new(answer.as_bytes(), &mut out);
            assert_eq!(decider.decide(&report()), want, "answer {answer:?}");
            let shown = String::from_utf8(out).unwrap();
            assert!(shown.contains(PROMPT));
            assert!(shown.contains("ZZ"));
            assert!(shown.contains("90") && shown.contains("87"));
        }
    }
}
