use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::model::{HOLES_PER_ROUND, ScorecardKey, TransformedRow};
use crate::transform::TransformedBatch;

/// Per-player round totals pivoted for a human to eyeball before overwriting.
/// Rows are player initials, columns are `(round, edition)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSummary {
    pub columns: Vec<(u32, u32)>,
    pub rows: Vec<(String, Vec<String>)>,
}

impl ConflictSummary {
    /// Builds the pivot from `(edition, round, initials, score)` tuples.
    pub fn from_scores<'a>(scores: impl IntoIterator<Item = (u32, u32, &'a str, i32)>) -> Self {
        let mut totals: BTreeMap<(&str, u32, u32), i64> = BTreeMap::new();
        let mut columns = BTreeSet::new();
        for (teg, round, pl, score) in scores {
            *totals.entry((pl, round, teg)).or_default() += i64::from(score);
            columns.insert((round, teg));
        }
        let columns = columns.into_iter().collect::<Vec<_>>();
        let players = totals.keys().map(|(pl, _, _)| *pl).collect::<BTreeSet<_>>();
        let rows = players
            .into_iter()
            .map(|pl| {
                let cells = columns
                    .iter()
                    .map(|(round, teg)| {
                        totals
                            .get(&(pl, *round, *teg))
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "-".to_string())
                    })
                    .collect();
                (pl.to_string(), cells)
            })
            .collect();
        Self { columns, rows }
    }
}

impl fmt::Display for ConflictSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6}", "Pl")?;
        for (round, teg) in &self.columns {
            write!(f, " {:>10}", format!("R{round}/T{teg}"))?;
        }
        writeln!(f)?;
        for (pl, cells) in &self.rows {
            write!(f, "{pl:<6}")?;
            for cell in cells {
                write!(f, " {cell:>10}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Existing rows sharing any `(edition, round)` with the incoming batch.
pub fn find_conflicts<'a>(
    existing: &'a [TransformedRow],
    incoming: &[TransformedRow],
) -> Vec<&'a TransformedRow> {
    let pairs = incoming.iter().map(|r| r.round_key()).collect::<HashSet<_>>();
    existing
        .iter()
        .filter(|r| pairs.contains(&r.round_key()))
        .collect()
}

pub fn summarise_existing(conflicts: &[&TransformedRow]) -> ConflictSummary {
    ConflictSummary::from_scores(
        conflicts
            .iter()
            .map(|r| (r.teg_num, r.round, r.pl.as_str(), r.sc)),
    )
}

pub fn summarise_rows(rows: &[TransformedRow]) -> ConflictSummary {
    ConflictSummary::from_scores(rows.iter().map(|r| (r.teg_num, r.round, r.pl.as_str(), r.sc)))
}

/// Everything a decision-maker sees before choosing to replace or abort.
#[derive(Debug, Clone)]
pub struct ConflictReport {
    pub pairs: Vec<(u32, u32)>,
    pub existing_rows: usize,
    pub incoming_rows: usize,
    /// Existing totals for the conflicting rounds.
    pub summary: ConflictSummary,
    /// Totals of the incoming batch, same layout as `summary`.
    pub incoming: ConflictSummary,
    pub unknown_players: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Replace,
    Abort,
}

/// Gate between a conflicting batch and the score store.
pub trait MergeDecider {
    fn decide(&mut self, report: &ConflictReport) -> Resolution;
}

impl<F> MergeDecider for F
where
    F: FnMut(&ConflictReport) -> Resolution,
{
    fn decide(&mut self, report: &ConflictReport) -> Resolution {
        self(report)
    }
}

/// Unattended runs never overwrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAbort;

impl MergeDecider for AlwaysAbort {
    fn decide(&mut self, _report: &ConflictReport) -> Resolution {
        Resolution::Abort
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReplace;

impl MergeDecider for AlwaysReplace {
    fn decide(&mut self, _report: &ConflictReport) -> Resolution {
        Resolution::Replace
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Appended,
    Replaced,
    Aborted,
}

impl MergeDecision {
    pub fn changed(self) -> bool {
        !matches!(self, Self::Aborted)
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub rows: Vec<TransformedRow>,
    pub decision: MergeDecision,
    /// Present only when the batch overlapped existing rounds.
    pub report: Option<ConflictReport>,
}

pub fn merge(
    existing: Vec<TransformedRow>,
    batch: TransformedBatch,
    decider: &mut dyn MergeDecider,
) -> MergeOutcome {
    let (conflicting, summary) = {
        let conflicts = find_conflicts(&existing, &batch.rows);
        (conflicts.len(), summarise_existing(&conflicts))
    };
    if conflicting == 0 {
        info!(rows = batch.rows.len(), "no existing rounds found, appending new data");
        let mut rows = existing;
        rows.extend(batch.rows);
        return MergeOutcome {
            rows,
            decision: MergeDecision::Appended,
            report: None,
        };
    }

    let pairs = batch
        .rows
        .iter()
        .map(|r| r.round_key())
        .collect::<BTreeSet<_>>();
    let report = ConflictReport {
        pairs: pairs.iter().copied().collect(),
        existing_rows: conflicting,
        incoming_rows: batch.rows.len(),
        summary,
        incoming: summarise_rows(&batch.rows),
        unknown_players: batch.unknown_players.clone(),
    };
    warn!(
        existing = report.existing_rows,
        incoming = report.incoming_rows,
        "existing scores found for incoming rounds"
    );

    match decider.decide(&report) {
        Resolution::Abort => {
            info!("merge aborted, existing scores unchanged");
            MergeOutcome {
                rows: existing,
                decision: MergeDecision::Aborted,
                report: Some(report),
            }
        }
        Resolution::Replace => {
            let mut rows = existing
                .into_iter()
                .filter(|r| !pairs.contains(&r.round_key()))
                .collect::<Vec<_>>();
            rows.extend(batch.rows);
            info!(rounds = pairs.len(), "replaced existing rounds");
            MergeOutcome {
                rows,
                decision: MergeDecision::Replaced,
                report: Some(report),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCount {
    #[serde(rename = "TEGNum")]
    pub teg_num: u32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Pl")]
    pub pl: String,
    #[serde(rename = "EntryCount")]
    pub entry_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Fewer than 18 holes recorded.
    pub incomplete: Vec<EntryCount>,
    /// More than 18 holes recorded.
    pub duplicate: Vec<EntryCount>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.incomplete.is_empty() && self.duplicate.is_empty()
    }
}

/// Reports every scorecard whose hole count is not exactly 18. Nothing is fixed.
pub fn validate<R: ScorecardKey>(rows: &[R]) -> ValidationReport {
    let mut counts: BTreeMap<(u32, u32, &str), usize> = BTreeMap::new();
    for r in rows {
        *counts.entry(r.scorecard_key()).or_default() += 1;
    }
    let mut report = ValidationReport::default();
    for ((teg_num, round, pl), entry_count) in counts {
        let entry = EntryCount {
            teg_num,
            round,
            pl: pl.to_string(),
            entry_count,
        };
        if entry_count < HOLES_PER_ROUND {
            report.incomplete.push(entry);
        } else if entry_count > HOLES_PER_ROUND {
            report.duplicate.push(entry);
        }
    }
    report
}

/// Validation of the flat score store and the canonical store, run separately
/// since a faulty rebuild can make them diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCheck {
    pub scores: ValidationReport,
    pub data: ValidationReport,
    pub scores_rows: usize,
    pub data_rows: usize,
}

impl StoreCheck {
    pub fn row_counts_match(&self) -> bool {
        self.scores_rows == self.data_rows
    }

    pub fn is_clean(&self) -> bool {
        self.scores.is_clean() && self.data.is_clean() && self.row_counts_match()
    }
}

pub fn check_stores<A: ScorecardKey, B: ScorecardKey>(scores: &[A], data: &[B]) -> StoreCheck {
    let check = StoreCheck {
        scores: validate(scores),
        data: validate(data),
        scores_rows: scores.len(),
        data_rows: data.len(),
    };
    log_report("all-scores", &check.scores);
    log_report("all-data", &check.data);
    if !check.row_counts_match() {
        warn!(
            scores = check.scores_rows,
            data = check.data_rows,
            "score store and canonical store row counts differ"
        );
    }
    check
}

fn log_report(store: &str, report: &ValidationReport) {
    if report.incomplete.is_empty() {
        info!(store, "no incomplete data found");
    } else {
        warn!(store, groups = report.incomplete.len(), "incomplete data found");
    }
    if report.duplicate.is_empty() {
        info!(store, "no duplicate data found");
    } else {
        warn!(store, groups = report.duplicate.len(), "duplicate data found");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_pivots_with_dash_for_missing() {
        let summary = ConflictSummary::from_scores(vec![
            (5, 1, "AB", 4),
            (5, 1, "AB", 5),
            (5, 2, "AB", 3),
            (5, 1, "JB", 6),
        ]);
        assert_eq!(summary.columns, vec![(1, 5), (2, 5)]);
        assert_eq!(
            summary.rows,
            vec![
                ("AB".to_string(), vec!["9".to_string(), "3".to_string()]),
                ("JB".to_string(), vec!["6".to_string(), "-".to_string()]),
            ]
        );
        let text = summary.to_string();
        assert!(text.contains("R1/T5"));
    }
}
