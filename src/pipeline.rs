use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::{LeagueConfig, Paths};
use crate::cumulative::{add_cumulative_scores, join_round_info};
use crate::error::Result;
use crate::handicaps::prepare_handicaps;
use crate::model::{CanonicalRow, RoundInfo, TransformedRow};
use crate::persist::{self, StoreFiles};
use crate::reconcile::{self, ConflictReport, MergeDecider, MergeDecision, StoreCheck};
use crate::reshape::{ROUND_ID_COLUMNS, filter_complete_rounds, reshape_round_data};
use crate::transform::transform;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Keep only (edition, round, player) groups with all 18 holes.
    pub complete_rounds_only: bool,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub incoming_rows: usize,
    pub skipped_rows: usize,
    pub unknown_players: Vec<String>,
    pub decision: MergeDecision,
    pub report: Option<ConflictReport>,
    pub store_rows: usize,
    pub rebuilt: Option<RebuildSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildSummary {
    pub rows: usize,
    pub players: usize,
    pub editions: usize,
}

impl RebuildSummary {
    fn of(rows: &[CanonicalRow]) -> Self {
        Self {
            rows: rows.len(),
            players: rows.iter().map(|r| r.base.pl.as_str()).collect::<BTreeSet<_>>().len(),
            editions: rows.iter().map(|r| r.base.teg_num).collect::<BTreeSet<_>>().len(),
        }
    }
}

/// Creates an empty score store when none exists. Returns whether one was created.
pub fn init_store(paths: &Paths) -> Result<bool> {
    let path = paths.all_scores();
    if path.exists() {
        return Ok(false);
    }
    persist::save_scores(&path, &[])?;
    info!(path = %path.display(), "empty score store created");
    Ok(true)
}

/// Wide round sheet in, both stores out. Nothing is written until every step
/// has succeeded in memory, and nothing at all on abort.
pub fn import_rounds(
    paths: &Paths,
    config: &LeagueConfig,
    decider: &mut dyn MergeDecider,
    options: ImportOptions,
) -> Result<ImportSummary> {
    let wide = persist::load_wide_table(&paths.round_input())?;
    let handicap_table = persist::load_wide_table(&paths.handicaps())?;
    let existing = persist::load_scores(&paths.all_scores())?;
    let round_info = persist::load_round_info(&paths.round_info())?;

    let mut scores = reshape_round_data(&wide, &ROUND_ID_COLUMNS)?;
    let reshaped = scores.len();
    if options.complete_rounds_only {
        scores = filter_complete_rounds(scores);
    }
    let skipped_rows = reshaped - scores.len();
    if skipped_rows > 0 {
        warn!(skipped = skipped_rows, "dropped scores from incomplete rounds");
    }

    let handicaps = prepare_handicaps(&handicap_table)?;
    let batch = transform(&scores, &handicaps, config)?;
    let incoming_rows = batch.rows.len();
    let unknown_players = batch.unknown_players.clone();

    let outcome = reconcile::merge(existing, batch, decider);
    let store_rows = outcome.rows.len();
    let rebuilt = if outcome.decision.changed() {
        let canonical = build_canonical(outcome.rows.clone(), &round_info);
        let (scores_path, parquet_path, csv_path) = (
            paths.all_scores(),
            paths.all_data_parquet(),
            paths.all_data_csv(),
        );
        let files = StoreFiles {
            scores: &scores_path,
            parquet: &parquet_path,
            csv: &csv_path,
        };
        persist::save_stores(files, &outcome.rows, &canonical)?;
        Some(RebuildSummary::of(&canonical))
    } else {
        None
    };

    Ok(ImportSummary {
        incoming_rows,
        skipped_rows,
        unknown_players,
        decision: outcome.decision,
        report: outcome.report,
        store_rows,
        rebuilt,
    })
}

pub fn build_canonical(rows: Vec<TransformedRow>, round_info: &[RoundInfo]) -> Vec<CanonicalRow> {
    add_cumulative_scores(join_round_info(rows, round_info))
}

/// Regenerates the canonical dataset from the score store alone.
pub fn rebuild_all_data(paths: &Paths) -> Result<RebuildSummary> {
    let rows = persist::load_scores(&paths.all_scores())?;
    let round_info = persist::load_round_info(&paths.round_info())?;
    let canonical = build_canonical(rows, &round_info);
    persist::save_canonical(&paths.all_data_parquet(), &paths.all_data_csv(), &canonical)?;
    Ok(RebuildSummary::of(&canonical))
}

pub fn check_data(paths: &Paths) -> Result<StoreCheck> {
    let scores = persist::load_scores(&paths.all_scores())?;
    let data = persist::load_canonical(&paths.all_data_parquet())?;
    Ok(reconcile::check_stores(&scores, &data))
}
