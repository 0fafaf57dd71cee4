use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::model::{HOLES_PER_ROUND, ScoreRow};

/// Identifier headers of the round input sheet, in edition/round/hole/par/SI order.
pub const ROUND_ID_COLUMNS: [&str; 5] = ["TEGNum", "Round", "Hole", "Par", "SI"];

/// Raw cells of a wide sheet. Player identity lives in the headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WideTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WideTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// Unpivots every non-identifier column into `(initials, score)` pairs.
/// Blank, non-numeric and zero scores are unplayed holes and are dropped;
/// identifier cells that fail to parse abort the batch.
pub fn reshape_round_data(table: &WideTable, id_columns: &[&str; 5]) -> Result<Vec<ScoreRow>> {
    let mut id_idx = [0usize; 5];
    for (slot, name) in id_idx.iter_mut().zip(id_columns.iter()) {
        *slot = table.column_index(name).ok_or_else(|| {
            PipelineError::malformed("round input", format!("missing column {name}"))
        })?;
    }
    let player_cols = (0..table.headers.len())
        .filter(|idx| !id_idx.contains(idx))
        .filter(|idx| !table.headers[*idx].trim().is_empty())
        .collect::<Vec<_>>();

    let mut out = Vec::with_capacity(table.rows.len() * player_cols.len());
    let mut dropped = 0usize;
    for row in 0..table.rows.len() {
        let ids = parse_ids(table, row, &id_idx, id_columns)?;
        for &col in &player_cols {
            let raw = table.cell(row, col);
            let Some(score) = coerce_score(raw).map_err(|message| {
                let context = format!("row {} column {}", row + 2, table.headers[col]);
                PipelineError::malformed(context, message)
            })?
            else {
                dropped += 1;
                continue;
            };
            out.push(ScoreRow {
                teg_num: ids.teg_num,
                round: ids.round,
                hole: ids.hole,
                par: ids.par,
                si: ids.si,
                pl: normalise_initials(&table.headers[col]),
                score,
            });
        }
    }

    info!(
        rows = table.rows.len(),
        players = player_cols.len(),
        scores = out.len(),
        dropped,
        "round data reshaped"
    );
    Ok(out)
}

/// Keeps only (edition, round, player) groups with a full card of 18 holes.
pub fn filter_complete_rounds(rows: Vec<ScoreRow>) -> Vec<ScoreRow> {
    let mut counts: HashMap<(u32, u32, String), usize> = HashMap::new();
    for r in &rows {
        *counts.entry((r.teg_num, r.round, r.pl.clone())).or_default() += 1;
    }
    let before = rows.len();
    let kept = rows
        .into_iter()
        .filter(|r| counts.get(&(r.teg_num, r.round, r.pl.clone())) == Some(&HOLES_PER_ROUND))
        .collect::<Vec<_>>();
    debug!(before, after = kept.len(), "filtered to complete rounds");
    kept
}

struct RowIds {
    teg_num: u32,
    round: u32,
    hole: u32,
    par: i32,
    si: u32,
}

fn parse_ids(table: &WideTable, row: usize, idx: &[usize; 5], names: &[&str; 5]) -> Result<RowIds> {
    let field = |i: usize| -> Result<i64> {
        let raw = table.cell(row, idx[i]);
        parse_integral(raw)
            .ok_or_else(|| {
                PipelineError::malformed(
                    format!("row {} column {}", row + 2, names[i]),
                    format!("expected a whole number, got {raw:?}"),
                )
            })
    };
    let unsigned = |i: usize| -> Result<u32> {
        let v = field(i)?;
        u32::try_from(v).map_err(|_| {
            PipelineError::malformed(
                format!("row {} column {}", row + 2, names[i]),
                format!("expected a non-negative number, got {v}"),
            )
        })
    };
    let par = field(3)?;
    let par = i32::try_from(par).map_err(|_| {
        PipelineError::malformed(
            format!("row {} column {}", row + 2, names[3]),
            format!("expected a par value, got {par}"),
        )
    })?;
    Ok(RowIds {
        teg_num: unsigned(0)?,
        round: unsigned(1)?,
        hole: unsigned(2)?,
        par,
        si: unsigned(4)?,
    })
}

/// `Ok(None)` is a missing score.
fn coerce_score(raw: &str) -> std::result::Result<Option<i32>, String> {
    let Ok(value) = raw.parse::<f64>() else {
        return Ok(None);
    };
    if !value.is_finite() || value == 0.0 {
        return Ok(None);
    }
    if value.fract() != 0.0 || value < 0.0 {
        return Err(format!("score must be a positive whole number, got {raw:?}"));
    }
    Ok(Some(value as i32))
}

/// Player columns are matched on upper-cased initials everywhere.
pub fn normalise_initials(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Accepts "4" and "4.0" style cells.
pub(crate) fn parse_integral(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}
