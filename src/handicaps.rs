use tracing::info;

use crate::error::{PipelineError, Result};
use crate::model::{HandicapRow, teg_label};
use crate::reshape::{WideTable, normalise_initials, parse_integral};

pub const HANDICAP_KEY_COLUMN: &str = "TEG";

/// Melts the handicap lookup (one column per player) into long rows.
/// Blank, non-numeric and zero handicaps mean "not set" and are dropped.
pub fn prepare_handicaps(table: &WideTable) -> Result<Vec<HandicapRow>> {
    let key_col = table.column_index(HANDICAP_KEY_COLUMN).ok_or_else(|| {
        PipelineError::malformed("handicaps", format!("missing column {HANDICAP_KEY_COLUMN}"))
    })?;

    let mut out = Vec::new();
    for row in 0..table.rows.len() {
        let raw_key = table.cell(row, key_col);
        if raw_key.is_empty() {
            continue;
        }
        let teg = normalise_teg_key(raw_key).ok_or_else(|| {
            PipelineError::malformed(
                format!("handicaps row {}", row + 2),
                format!("unrecognised edition key {raw_key:?}"),
            )
        })?;
        for col in 0..table.headers.len() {
            if col == key_col || table.headers[col].trim().is_empty() {
                continue;
            }
            let Ok(hc) = table.cell(row, col).parse::<f64>() else {
                continue;
            };
            if !hc.is_finite() || hc == 0.0 {
                continue;
            }
            out.push(HandicapRow {
                teg: teg.clone(),
                pl: normalise_initials(&table.headers[col]),
                hc,
            });
        }
    }
    info!(handicaps = out.len(), "handicap data prepared");
    Ok(out)
}

/// "TEG 5", "teg5" and "5" all name the same edition.
fn normalise_teg_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = match (trimmed.get(..3), trimmed.get(3..)) {
        (Some(prefix), Some(rest)) if prefix.eq_ignore_ascii_case("TEG") => rest.trim(),
        _ => trimmed,
    };
    let num = parse_integral(digits)?;
    let num = u32::try_from(num).ok()?;
    Some(teg_label(num))
}
