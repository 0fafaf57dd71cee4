use std::collections::{BTreeSet, HashMap};

use tracing::{info, warn};

use crate::config::LeagueConfig;
use crate::error::{PipelineError, Result};
use crate::model::{
    FrontBack, HOLES_PER_ROUND, HandicapRow, ScoreRow, TransformedRow, UNKNOWN_PLAYER, hole_id,
    teg_label,
};

#[derive(Debug, Clone, Default)]
pub struct TransformedBatch {
    pub rows: Vec<TransformedRow>,
    /// Initials with no entry in the player table, sorted.
    pub unknown_players: Vec<String>,
}

/// One stroke per full 18 of handicap, plus one more where the hole's stroke
/// index falls inside the remainder. Plus handicaps use the euclidean
/// remainder, so strokes are given back on the easiest holes.
pub fn handicap_strokes(hc: f64, si: u32) -> i32 {
    let full = (hc / 18.0).floor() as i32;
    let extra = if hc.rem_euclid(18.0) >= f64::from(si) { 1 } else { 0 };
    full + extra
}

pub fn stableford_points(net_vs_par: i32) -> i32 {
    (2 - net_vs_par).max(0)
}

pub fn transform(
    scores: &[ScoreRow],
    handicaps: &[HandicapRow],
    config: &LeagueConfig,
) -> Result<TransformedBatch> {
    let hc_lookup: HashMap<(&str, &str), f64> = handicaps
        .iter()
        .map(|h| ((h.teg.as_str(), h.pl.as_str()), h.hc))
        .collect();

    let mut unknown = BTreeSet::new();
    let mut rows = Vec::with_capacity(scores.len());
    for s in scores {
        check_score_row(s)?;
        let teg = teg_label(s.teg_num);
        let hc = hc_lookup
            .get(&(teg.as_str(), s.pl.as_str()))
            .copied()
            .unwrap_or(0.0);
        let player = match config.player_name(&s.pl) {
            Some(name) => name.to_string(),
            None => {
                unknown.insert(s.pl.clone());
                UNKNOWN_PLAYER.to_string()
            }
        };
        let hc_strokes = handicap_strokes(hc, s.si);
        let gross_vp = s.score - s.par;
        let net = s.score - hc_strokes;
        let net_vp = net - s.par;

        rows.push(TransformedRow {
            teg_num: s.teg_num,
            round: s.round,
            hole: s.hole,
            par: s.par,
            si: s.si,
            pl: s.pl.clone(),
            sc: s.score,
            teg,
            hc,
            hole_id: hole_id(s.teg_num, s.round, s.hole),
            front_back: FrontBack::for_hole(s.hole),
            player,
            hc_strokes,
            gross_vp,
            net,
            net_vp,
            stableford: stableford_points(net_vp),
        });
    }

    let unknown_players = unknown.into_iter().collect::<Vec<_>>();
    for pl in &unknown_players {
        warn!(initials = %pl, "initials not in player table, using {UNKNOWN_PLAYER:?}");
    }
    info!(rows = rows.len(), "round processing completed");
    Ok(TransformedBatch {
        rows,
        unknown_players,
    })
}

fn check_score_row(s: &ScoreRow) -> Result<()> {
    let context = || format!("TEG {} round {} hole {} ({})", s.teg_num, s.round, s.hole, s.pl);
    let max = HOLES_PER_ROUND as u32;
    if s.hole == 0 || s.hole > max {
        return Err(PipelineError::malformed(context(), format!("hole must be 1..={max}")));
    }
    if s.si == 0 || s.si > max {
        return Err(PipelineError::malformed(
            context(),
            format!("stroke index must be 1..={max}, got {}", s.si),
        ));
    }
    if s.par <= 0 {
        return Err(PipelineError::malformed(
            context(),
            format!("par must be positive, got {}", s.par),
        ));
    }
    Ok(())
}
