//! Running totals over the full history.
//!
//! Every figure here is a function of row order alone, so the whole table is
//! recomputed on each update: one O(n log n) sort and one linear scan. For a
//! league's worth of rows that is cheap enough that no incremental path exists.

use std::collections::HashMap;

use tracing::info;

use crate::model::{CanonicalRow, Cumulative, Measure, RoundInfo, TransformedRow};

/// Left-joins round date/course onto each row. Cumulative fields start zeroed.
pub fn join_round_info(rows: Vec<TransformedRow>, info: &[RoundInfo]) -> Vec<CanonicalRow> {
    let lookup: HashMap<(u32, u32), &RoundInfo> =
        info.iter().map(|r| ((r.teg_num, r.round), r)).collect();
    rows.into_iter()
        .map(|base| {
            let meta = lookup.get(&base.round_key());
            CanonicalRow {
                date: meta.and_then(|m| m.date.clone()),
                course: meta.and_then(|m| m.course.clone()),
                base,
                hole_order_ever: 0,
                teg_count: 0,
                career_count: 0,
                cumulative: [Cumulative::default(); 4],
            }
        })
        .collect()
}

pub fn add_cumulative_scores(mut rows: Vec<CanonicalRow>) -> Vec<CanonicalRow> {
    rows.sort_by(|a, b| {
        let (a, b) = (&a.base, &b.base);
        a.pl.cmp(&b.pl)
            .then(a.teg_num.cmp(&b.teg_num))
            .then(a.round.cmp(&b.round))
            .then(a.hole.cmp(&b.hole))
    });

    let mut sums = [[0i64; 3]; 4];
    let mut teg_count = 0u32;
    let mut career_count = 0u32;
    let mut hole_order = 0u32;
    let mut prev: Option<(String, u32, u32, u32)> = None;

    for row in rows.iter_mut() {
        let b = &row.base;
        let (new_player, new_teg, new_round, new_hole) = match &prev {
            None => (true, true, true, true),
            Some((pl, teg, round, hole)) => {
                let new_player = *pl != b.pl;
                let new_teg = new_player || *teg != b.teg_num;
                let new_round = new_teg || *round != b.round;
                (new_player, new_teg, new_round, new_round || *hole != b.hole)
            }
        };

        if new_player {
            career_count = 0;
            hole_order = 0;
            for s in sums.iter_mut() {
                s[2] = 0;
            }
        }
        if new_teg {
            teg_count = 0;
            for s in sums.iter_mut() {
                s[1] = 0;
            }
        }
        if new_round {
            for s in sums.iter_mut() {
                s[0] = 0;
            }
        }
        if new_hole {
            hole_order += 1;
        }
        teg_count += 1;
        career_count += 1;

        for measure in Measure::ALL {
            let v = i64::from(b.measure(measure));
            let s = &mut sums[measure.index()];
            for scope in s.iter_mut() {
                *scope += v;
            }
            row.cumulative[measure.index()] = Cumulative {
                cum_round: s[0],
                cum_teg: s[1],
                cum_career: s[2],
                round_avg: s[0] as f64 / f64::from(b.hole.max(1)),
                teg_avg: s[1] as f64 / f64::from(teg_count),
                career_avg: s[2] as f64 / f64::from(career_count),
            };
        }
        row.teg_count = teg_count;
        row.career_count = career_count;
        row.hole_order_ever = hole_order;
        prev = Some((b.pl.clone(), b.teg_num, b.round, b.hole));
    }

    info!(rows = rows.len(), "cumulative scores and averages added");
    rows
}
