use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::config::{LeagueConfig, WinnerOverride};
use crate::error::PipelineError;
use crate::model::{CanonicalRow, FrontBack, Measure, TransformedRow, WinnerCategory, teg_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationLevel {
    Player,
    Teg,
    Round,
    FrontBack,
}

impl FromStr for AggregationLevel {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "Pl" | "Player" => Ok(Self::Player),
            "TEG" => Ok(Self::Teg),
            "Round" => Ok(Self::Round),
            "FrontBack" => Ok(Self::FrontBack),
            other => Err(PipelineError::malformed(
                "aggregation level",
                format!("{other:?}; choose from Pl, TEG, Round, FrontBack"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RollupKey {
    pub pl: String,
    pub player: String,
    pub teg_num: Option<u32>,
    pub round: Option<u32>,
    pub front_back: Option<FrontBack>,
}

impl RollupKey {
    pub fn teg(&self) -> Option<String> {
        self.teg_num.map(teg_label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    pub key: RollupKey,
    pub sc: i64,
    pub gross_vp: i64,
    pub net_vp: i64,
    pub stableford: i64,
}

impl Rollup {
    pub fn measure(&self, measure: Measure) -> i64 {
        match measure {
            Measure::Sc => self.sc,
            Measure::GrossVp => self.gross_vp,
            Measure::NetVp => self.net_vp,
            Measure::Stableford => self.stableford,
        }
    }
}

/// Sums the four measures per group. Never persisted; cheap to re-derive.
pub fn aggregate_data<R: AsRef<TransformedRow>>(
    rows: &[R],
    level: AggregationLevel,
) -> Vec<Rollup> {
    let mut groups: BTreeMap<RollupKey, [i64; 4]> = BTreeMap::new();
    for row in rows {
        let r = row.as_ref();
        let key = RollupKey {
            pl: r.pl.clone(),
            player: r.player.clone(),
            teg_num: (level != AggregationLevel::Player).then_some(r.teg_num),
            round: matches!(level, AggregationLevel::Round | AggregationLevel::FrontBack)
                .then_some(r.round),
            front_back: (level == AggregationLevel::FrontBack).then_some(r.front_back),
        };
        let sums = groups.entry(key).or_default();
        for m in Measure::ALL {
            sums[m.index()] += i64::from(r.measure(m));
        }
    }
    groups
        .into_iter()
        .map(|(key, sums)| Rollup {
            key,
            sc: sums[Measure::Sc.index()],
            gross_vp: sums[Measure::GrossVp.index()],
            net_vp: sums[Measure::NetVp.index()],
            stableford: sums[Measure::Stableford.index()],
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRollup {
    /// Competition-style rank; shared ranks carry a trailing `=`.
    pub rank: String,
    pub rollup: Rollup,
}

/// Top `top_n` groups for one measure. Stableford ranks high-to-low, the
/// rest low-to-high. Groups tied with the last place are all kept.
pub fn best_rows<R: AsRef<TransformedRow>>(
    rows: &[R],
    level: AggregationLevel,
    measure: Measure,
    top_n: usize,
) -> Vec<RankedRollup> {
    let mut rollups = aggregate_data(rows, level);
    if measure.lower_is_better() {
        rollups.sort_by_key(|r| r.measure(measure));
    } else {
        rollups.sort_by_key(|r| std::cmp::Reverse(r.measure(measure)));
    }
    match top_n.checked_sub(1).and_then(|last| rollups.get(last)) {
        Some(last) => {
            let cutoff = last.measure(measure);
            rollups.retain(|r| {
                let v = r.measure(measure);
                if measure.lower_is_better() { v <= cutoff } else { v >= cutoff }
            });
        }
        None if top_n == 0 => rollups.clear(),
        None => {}
    }

    let values = rollups.iter().map(|r| r.measure(measure)).collect::<Vec<_>>();
    rollups
        .into_iter()
        .map(|rollup| {
            let v = rollup.measure(measure);
            let better = values
                .iter()
                .filter(|x| if measure.lower_is_better() { **x < v } else { **x > v })
                .count();
            let shared = values.iter().filter(|x| **x == v).count() > 1;
            let rank = if shared {
                format!("{}=", better + 1)
            } else {
                (better + 1).to_string()
            };
            RankedRollup { rank, rollup }
        })
        .collect()
}

pub fn format_vs_par(value: i64) -> String {
    if value > 0 {
        format!("+{value}")
    } else if value < 0 {
        value.to_string()
    } else {
        "=".to_string()
    }
}

const ROUND_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub player: String,
    /// Initials of the computed winner; `None` when an override names the player.
    pub initials: Option<String>,
    /// Set when the computed winner was replaced by a configured override.
    pub overridden: Option<WinnerOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TegSummary {
    pub teg_num: u32,
    pub teg: String,
    pub year: Option<i32>,
    pub best_gross: Winner,
    pub best_net: Winner,
    pub worst_net: Winner,
}

impl TegSummary {
    pub fn winner(&self, category: WinnerCategory) -> &Winner {
        match category {
            WinnerCategory::BestGross => &self.best_gross,
            WinnerCategory::BestNet => &self.best_net,
            WinnerCategory::WorstNet => &self.worst_net,
        }
    }
}

#[derive(Default)]
struct EditionTotals<'a> {
    /// (player name, initials) -> (GrossVP, Stableford). Initials keep
    /// players sharing the unknown-player name apart.
    players: BTreeMap<(&'a str, &'a str), (i64, i64)>,
    /// Round -> date as recorded.
    dates: BTreeMap<u32, &'a str>,
}

/// Winners per edition, totalled per initials. Ties go to the first player in
/// name order, then initials order.
pub fn teg_summary(rows: &[CanonicalRow], overrides: &[WinnerOverride]) -> Vec<TegSummary> {
    let mut editions: BTreeMap<u32, EditionTotals<'_>> = BTreeMap::new();
    for row in rows {
        let b = &row.base;
        let edition = editions.entry(b.teg_num).or_default();
        let totals = edition
            .players
            .entry((b.player.as_str(), b.pl.as_str()))
            .or_default();
        totals.0 += i64::from(b.gross_vp);
        totals.1 += i64::from(b.stableford);
        if let Some(date) = row.date.as_deref() {
            edition.dates.entry(b.round).or_insert(date);
        }
    }

    editions
        .into_iter()
        .filter_map(|(teg_num, edition)| {
            let pick = |category: WinnerCategory| -> Option<Winner> {
                let mut best: Option<((&str, &str), i64)> = None;
                for (key, (gross, stableford)) in &edition.players {
                    let (value, better) = match category {
                        WinnerCategory::BestGross => {
                            (*gross, best.is_none_or(|(_, b)| *gross < b))
                        }
                        WinnerCategory::BestNet => {
                            (*stableford, best.is_none_or(|(_, b)| *stableford > b))
                        }
                        WinnerCategory::WorstNet => {
                            (*stableford, best.is_none_or(|(_, b)| *stableford < b))
                        }
                    };
                    if better {
                        best = Some((*key, value));
                    }
                }
                let ((name, initials), _) = best?;
                let computed = name.to_string();
                let over = overrides
                    .iter()
                    .find(|o| o.teg_num == teg_num && o.category == category);
                Some(match over {
                    Some(o) => {
                        debug!(
                            teg_num,
                            ?category,
                            computed = %computed,
                            player = %o.player,
                            "winner override applied"
                        );
                        Winner {
                            player: o.player.clone(),
                            initials: None,
                            overridden: Some(o.clone()),
                        }
                    }
                    None => Winner {
                        player: computed,
                        initials: Some(initials.to_string()),
                        overridden: None,
                    },
                })
            };
            let year = edition
                .dates
                .values()
                .next()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), ROUND_DATE_FORMAT).ok())
                .map(|d| d.year());
            Some(TegSummary {
                teg_num,
                teg: teg_label(teg_num),
                year,
                best_gross: pick(WinnerCategory::BestGross)?,
                best_net: pick(WinnerCategory::BestNet)?,
                worst_net: pick(WinnerCategory::WorstNet)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditionStatus {
    pub teg_num: u32,
    pub rounds_played: u32,
    pub rounds_expected: u32,
}

impl EditionStatus {
    pub fn is_complete(&self) -> bool {
        self.rounds_played >= self.rounds_expected
    }
}

pub fn edition_status<R: AsRef<TransformedRow>>(
    rows: &[R],
    config: &LeagueConfig,
) -> Vec<EditionStatus> {
    let mut rounds: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for row in rows {
        let r = row.as_ref();
        rounds.entry(r.teg_num).or_default().insert(r.round);
    }
    rounds
        .into_iter()
        .map(|(teg_num, played)| EditionStatus {
            teg_num,
            rounds_played: played.len() as u32,
            rounds_expected: config.rounds_for(teg_num),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetFilter {
    pub exclude_tegs: Vec<u32>,
    /// Drop editions with fewer rounds than expected.
    pub exclude_incomplete: bool,
}

impl DatasetFilter {
    /// Record views: configured exclusions, finished editions only.
    pub fn records(config: &LeagueConfig) -> Self {
        Self {
            exclude_tegs: config.excluded_tegs.clone(),
            exclude_incomplete: true,
        }
    }
}

pub fn filter_dataset<R: AsRef<TransformedRow> + Clone>(
    rows: &[R],
    filter: &DatasetFilter,
    config: &LeagueConfig,
) -> Vec<R> {
    let in_progress = if filter.exclude_incomplete {
        edition_status(rows, config)
            .into_iter()
            .filter(|s| !s.is_complete())
            .map(|s| s.teg_num)
            .collect::<BTreeSet<_>>()
    } else {
        BTreeSet::new()
    };
    rows.iter()
        .filter(|row| {
            let teg = row.as_ref().teg_num;
            !filter.exclude_tegs.contains(&teg) && !in_progress.contains(&teg)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vs_par_formatting() {
        assert_eq!(format_vs_par(3), "+3");
        assert_eq!(format_vs_par(-2), "-2");
        assert_eq!(format_vs_par(0), "=");
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!("Hole".parse::<AggregationLevel>().is_err());
        assert_eq!("TEG".parse::<AggregationLevel>().unwrap(), AggregationLevel::Teg);
    }
}
