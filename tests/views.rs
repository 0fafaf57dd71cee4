use teg_stats::config::{LeagueConfig, WinnerOverride};
use teg_stats::model::{CanonicalRow, Measure, RoundInfo, ScoreRow, WinnerCategory};
use teg_stats::pipeline::build_canonical;
use teg_stats::transform::transform;
use teg_stats::views::{
    AggregationLevel, DatasetFilter, aggregate_data, best_rows, edition_status, filter_dataset,
    teg_summary,
};

/// Full 18-hole card on a par-72 course with the same score on every hole.
fn card(teg: u32, round: u32, pl: &str, score: i32) -> Vec<ScoreRow> {
    (1..=18)
        .map(|hole| ScoreRow {
            teg_num: teg,
            round,
            hole,
            par: 4,
            si: hole,
            pl: pl.to_string(),
            score,
        })
        .collect()
}

fn dataset(cards: Vec<Vec<ScoreRow>>) -> Vec<CanonicalRow> {
    let scores = cards.into_iter().flatten().collect::<Vec<_>>();
    let batch = transform(&scores, &[], &LeagueConfig::default()).expect("valid scores");
    let info = vec![
        RoundInfo {
            teg_num: 3,
            round: 1,
            date: Some("02/11/2010".to_string()),
            course: None,
        },
        RoundInfo {
            teg_num: 3,
            round: 2,
            date: Some("03/11/2010".to_string()),
            course: None,
        },
    ];
    build_canonical(batch.rows, &info)
}

#[test]
fn rollups_sum_measures_per_level() {
    let rows = dataset(vec![card(3, 1, "AB", 4), card(3, 2, "AB", 5), card(3, 1, "JB", 5)]);

    let by_player = aggregate_data(&rows, AggregationLevel::Player);
    assert_eq!(by_player.len(), 2);
    assert_eq!(by_player[0].key.pl, "AB");
    assert_eq!(by_player[0].sc, 72 + 90);
    assert_eq!(by_player[0].gross_vp, 18);
    assert_eq!(by_player[0].key.teg_num, None);

    let by_round = aggregate_data(&rows, AggregationLevel::Round);
    assert_eq!(by_round.len(), 3);
    assert_eq!(by_round[1].key.round, Some(2));
    assert_eq!(by_round[1].key.teg().as_deref(), Some("TEG 3"));

    let by_nine = aggregate_data(&rows, AggregationLevel::FrontBack);
    assert_eq!(by_nine.len(), 6);
    assert!(by_nine.iter().all(|r| r.sc == 36 || r.sc == 45));
}

#[test]
fn best_rows_rank_with_shared_positions() {
    let rows = dataset(vec![
        card(3, 1, "AB", 4),
        card(3, 1, "JB", 4),
        card(3, 1, "SN", 5),
        card(3, 1, "GW", 6),
    ]);

    let gross = best_rows(&rows, AggregationLevel::Round, Measure::GrossVp, 3);
    let ranks = gross
        .iter()
        .map(|r| (r.rank.as_str(), r.rollup.key.pl.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(ranks, vec![("1=", "AB"), ("1=", "JB"), ("3", "SN")]);

    let stableford = best_rows(&rows, AggregationLevel::Round, Measure::Stableford, 1);
    let ranks = stableford
        .iter()
        .map(|r| (r.rank.as_str(), r.rollup.key.pl.as_str(), r.rollup.stableford))
        .collect::<Vec<_>>();
    assert_eq!(ranks, vec![("1=", "AB", 36), ("1=", "JB", 36)]);

    let gross_two = best_rows(&rows, AggregationLevel::Round, Measure::Sc, 2);
    assert_eq!(gross_two.len(), 2);
    assert!(gross_two.iter().all(|r| r.rank == "1="));
    assert!(best_rows(&rows, AggregationLevel::Round, Measure::Sc, 0).is_empty());
}

#[test]
fn summary_keeps_unknown_players_apart() {
    let mut scores = card(3, 1, "XX", 5);
    scores.extend(card(3, 1, "YY", 5));
    scores.extend((1..=18).map(|hole| ScoreRow {
        teg_num: 3,
        round: 1,
        hole,
        par: 4,
        si: hole,
        pl: "AB".to_string(),
        score: if hole <= 9 { 4 } else { 5 },
    }));
    let batch = transform(&scores, &[], &LeagueConfig::default()).expect("valid scores");
    let rows = build_canonical(batch.rows, &[]);

    let summary = teg_summary(&rows, &[]);
    let teg = &summary[0];
    // XX and YY have 18 points each; AB has 27.
    assert_eq!(teg.worst_net.player, "Unknown Player");
    assert_eq!(teg.worst_net.initials.as_deref(), Some("XX"));
    assert_eq!(teg.best_net.player, "Alex BAKER");
    assert_eq!(teg.best_net.initials.as_deref(), Some("AB"));
    assert_eq!(teg.best_gross.initials.as_deref(), Some("AB"));
}

#[test]
fn summary_picks_winners_and_year() {
    let rows = dataset(vec![
        card(3, 1, "AB", 4),
        card(3, 2, "AB", 6),
        card(3, 1, "JB", 5),
        card(3, 2, "JB", 4),
        card(3, 1, "SN", 5),
        card(3, 2, "SN", 5),
    ]);
    let summary = teg_summary(&rows, &[]);
    assert_eq!(summary.len(), 1);
    let teg = &summary[0];
    assert_eq!(teg.teg, "TEG 3");
    assert_eq!(teg.year, Some(2010));
    // JB +18 beats AB +36 and SN +36.
    assert_eq!(teg.best_gross.player, "Jon BAKER");
    assert_eq!(teg.winner(WinnerCategory::BestNet).player, "Jon BAKER");
    // AB and SN tie on 36 points; name order decides.
    assert_eq!(teg.worst_net.player, "Alex BAKER");
    assert!(teg.best_gross.overridden.is_none());
}

#[test]
fn configured_override_replaces_computed_winner() {
    let rows = dataset(vec![card(3, 1, "AB", 4), card(3, 1, "JB", 6)]);
    let overrides = vec![WinnerOverride {
        teg_num: 3,
        category: WinnerCategory::BestGross,
        player: "Jon BAKER".to_string(),
        note: Some("scorecard correction".to_string()),
    }];
    let summary = teg_summary(&rows, &overrides);
    assert_eq!(summary[0].best_gross.player, "Jon BAKER");
    assert_eq!(summary[0].best_gross.overridden, overrides.first().cloned());
    assert_eq!(summary[0].best_net.player, "Alex BAKER");
}

#[test]
fn filter_drops_excluded_and_unfinished_editions() {
    let mut config = LeagueConfig::default();
    config.teg_rounds.insert(3, 2);
    config.teg_rounds.insert(4, 2);
    let rows = dataset(vec![
        card(3, 1, "AB", 4),
        card(3, 2, "AB", 4),
        card(4, 1, "AB", 4),
        card(50, 1, "AB", 4),
    ]);

    let status = edition_status(&rows, &config);
    let complete = status
        .iter()
        .map(|s| (s.teg_num, s.is_complete()))
        .collect::<Vec<_>>();
    assert_eq!(complete, vec![(3, true), (4, false), (50, false)]);

    let records = filter_dataset(&rows, &DatasetFilter::records(&config), &config);
    assert_eq!(records.len(), 36);
    assert!(records.iter().all(|r| r.base.teg_num == 3));

    let everything_but_50 = filter_dataset(
        &rows,
        &DatasetFilter {
            exclude_tegs: vec![50],
            exclude_incomplete: false,
        },
        &config,
    );
    assert_eq!(everything_but_50.len(), 54);
}
