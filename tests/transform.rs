use std::path::PathBuf;

use teg_stats::config::LeagueConfig;
use teg_stats::handicaps::prepare_handicaps;
use teg_stats::model::{FrontBack, ScoreRow, TransformedRow, UNKNOWN_PLAYER};
use teg_stats::persist::load_wide_table;
use teg_stats::reshape::{ROUND_ID_COLUMNS, WideTable, filter_complete_rounds, reshape_round_data};
use teg_stats::transform::{TransformedBatch, transform};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn reshape_fixture(name: &str) -> Vec<ScoreRow> {
    let table = load_wide_table(&fixture_path(name)).expect("fixture should load");
    reshape_round_data(&table, &ROUND_ID_COLUMNS).expect("fixture should reshape")
}

fn transform_fixture(name: &str) -> TransformedBatch {
    let scores = reshape_fixture(name);
    let table = load_wide_table(&fixture_path("handicaps.csv")).expect("handicaps should load");
    let handicaps = prepare_handicaps(&table).expect("handicaps should parse");
    transform(&scores, &handicaps, &LeagueConfig::default()).expect("transform should succeed")
}

fn total(batch: &TransformedBatch, pl: &str, f: impl Fn(&TransformedRow) -> i32) -> i32 {
    batch.rows.iter().filter(|r| r.pl == pl).map(f).sum()
}

#[test]
fn reshape_yields_one_row_per_played_hole() {
    let rows = reshape_fixture("round_teg5_r2.csv");
    assert_eq!(rows.len(), 36);
    assert!(rows.iter().all(|r| (1..=18).contains(&r.hole)));

    let partial = reshape_fixture("round_teg5_r1_partial.csv");
    assert_eq!(partial.len(), 18 + 10 + 3);
}

#[test]
fn complete_filter_keeps_full_cards_only() {
    let kept = filter_complete_rounds(reshape_fixture("round_teg5_r1_partial.csv"));
    assert_eq!(kept.len(), 18);
    assert!(kept.iter().all(|r| r.pl == "AB"));
}

#[test]
fn par_round_with_handicap_nine_scores_45_points() {
    let batch = transform_fixture("round_teg5_r2.csv");
    assert!(batch.unknown_players.is_empty());

    assert_eq!(total(&batch, "AB", |r| r.sc), 72);
    assert_eq!(total(&batch, "AB", |r| r.gross_vp), 0);
    assert_eq!(total(&batch, "AB", |r| r.hc_strokes), 9);
    assert_eq!(total(&batch, "AB", |r| r.net_vp), -9);
    assert_eq!(total(&batch, "AB", |r| r.stableford), 45);

    assert_eq!(total(&batch, "JB", |r| r.hc_strokes), 18);
    assert_eq!(total(&batch, "JB", |r| r.stableford), 36);
}

#[test]
fn derived_keys_are_filled() {
    let batch = transform_fixture("round_teg5_r2.csv");
    let row = batch
        .rows
        .iter()
        .find(|r| r.pl == "AB" && r.hole == 9)
        .expect("hole 9 present");
    assert_eq!(row.teg, "TEG 5");
    assert_eq!(row.hole_id, "T05|R02|H09");
    assert_eq!(row.front_back, FrontBack::Front);
    assert_eq!(row.player, "Alex BAKER");
    assert_eq!(row.hc, 9.0);
    assert_eq!(row.hc_strokes, 1);
    assert_eq!(row.stableford, 3);

    let ten = batch
        .rows
        .iter()
        .find(|r| r.pl == "AB" && r.hole == 10)
        .expect("hole 10 present");
    assert_eq!(ten.front_back, FrontBack::Back);
    assert_eq!(ten.hc_strokes, 0);
}

#[test]
fn unknown_initials_are_kept_and_reported() {
    let batch = transform_fixture("round_teg5_r1_partial.csv");
    assert_eq!(batch.unknown_players, vec!["ZZ".to_string()]);
    let zz = batch.rows.iter().filter(|r| r.pl == "ZZ").collect::<Vec<_>>();
    assert_eq!(zz.len(), 3);
    assert!(zz.iter().all(|r| r.player == UNKNOWN_PLAYER));
    assert!(zz.iter().all(|r| r.hc == 0.0 && r.hc_strokes == 0));
}

#[test]
fn bad_identifier_aborts_the_batch() {
    let table = WideTable::new(
        ["TEGNum", "Round", "Hole", "Par", "SI", "AB"]
            .map(String::from)
            .to_vec(),
        vec![["5", "2", "x", "4", "1", "4"].map(String::from).to_vec()],
    );
    let err = reshape_round_data(&table, &ROUND_ID_COLUMNS).unwrap_err();
    assert!(err.to_string().contains("Hole"), "{err}");
}

#[test]
fn lower_case_initials_still_find_their_handicap() {
    let headers = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    let scores = WideTable::new(
        headers(&["TEGNum", "Round", "Hole", "Par", "SI", "ab"]),
        vec![headers(&["5", "2", "1", "4", "1", "4"])],
    );
    let handicaps = WideTable::new(headers(&["TEG", "Ab"]), vec![headers(&["TEG 5", "9"])]);

    let scores = reshape_round_data(&scores, &ROUND_ID_COLUMNS).unwrap();
    let handicaps = prepare_handicaps(&handicaps).unwrap();
    let batch = transform(&scores, &handicaps, &LeagueConfig::default()).unwrap();
    let row = &batch.rows[0];
    assert_eq!(row.pl, "AB");
    assert_eq!(row.player, "Alex BAKER");
    assert_eq!(row.hc, 9.0);
    assert_eq!(row.hc_strokes, 1);
}
