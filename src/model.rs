use serde::{Deserialize, Serialize};

pub const HOLES_PER_ROUND: usize = 18;
pub const UNKNOWN_PLAYER: &str = "Unknown Player";

/// Long-form score for one played hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    pub teg_num: u32,
    pub round: u32,
    pub hole: u32,
    pub par: i32,
    pub si: u32,
    pub pl: String,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandicapRow {
    pub teg: String,
    pub pl: String,
    pub hc: f64,
}

/// Canonical per-hole record, also the row layout of the flat score store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRow {
    #[serde(rename = "TEGNum")]
    pub teg_num: u32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Hole")]
    pub hole: u32,
    #[serde(rename = "PAR")]
    pub par: i32,
    #[serde(rename = "SI")]
    pub si: u32,
    #[serde(rename = "Pl")]
    pub pl: String,
    #[serde(rename = "Sc")]
    pub sc: i32,
    #[serde(rename = "TEG")]
    pub teg: String,
    #[serde(rename = "HC")]
    pub hc: f64,
    #[serde(rename = "HoleID")]
    pub hole_id: String,
    #[serde(rename = "FrontBack")]
    pub front_back: FrontBack,
    #[serde(rename = "Player")]
    pub player: String,
    #[serde(rename = "HCStrokes")]
    pub hc_strokes: i32,
    #[serde(rename = "GrossVP")]
    pub gross_vp: i32,
    #[serde(rename = "Net")]
    pub net: i32,
    #[serde(rename = "NetVP")]
    pub net_vp: i32,
    #[serde(rename = "Stableford")]
    pub stableford: i32,
}

impl TransformedRow {
    pub fn round_key(&self) -> (u32, u32) {
        (self.teg_num, self.round)
    }

    pub fn measure(&self, measure: Measure) -> i32 {
        match measure {
            Measure::Sc => self.sc,
            Measure::GrossVp => self.gross_vp,
            Measure::NetVp => self.net_vp,
            Measure::Stableford => self.stableford,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FrontBack {
    Front,
    Back,
}

impl FrontBack {
    pub fn for_hole(hole: u32) -> Self {
        if hole < 10 { Self::Front } else { Self::Back }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "Front",
            Self::Back => "Back",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Front" => Some(Self::Front),
            "Back" => Some(Self::Back),
            _ => None,
        }
    }
}

/// The four base measures carried through every cumulative and rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    Sc,
    GrossVp,
    NetVp,
    Stableford,
}

impl Measure {
    pub const ALL: [Measure; 4] = [
        Measure::Sc,
        Measure::GrossVp,
        Measure::NetVp,
        Measure::Stableford,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Sc => "Sc",
            Self::GrossVp => "GrossVP",
            Self::NetVp => "NetVP",
            Self::Stableford => "Stableford",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Sc => 0,
            Self::GrossVp => 1,
            Self::NetVp => 2,
            Self::Stableford => 3,
        }
    }

    /// Lower is better for everything except Stableford points.
    pub fn lower_is_better(self) -> bool {
        !matches!(self, Self::Stableford)
    }
}

/// Running totals for one measure at the three scopes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cumulative {
    pub cum_round: i64,
    pub cum_teg: i64,
    pub cum_career: i64,
    pub round_avg: f64,
    pub teg_avg: f64,
    pub career_avg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub base: TransformedRow,
    pub date: Option<String>,
    pub course: Option<String>,
    pub hole_order_ever: u32,
    pub teg_count: u32,
    pub career_count: u32,
    /// Indexed by `Measure::index`.
    pub cumulative: [Cumulative; 4],
}

impl CanonicalRow {
    pub fn cumulative(&self, measure: Measure) -> &Cumulative {
        &self.cumulative[measure.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoundInfo {
    #[serde(rename = "TEGNum")]
    pub teg_num: u32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Course")]
    pub course: Option<String>,
}

impl AsRef<TransformedRow> for TransformedRow {
    fn as_ref(&self) -> &TransformedRow {
        self
    }
}

impl AsRef<TransformedRow> for CanonicalRow {
    fn as_ref(&self) -> &TransformedRow {
        &self.base
    }
}

/// Anything that belongs to one (edition, round, player) scorecard.
pub trait ScorecardKey {
    fn scorecard_key(&self) -> (u32, u32, &str);
}

impl ScorecardKey for TransformedRow {
    fn scorecard_key(&self) -> (u32, u32, &str) {
        (self.teg_num, self.round, &self.pl)
    }
}

impl ScorecardKey for CanonicalRow {
    fn scorecard_key(&self) -> (u32, u32, &str) {
        self.base.scorecard_key()
    }
}

impl ScorecardKey for ScoreRow {
    fn scorecard_key(&self) -> (u32, u32, &str) {
        (self.teg_num, self.round, &self.pl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WinnerCategory {
    /// Lowest gross vs par: the Green Jacket.
    BestGross,
    /// Highest Stableford: the TEG Trophy.
    BestNet,
    /// Lowest Stableford: the Wooden Spoon.
    WorstNet,
}

pub fn teg_label(teg_num: u32) -> String {
    format!("TEG {teg_num}")
}

pub fn hole_id(teg_num: u32, round: u32, hole: u32) -> String {
    format!("T{teg_num:02}|R{round:02}|H{hole:02}")
}
