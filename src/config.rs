use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::model::{UNKNOWN_PLAYER, WinnerCategory};

const DEFAULT_DATA_DIR: &str = "data";
const CONFIG_FILE: &str = "league.json";
const DEFAULT_ROUNDS: u32 = 4;

/// League-wide lookup tables. Everything here is data, so a deployment or a
/// test can swap it without touching the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueConfig {
    /// Initials -> display name.
    #[serde(default)]
    pub players: BTreeMap<String, String>,
    /// Edition number -> expected number of rounds.
    #[serde(default)]
    pub teg_rounds: BTreeMap<u32, u32>,
    #[serde(default = "default_rounds")]
    pub default_rounds: u32,
    /// Editions left out of record views (test or social editions).
    #[serde(default)]
    pub excluded_tegs: Vec<u32>,
    #[serde(default)]
    pub winner_overrides: Vec<WinnerOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerOverride {
    pub teg_num: u32,
    pub category: WinnerCategory,
    pub player: String,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_rounds() -> u32 {
    DEFAULT_ROUNDS
}

impl Default for LeagueConfig {
    fn default() -> Self {
        let players = [
            ("AB", "Alex BAKER"),
            ("JB", "Jon BAKER"),
            ("DM", "David MULLIN"),
            ("GW", "Gregg WILLIAMS"),
            ("HM", "Henry MELLER"),
            ("SN", "Stuart NEUMANN"),
            ("JP", "John PATTERSON"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            players,
            teg_rounds: BTreeMap::from([(1, 4), (2, 3), (3, 4), (4, 4)]),
            default_rounds: DEFAULT_ROUNDS,
            excluded_tegs: vec![50],
            winner_overrides: vec![
                WinnerOverride {
                    teg_num: 5,
                    category: WinnerCategory::BestNet,
                    player: "Gregg WILLIAMS".to_string(),
                    note: None,
                },
                WinnerOverride {
                    teg_num: 5,
                    category: WinnerCategory::BestGross,
                    player: "Stuart NEUMANN".to_string(),
                    note: Some(
                        "Green Jacket awarded for best stableford round; DM had best gross score"
                            .to_string(),
                    ),
                },
            ],
        }
    }
}

impl LeagueConfig {
    /// Unknown initials resolve to a sentinel rather than failing.
    pub fn player_name(&self, initials: &str) -> Option<&str> {
        self.players
            .get(&initials.trim().to_ascii_uppercase())
            .map(|s| s.as_str())
    }

    pub fn player_name_or_unknown(&self, initials: &str) -> String {
        self.player_name(initials)
            .unwrap_or(UNKNOWN_PLAYER)
            .to_string()
    }

    pub fn rounds_for(&self, teg_num: u32) -> u32 {
        self.teg_rounds
            .get(&teg_num)
            .copied()
            .unwrap_or(self.default_rounds)
    }

    pub fn winner_override(
        &self,
        teg_num: u32,
        category: WinnerCategory,
    ) -> Option<&WinnerOverride> {
        self.winner_overrides
            .iter()
            .find(|o| o.teg_num == teg_num && o.category == category)
    }

    /// Missing file means built-in defaults; a present but broken file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no league config, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(PipelineError::io(path, err)),
        };
        let mut config =
            serde_json::from_str::<LeagueConfig>(&raw).map_err(|err| PipelineError::Config {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        config.players = config
            .players
            .into_iter()
            .map(|(k, v)| (k.trim().to_ascii_uppercase(), v))
            .collect();
        if config.default_rounds == 0 {
            return Err(PipelineError::Config {
                path: path.to_path_buf(),
                message: "default_rounds must be at least 1".to_string(),
            });
        }
        info!(
            path = %path.display(),
            players = config.players.len(),
            "league config loaded"
        );
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).map_err(|err| PipelineError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        fs::write(&tmp, json).map_err(|err| PipelineError::io(&tmp, err))?;
        fs::rename(&tmp, path).map_err(|err| PipelineError::io(path, err))?;
        Ok(())
    }
}

/// File locations for one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub config: PathBuf,
}

impl Paths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let config = data_dir.join(CONFIG_FILE);
        Self { data_dir, config }
    }

    /// CLI flags win, then environment (`.env.local` and `.env` are honoured),
    /// then `data/`.
    pub fn resolve(args: &[String]) -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::dotenv();
        let data_dir = parse_path_arg(args, "--data-dir")
            .or_else(|| env_path("TEG_DATA_DIR"))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let mut paths = Self::new(data_dir);
        if let Some(config) = parse_path_arg(args, "--config").or_else(|| env_path("TEG_CONFIG")) {
            paths.config = config;
        }
        paths
    }

    pub fn round_input(&self) -> PathBuf {
        self.data_dir.join("round-input.csv")
    }

    pub fn handicaps(&self) -> PathBuf {
        self.data_dir.join("handicaps.csv")
    }

    pub fn round_info(&self) -> PathBuf {
        self.data_dir.join("round_info.csv")
    }

    pub fn all_scores(&self) -> PathBuf {
        self.data_dir.join("all-scores.csv")
    }

    pub fn all_data_parquet(&self) -> PathBuf {
        self.data_dir.join("all-data.parquet")
    }

    pub fn all_data_csv(&self) -> PathBuf {
        self.data_dir.join("all-data.csv")
    }
}

/// Accepts both `--flag=value` and `--flag value`.
pub fn parse_path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_path_arg_handles_both_forms() {
        assert_eq!(
            parse_path_arg(&args(&["--data-dir=/tmp/teg"]), "--data-dir"),
            Some(PathBuf::from("/tmp/teg"))
        );
        assert_eq!(
            parse_path_arg(&args(&["--yes", "--data-dir", "d"]), "--data-dir"),
            Some(PathBuf::from("d"))
        );
        assert_eq!(parse_path_arg(&args(&["--data-dir"]), "--data-dir"), None);
    }

    #[test]
    fn rounds_fall_back_to_default() {
        let config = LeagueConfig::default();
        assert_eq!(config.rounds_for(2), 3);
        assert_eq!(config.rounds_for(99), 4);
    }

    #[test]
    fn player_lookup_is_case_insensitive() {
        let config = LeagueConfig::default();
        assert_eq!(config.player_name("gw"), Some("Gregg WILLIAMS"));
        assert_eq!(config.player_name_or_unknown("ZZ"), UNKNOWN_PLAYER);
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LeagueConfig::load(&dir.path().join("league.json")).unwrap();
        assert_eq!(config.players.len(), 7);
    }

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("league.json");
        let mut config = LeagueConfig::default();
        config.players.insert("XY".to_string(), "Xavier YOUNG".to_string());
        config.save(&path).unwrap();
        let loaded = LeagueConfig::load(&path).unwrap();
        assert_eq!(loaded.player_name("xy"), Some("Xavier YOUNG"));
        assert_eq!(loaded.winner_overrides, config.winner_overrides);
    }

    #[test]
    fn broken_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("league.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            LeagueConfig::load(&path),
            Err(PipelineError::Config { .. })
        ));
    }
}
