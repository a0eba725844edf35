// Configuration loading and parsing (league.toml, settings.toml).

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use gridiron_core::franchise::{RegimeBook, Tenure};
use gridiron_core::season::{Season, SeasonRules, DEFAULT_DRAFT_ROUNDS, DEFAULT_PLAYOFF_TEAMS};
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub regimes: Vec<Tenure>,
    pub season_overrides: Vec<SeasonOverride>,
    pub db_path: String,
    pub data_paths: DataPaths,
}

impl Config {
    pub fn regime_book(&self) -> RegimeBook {
        RegimeBook::new(self.regimes.clone())
    }

    /// Built-in rules for `season` with the league's draft and playoff shape
    /// and any per-season override applied.
    pub fn season_rules(&self, season: Season) -> SeasonRules {
        let mut rules = SeasonRules::for_season(season)
            .with_draft_rounds(self.league.draft_rounds)
            .with_playoff_teams(self.league.playoff_teams);
        if let Some(o) = self.season_overrides.iter().find(|o| o.season == season) {
            if let Some(weeks) = o.regular_season_weeks {
                rules = rules.with_regular_season_weeks(weeks);
            }
            if let Some(teams) = o.playoff_teams {
                rules = rules.with_playoff_teams(teams);
            }
        }
        rules
    }

    /// Every season the league has history for.
    pub fn seasons(&self) -> RangeInclusive<Season> {
        self.league.first_season..=self.league.current_season
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    #[serde(default)]
    regimes: Vec<Tenure>,
    #[serde(default)]
    seasons: Vec<SeasonOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub first_season: Season,
    pub current_season: Season,
    #[serde(default = "default_draft_rounds")]
    pub draft_rounds: u8,
    #[serde(default = "default_playoff_teams")]
    pub playoff_teams: u8,
}

fn default_draft_rounds() -> u8 {
    DEFAULT_DRAFT_ROUNDS
}

fn default_playoff_teams() -> u8 {
    DEFAULT_PLAYOFF_TEAMS
}

/// Departures from the built-in rules for a single season.
#[derive(Debug, Clone, Deserialize)]
pub struct SeasonOverride {
    pub season: Season,
    #[serde(default)]
    pub regular_season_weeks: Option<u8>,
    #[serde(default)]
    pub playoff_teams: Option<u8>,
}

// ---------------------------------------------------------------------------
// settings.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    data_paths: DataPaths,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub transactions: String,
    pub games: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/settings.toml`, relative to `base_dir`. Does not copy defaults.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_file: LeagueFile = parse_file(&league_path)?;

    let settings_path = config_dir.join("settings.toml");
    let settings: SettingsFile = parse_file(&settings_path)?;

    let config = Config {
        league: league_file.league,
        regimes: league_file.regimes,
        season_overrides: league_file.seasons,
        db_path: settings.database.path,
        data_paths: settings.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    copied.sort();
    Ok(copied)
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.first_season > league.current_season {
        return Err(invalid(
            "league.first_season",
            format!(
                "{} is after current_season {}",
                league.first_season, league.current_season
            ),
        ));
    }
    if league.draft_rounds == 0 {
        return Err(invalid("league.draft_rounds", "must be greater than 0"));
    }
    if league.playoff_teams == 0 {
        return Err(invalid("league.playoff_teams", "must be greater than 0"));
    }

    for (i, tenure) in config.regimes.iter().enumerate() {
        if tenure.name.trim().is_empty() {
            return Err(invalid(format!("regimes[{i}].name"), "must not be empty"));
        }
        if let Some(to) = tenure.to {
            if to < tenure.from {
                return Err(invalid(
                    format!("regimes[{i}].to"),
                    format!("{to} is before from = {}", tenure.from),
                ));
            }
        }
    }

    for (i, o) in config.season_overrides.iter().enumerate() {
        if o.regular_season_weeks == Some(0) {
            return Err(invalid(
                format!("seasons[{i}].regular_season_weeks"),
                "must be greater than 0",
            ));
        }
        if o.playoff_teams == Some(0) {
            return Err(invalid(
                format!("seasons[{i}].playoff_teams"),
                "must be greater than 0",
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
