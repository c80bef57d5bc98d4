// ⚙️ Settings - constructed once at process start, passed by reference
//
// Priority (lowest → highest):
// 1. Compiled defaults
// 2. TOML file (--config or BINGO_CONFIG)
// 3. Environment overrides (BINGO_DATA_DIR, BINGO_SIGNUP_CSV, BINGO_BIND)

use crate::teams::{TeamRoster, TeamSettings};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "BINGO_CONFIG";
pub const DATA_DIR_ENV: &str = "BINGO_DATA_DIR";
pub const SIGNUP_CSV_ENV: &str = "BINGO_SIGNUP_CSV";
pub const BIND_ENV: &str = "BINGO_BIND";

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Below this a submission is rejected with NoMatch
    pub accept_threshold: f64,

    /// At or above this a match needs no human confirmation
    pub confident_threshold: f64,

    /// Near-miss alternates surfaced with a fuzzy match
    pub max_alternates: usize,

    /// Minimum similarity for board search results
    pub search_threshold: f64,

    pub search_limit: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            accept_threshold: 0.7,
            confident_threshold: 0.9,
            max_alternates: 3,
            search_threshold: 0.5,
            search_limit: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupSettings {
    /// Paid-status text must contain this (case-insensitive)
    pub paid_marker: String,

    /// CSV export of the signup form
    pub csv_path: Option<PathBuf>,

    /// Fingerprints of rows already processed
    pub ledger_file: String,
}

impl Default for SignupSettings {
    fn default() -> Self {
        SignupSettings {
            paid_marker: "paid".to_string(),
            csv_path: None,
            ledger_file: "processed.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub registry_file: String,
    pub journal_file: String,
    pub teams: Vec<TeamSettings>,
    pub matching: MatchSettings,
    pub signup: SignupSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("config"),
            registry_file: "users.json".to_string(),
            journal_file: "journal.db".to_string(),
            teams: vec![TeamSettings::new("melon"), TeamSettings::new("weenor")],
            matching: MatchSettings::default(),
            signup: SignupSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings: explicit path, else BINGO_CONFIG, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let mut settings = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Settings::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        if settings.teams.is_empty() {
            anyhow::bail!("at least one team must be configured");
        }
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(csv) = std::env::var(SIGNUP_CSV_ENV) {
            self.signup.csv_path = Some(PathBuf::from(csv));
        }
        if let Ok(bind) = std::env::var(BIND_ENV) {
            self.server.bind = bind;
        }
    }

    /// Resolve a configured file name against the data directory
    pub fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.resolve(&self.registry_file)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.resolve(&self.journal_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(&self.signup.ledger_file)
    }

    pub fn roster(&self) -> TeamRoster {
        TeamRoster::new(self.teams.clone())
    }

    /// Settings rooted at a scratch directory (tests, demos)
    pub fn rooted_at(data_dir: &Path) -> Self {
        Settings {
            data_dir: data_dir.to_path_buf(),
            ..Settings::default()
        }
    }
}
