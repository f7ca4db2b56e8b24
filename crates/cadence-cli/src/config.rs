use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Owner this CLI acts as when no --owner flag is given.
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    /// Tenant new tasks are created under.
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
}

/// Configuration for the reconciliation engine's default window.
#[derive(Deserialize, Debug)]
pub struct RecurrenceConfig {
    /// Days past today covered when no explicit window is passed.
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            lookahead_days: default_lookahead_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            owner_id: None,
            tenant_id: None,
            recurrence: RecurrenceConfig::default(),
        }
    }
}

fn default_db_path() -> String {
    "cadence.db".to_string()
}

fn default_lookahead_days() -> u32 {
    30
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("cadence.toml"))
            .merge(Env::prefixed("CADENCE_"))
            .extract()
    }
}
