use econ_progress::{
    EngineConfig, LevelScale, ProgressError, ReviewPolicy, StreakPolicy,
    level::DEFAULT_LEVEL_SIZE,
};
use serde::Deserialize;

/// Prefix of every environment variable read by [`ServiceConfig`].
pub const ENV_PREFIX: &str = "ECON_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub env: Environment,
    /// Only needed for the PostgreSQL store.
    pub database_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_level_size")]
    pub level_size: i64,
    #[serde(default = "default_correct_gain")]
    pub correct_gain: u8,
    #[serde(default = "default_incorrect_penalty")]
    pub incorrect_penalty: u8,
    #[serde(default = "default_comeback_window_days")]
    pub comeback_window_days: i64,
    #[serde(default = "default_streak_milestone_every")]
    pub streak_milestone_every: u32,
    #[serde(default = "default_lesson_milestone_every")]
    pub lesson_milestone_every: usize,
}

const fn default_db_max_connections() -> u32 {
    10
}

const fn default_level_size() -> i64 {
    DEFAULT_LEVEL_SIZE
}

const fn default_correct_gain() -> u8 {
    15
}

const fn default_incorrect_penalty() -> u8 {
    20
}

const fn default_comeback_window_days() -> i64 {
    7
}

const fn default_streak_milestone_every() -> u32 {
    7
}

const fn default_lesson_milestone_every() -> usize {
    5
}

impl ServiceConfig {
    /// Read `ECON_*` variables, loading `.env` first if there is one.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Same as [`ServiceConfig::from_env`] over explicit pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    /// Build and validate the engine tunables.
    pub fn engine(&self) -> Result<EngineConfig, ProgressError> {
        let config = EngineConfig {
            levels: LevelScale::new(self.level_size)?,
            review: ReviewPolicy::with_steps(self.correct_gain, self.incorrect_penalty)?,
            streak: StreakPolicy::new(self.comeback_window_days, self.streak_milestone_every)?,
            ..EngineConfig::default()
        };
        config.with_lesson_milestone_every(self.lesson_milestone_every)
    }
}
