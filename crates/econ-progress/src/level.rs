//! Experience points to level mapping.
//!
//! Levels are always derived from the XP total and never stored, so a
//! profile's level cannot drift away from its experience points.

use serde::{Deserialize, Serialize};

use crate::error::ProgressError;

/// XP needed to clear one level.
pub const DEFAULT_LEVEL_SIZE: i64 = 500;

/// Fixed-size level bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelScale {
    level_size: i64,
}

impl LevelScale {
    /// Create a scale where every level spans `level_size` XP.
    pub fn new(level_size: i64) -> Result<Self, ProgressError> {
        if level_size <= 0 {
            return Err(ProgressError::invalid(format!(
                "level size must be positive, got {level_size}"
            )));
        }
        Ok(Self { level_size })
    }

    /// XP spanned by a single level.
    pub const fn level_size(&self) -> i64 {
        self.level_size
    }

    /// Compute the level reached with `experience_points`.
    ///
    /// # Algorithm
    ///
    /// * `level = xp / level_size + 1`
    /// * `progress_fraction = (xp % level_size) / level_size`
    /// * `xp_to_next_level = level * level_size - xp`
    ///
    /// Negative XP, and XP whose next level would not fit in an `i64`, is
    /// rejected with [`ProgressError::InvalidArgument`].
    pub fn compute(&self, experience_points: i64) -> Result<LevelInfo, ProgressError> {
        if experience_points < 0 {
            return Err(ProgressError::invalid(format!(
                "experience points cannot be negative, got {experience_points}"
            )));
        }

        let completed = experience_points / self.level_size;
        let into_level = experience_points % self.level_size;
        let level_floor_xp = experience_points - into_level;
        let next_level_xp = level_floor_xp.checked_add(self.level_size).ok_or_else(|| {
            ProgressError::invalid(format!(
                "experience points {experience_points} are past the last representable level"
            ))
        })?;

        Ok(LevelInfo {
            level: completed + 1,
            progress_fraction: into_level as f64 / self.level_size as f64,
            xp_to_next_level: next_level_xp - experience_points,
            level_floor_xp,
            next_level_xp,
        })
    }
}

impl Default for LevelScale {
    fn default() -> Self {
        Self {
            level_size: DEFAULT_LEVEL_SIZE,
        }
    }
}

/// Where a learner stands within the level bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    /// Current level, starting at 1.
    pub level: i64,
    /// Share of the current level already earned, in `[0, 1)`.
    pub progress_fraction: f64,
    /// XP still missing before the next level.
    pub xp_to_next_level: i64,
    /// XP total at which the current level started.
    pub level_floor_xp: i64,
    /// XP total at which the next level starts.
    pub next_level_xp: i64,
}

/// Compute the level for `experience_points` with the default 500 XP bands.
pub fn compute_level(experience_points: i64) -> Result<LevelInfo, ProgressError> {
    LevelScale::default().compute(experience_points)
}

/// Number of levels crossed between two level snapshots.
pub fn levels_gained(before: &LevelInfo, after: &LevelInfo) -> i64 {
    (after.level - before.level).max(0)
}
