use chrono::{DateTime, NaiveDate, Utc};
use econ_progress::{Achievement, ConceptRecord, DailyActivity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Scalar columns of a learner.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LearnerRow {
    pub id: Uuid,
    pub experience_points: i64,
    pub current_streak_days: i32,
    pub last_active_date: Option<NaiveDate>,
}

/// One study day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityRow {
    pub activity_date: NaiveDate,
    pub xp: i64,
    pub lessons: i32,
}

impl ActivityRow {
    pub fn to_activity(&self) -> Result<DailyActivity, StoreError> {
        let lessons = u32::try_from(self.lessons).map_err(|_| {
            StoreError::Corrupt(format!(
                "negative lesson count {} on {}",
                self.lessons, self.activity_date
            ))
        })?;
        Ok(DailyActivity {
            xp: self.xp,
            lessons,
        })
    }

    pub const fn is_empty(&self) -> bool {
        self.xp == 0 && self.lessons == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AchievementRow {
    pub achievement: String,
    pub earned_on: NaiveDate,
}

impl AchievementRow {
    pub fn to_achievement(&self) -> Result<(Achievement, NaiveDate), StoreError> {
        Achievement::parse(&self.achievement)
            .map(|a| (a, self.earned_on))
            .ok_or_else(|| {
                StoreError::Corrupt(format!("unknown achievement '{}'", self.achievement))
            })
    }
}

/// Spaced repetition state of one concept.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConceptRow {
    pub term: String,
    pub category: String,
    pub strength: i16,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ConceptRow> for ConceptRecord {
    type Error = StoreError;

    fn try_from(row: ConceptRow) -> Result<Self, Self::Error> {
        let strength = u8::try_from(row.strength)
            .ok()
            .filter(|s| *s <= econ_progress::review::MAX_STRENGTH)
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "strength {} out of range for '{}'",
                    row.strength, row.term
                ))
            })?;
        Ok(Self {
            term: row.term,
            category: row.category,
            strength,
            last_reviewed_at: row.last_reviewed_at,
        })
    }
}
