//! Badges earned from streaks, levels and lesson results.

use serde::{Deserialize, Serialize};

/// A badge a learner can earn once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    /// 7 day streak.
    WeekStreak,
    /// 30 day streak.
    PerfectMonth,
    /// Every graded stage of a lesson answered correctly.
    PerfectScore,
    /// 5 lessons completed on the same day.
    FastLearner,
    /// 50 concepts tracked.
    KnowledgeSeeker,
    /// Level 10 reached.
    EconomyExpert,
}

impl Achievement {
    pub const ALL: [Self; 6] = [
        Self::WeekStreak,
        Self::PerfectMonth,
        Self::PerfectScore,
        Self::FastLearner,
        Self::KnowledgeSeeker,
        Self::EconomyExpert,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WeekStreak => "week_streak",
            Self::PerfectMonth => "perfect_month",
            Self::PerfectScore => "perfect_score",
            Self::FastLearner => "fast_learner",
            Self::KnowledgeSeeker => "knowledge_seeker",
            Self::EconomyExpert => "economy_expert",
        }
    }

    /// Inverse of [`Achievement::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }

    fn is_met(&self, snapshot: &AchievementSnapshot) -> bool {
        match self {
            Self::WeekStreak => snapshot.streak_days >= 7,
            Self::PerfectMonth => snapshot.streak_days >= 30,
            Self::PerfectScore => snapshot.perfect_lesson,
            Self::FastLearner => snapshot.lessons_today >= 5,
            Self::KnowledgeSeeker => snapshot.concept_count >= 50,
            Self::EconomyExpert => snapshot.level >= 10,
        }
    }
}

/// The learner state achievements are judged against, taken right after a
/// lesson is credited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AchievementSnapshot {
    pub streak_days: u32,
    pub level: i64,
    pub lessons_today: u32,
    pub concept_count: usize,
    pub perfect_lesson: bool,
}

/// Achievements met by `snapshot` that are not in `already_earned`.
pub fn newly_earned<'a>(
    snapshot: &AchievementSnapshot,
    already_earned: impl IntoIterator<Item = &'a Achievement>,
) -> Vec<Achievement> {
    let earned: Vec<_> = already_earned.into_iter().copied().collect();
    Achievement::ALL
        .into_iter()
        .filter(|a| !earned.contains(a) && a.is_met(snapshot))
        .collect()
}
