//! Learner profile and the single funnel that credits lessons to it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    achievement::{Achievement, AchievementSnapshot, newly_earned},
    config::EngineConfig,
    error::ProgressError,
    lesson::PendingCommit,
    level::LevelInfo,
    review::ConceptRecord,
    streak::{StreakUpdate, update_streak_with},
};

/// Learner identifier.
pub type LearnerId = Uuid;

/// Activity counters for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub xp: i64,
    pub lessons: u32,
}

/// Persistent progress of one learner.
///
/// The level is not stored; derive it with [`LearnerProfile::level`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: LearnerId,
    pub experience_points: i64,
    pub current_streak_days: u32,
    pub last_active_date: Option<NaiveDate>,
    pub completed_lesson_ids: BTreeSet<String>,
    pub study_history: BTreeSet<NaiveDate>,
    pub activity: BTreeMap<NaiveDate, DailyActivity>,
    pub achievements: BTreeMap<Achievement, NaiveDate>,
}

impl LearnerProfile {
    /// A learner with no recorded activity.
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            experience_points: 0,
            current_streak_days: 0,
            last_active_date: None,
            completed_lesson_ids: BTreeSet::new(),
            study_history: BTreeSet::new(),
            activity: BTreeMap::new(),
            achievements: BTreeMap::new(),
        }
    }

    pub fn level(&self, config: &EngineConfig) -> Result<LevelInfo, ProgressError> {
        config.levels.compute(self.experience_points)
    }

    /// The 7 days ending on `today`, oldest first, zero-filled.
    pub fn weekly_activity(&self, today: NaiveDate) -> Vec<(NaiveDate, DailyActivity)> {
        (0..7)
            .rev()
            .map(|offset| {
                let day = today - Duration::days(offset);
                (day, self.activity.get(&day).copied().unwrap_or_default())
            })
            .collect()
    }

    /// Apply a commit produced by [`plan_commit`].
    ///
    /// XP and daily counters are added, sets are unioned; nothing is
    /// overwritten except the streak, which is a pure function of the day.
    /// Totals that would overflow are rejected before anything changes.
    pub fn apply_commit(&mut self, commit: &ProfileCommit) -> Result<(), ProgressError> {
        let day = self
            .activity
            .get(&commit.study_date)
            .copied()
            .unwrap_or_default();
        let overflow = || {
            ProgressError::invalid(format!(
                "lesson {} overflows the totals of learner {}",
                commit.lesson_id, self.learner_id
            ))
        };
        let experience_points = self
            .experience_points
            .checked_add(commit.xp_delta)
            .ok_or_else(overflow)?;
        let day = DailyActivity {
            xp: day.xp.checked_add(commit.xp_delta).ok_or_else(overflow)?,
            lessons: day.lessons.checked_add(1).ok_or_else(overflow)?,
        };

        self.experience_points = experience_points;
        self.activity.insert(commit.study_date, day);
        self.current_streak_days = commit.streak.streak_days;
        self.last_active_date = Some(
            self.last_active_date
                .map_or(commit.study_date, |last| last.max(commit.study_date)),
        );
        self.completed_lesson_ids.insert(commit.lesson_id.clone());
        self.study_history.insert(commit.study_date);

        for achievement in &commit.new_achievements {
            self.achievements
                .entry(*achievement)
                .or_insert(commit.study_date);
        }
        Ok(())
    }
}

/// The profile and concept mutations of one completed lesson, ready to be
/// written atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCommit {
    pub commit_id: Uuid,
    pub lesson_id: String,
    /// Added to the stored XP, never assigned.
    pub xp_delta: i64,
    pub study_date: NaiveDate,
    pub streak: StreakUpdate,
    /// Post-update records for every term the lesson touched.
    pub concept_updates: Vec<ConceptRecord>,
    pub new_achievements: Vec<Achievement>,
    pub level_before: LevelInfo,
    pub level_after: LevelInfo,
    /// Whether this lesson landed on a lesson-count milestone.
    pub lesson_milestone: bool,
}

/// Turn a completed session into the mutations to persist.
///
/// Pure: `profile` and `records` are the state loaded before the write.
/// New terms start at strength 0 with the lesson's category, then receive
/// one outcome per graded stage in stage order.
pub fn plan_commit(
    config: &EngineConfig,
    profile: &LearnerProfile,
    records: &[ConceptRecord],
    pending: &PendingCommit,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ProfileCommit, ProgressError> {
    let summary = &pending.summary;
    if summary.accumulated_xp < 0 {
        return Err(ProgressError::invalid(format!(
            "lesson {} carries negative XP ({})",
            summary.lesson_id, summary.accumulated_xp
        )));
    }

    let streak = update_streak_with(
        &config.streak,
        profile.last_active_date,
        profile.current_streak_days,
        today,
    )?;

    let level_before = profile.level(config)?;
    let xp_after = profile
        .experience_points
        .checked_add(summary.accumulated_xp)
        .ok_or_else(|| {
            ProgressError::invalid(format!(
                "lesson {} pushes the XP total past {}",
                summary.lesson_id,
                i64::MAX
            ))
        })?;
    let level_after = config.levels.compute(xp_after)?;

    let mut by_term: HashMap<&str, ConceptRecord> = records
        .iter()
        .map(|record| (record.term.as_str(), record.clone()))
        .collect();

    let mut touched: Vec<&str> = Vec::new();
    for concept in &pending.concepts {
        by_term
            .entry(concept.term.as_str())
            .or_insert_with(|| ConceptRecord::new(&concept.term, &concept.category));
        if !touched.contains(&concept.term.as_str()) {
            touched.push(concept.term.as_str());
        }
    }

    for outcome in &pending.term_outcomes {
        let Some(record) = by_term.get_mut(outcome.term.as_str()) else {
            return Err(ProgressError::invalid(format!(
                "term '{}' was answered but is not part of lesson {}",
                outcome.term, summary.lesson_id
            )));
        };
        *record = config.review.record_outcome(record, outcome.correct, now);
    }

    let concept_updates: Vec<ConceptRecord> = touched
        .iter()
        .filter_map(|term| by_term.get(term).cloned())
        .collect();

    let first_completion = !profile.completed_lesson_ids.contains(&summary.lesson_id);
    let completed_after = profile.completed_lesson_ids.len() + usize::from(first_completion);
    let lesson_milestone = first_completion
        && completed_after > 0
        && completed_after % config.lesson_milestone_every == 0;

    let lessons_today = profile
        .activity
        .get(&today)
        .map_or(0, |day| day.lessons)
        + 1;

    let snapshot = AchievementSnapshot {
        streak_days: streak.streak_days,
        level: level_after.level,
        lessons_today,
        concept_count: by_term.len(),
        perfect_lesson: summary.is_perfect(),
    };
    let new_achievements = newly_earned(&snapshot, profile.achievements.keys());

    Ok(ProfileCommit {
        commit_id: pending.commit_id,
        lesson_id: summary.lesson_id.clone(),
        xp_delta: summary.accumulated_xp,
        study_date: today,
        streak,
        concept_updates,
        new_achievements,
        level_before,
        level_after,
        lesson_milestone,
    })
}
