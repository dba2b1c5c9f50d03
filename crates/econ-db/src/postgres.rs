use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use econ_progress::{ConceptRecord, LearnerId, LearnerProfile, ProfileCommit, StreakUpdate};
use sqlx::PgPool;

use crate::{
    error::StoreError,
    repositories::{commit as commit_repo, concept as concept_repo, learner as learner_repo},
    store::{CommitOutcome, ProgressStore},
};

/// [`ProgressStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_db_count(value: u32, what: &str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{what} {value} exceeds column range")))
}

impl ProgressStore for PgStore {
    async fn load_profile(&self, learner_id: LearnerId) -> Result<LearnerProfile, StoreError> {
        let Some(row) = learner_repo::find_learner(&self.pool, learner_id).await? else {
            tracing::debug!(%learner_id, "No stored profile, starting fresh");
            return Ok(LearnerProfile::new(learner_id));
        };

        let current_streak_days = u32::try_from(row.current_streak_days).map_err(|_| {
            StoreError::Corrupt(format!(
                "negative streak {} for {learner_id}",
                row.current_streak_days
            ))
        })?;

        let completed_lesson_ids: BTreeSet<String> =
            learner_repo::find_completed_lessons(&self.pool, learner_id)
                .await?
                .into_iter()
                .collect();

        let mut study_history = BTreeSet::new();
        let mut activity = BTreeMap::new();
        for day in learner_repo::find_activity(&self.pool, learner_id).await? {
            study_history.insert(day.activity_date);
            if !day.is_empty() {
                activity.insert(day.activity_date, day.to_activity()?);
            }
        }

        let achievements = learner_repo::find_achievements(&self.pool, learner_id)
            .await?
            .iter()
            .map(|row| row.to_achievement())
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(LearnerProfile {
            learner_id,
            experience_points: row.experience_points,
            current_streak_days,
            last_active_date: row.last_active_date,
            completed_lesson_ids,
            study_history,
            activity,
            achievements,
        })
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<(), StoreError> {
        let learner_id = profile.learner_id;
        let streak = to_db_count(profile.current_streak_days, "streak")?;

        let mut tx = self.pool.begin().await?;

        learner_repo::upsert_learner(
            &mut *tx,
            learner_id,
            profile.experience_points,
            streak,
            profile.last_active_date,
        )
        .await?;

        for lesson_id in &profile.completed_lesson_ids {
            learner_repo::insert_completed_lesson(&mut *tx, learner_id, lesson_id).await?;
        }

        // Days with no counters still mark the study history
        for date in &profile.study_history {
            let day = profile.activity.get(date).copied().unwrap_or_default();
            let lessons = to_db_count(day.lessons, "lesson count")?;
            learner_repo::upsert_activity(&mut *tx, learner_id, *date, day.xp, lessons).await?;
        }

        for (achievement, earned_on) in &profile.achievements {
            let achievement = achievement.as_str();
            learner_repo::insert_achievement(&mut *tx, learner_id, achievement, *earned_on).await?;
        }

        tx.commit().await?;
        tracing::debug!(%learner_id, xp = profile.experience_points, "Saved profile");
        Ok(())
    }

    async fn record_activity(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
        update: &StreakUpdate,
    ) -> Result<(), StoreError> {
        let streak = to_db_count(update.streak_days, "streak")?;

        let mut tx = self.pool.begin().await?;
        learner_repo::ensure_learner(&mut *tx, learner_id).await?;
        learner_repo::mark_active(&mut *tx, learner_id, streak, today).await?;
        learner_repo::insert_study_day(&mut *tx, learner_id, today).await?;
        tx.commit().await?;

        tracing::debug!(%learner_id, %today, streak_days = update.streak_days, "Recorded activity");
        Ok(())
    }

    async fn load_concept_records(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ConceptRecord>, StoreError> {
        concept_repo::find_concepts(&self.pool, learner_id)
            .await?
            .into_iter()
            .map(ConceptRecord::try_from)
            .collect()
    }

    async fn save_concept_record(
        &self,
        learner_id: LearnerId,
        record: &ConceptRecord,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        learner_repo::ensure_learner(&mut *tx, learner_id).await?;
        concept_repo::upsert_concept(
            &mut *tx,
            learner_id,
            &record.term,
            &record.category,
            i16::from(record.strength),
            record.last_reviewed_at,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_commit(
        &self,
        learner_id: LearnerId,
        commit: &ProfileCommit,
    ) -> Result<CommitOutcome, StoreError> {
        let streak = to_db_count(commit.streak.streak_days, "streak")?;

        let mut tx = self.pool.begin().await?;

        learner_repo::ensure_learner(&mut *tx, learner_id).await?;

        let claimed = commit_repo::claim_commit(
            &mut *tx,
            commit.commit_id,
            learner_id,
            &commit.lesson_id,
            commit.xp_delta,
        )
        .await?;
        if !claimed {
            tx.rollback().await?;
            tracing::info!(%learner_id, commit_id = %commit.commit_id, "Commit already applied");
            return Ok(CommitOutcome::AlreadyApplied);
        }

        learner_repo::credit_learner(
            &mut *tx,
            learner_id,
            commit.xp_delta,
            streak,
            commit.study_date,
        )
        .await?;
        learner_repo::insert_completed_lesson(&mut *tx, learner_id, &commit.lesson_id).await?;
        learner_repo::increment_activity(&mut *tx, learner_id, commit.study_date, commit.xp_delta)
            .await?;

        for record in &commit.concept_updates {
            concept_repo::upsert_concept(
                &mut *tx,
                learner_id,
                &record.term,
                &record.category,
                i16::from(record.strength),
                record.last_reviewed_at,
            )
            .await?;
        }

        for achievement in &commit.new_achievements {
            learner_repo::insert_achievement(
                &mut *tx,
                learner_id,
                achievement.as_str(),
                commit.study_date,
            )
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            %learner_id,
            commit_id = %commit.commit_id,
            xp_delta = commit.xp_delta,
            concepts = commit.concept_updates.len(),
            "Applied lesson commit"
        );
        Ok(CommitOutcome::Applied)
    }
}
