use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use econ_db::{CommitOutcome, PgStore, ProgressStore};
use econ_progress::{
    Abandoned, Achievement, Advance, ConceptRecord, DailyActivity, EngineConfig, LearnerId,
    LessonPlan, LessonSession, LevelInfo, PendingCommit, ProgressError, Question, ReviewSummary,
    StageAnswers, StreakEvent, StreakUpdate, grade_stage,
    level::levels_gained,
    plan_commit,
    streak::{effective_streak, update_streak_with},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    error::{CommitError, ServiceError},
    metrics,
};

/// What a successful lesson commit changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitReceipt {
    pub commit_id: Uuid,
    pub lesson_id: String,
    pub xp_earned: i64,
    pub level_before: LevelInfo,
    pub level_after: LevelInfo,
    pub levels_gained: i64,
    pub streak: StreakUpdate,
    pub new_achievements: Vec<Achievement>,
    pub lesson_milestone: bool,
    /// The commit had already landed on an earlier attempt. The other
    /// fields then describe the stored state, not the first credit.
    pub already_applied: bool,
}

/// Read-only snapshot for a profile screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileOverview {
    pub learner_id: LearnerId,
    pub experience_points: i64,
    pub level: LevelInfo,
    /// Streak as it stands today; a lapsed streak shows as 0.
    pub streak_days: u32,
    pub completed_lessons: usize,
    pub learned_concepts: usize,
    pub review: ReviewSummary,
    pub weekly_activity: Vec<(NaiveDate, DailyActivity)>,
    pub achievements: BTreeMap<Achievement, NaiveDate>,
}

/// Funnels every progress mutation through the engine rules and a store.
///
/// Holds no per-learner state: lesson sessions belong to the caller until
/// they are committed.
#[derive(Debug, Clone)]
pub struct ProgressService<S> {
    store: S,
    config: EngineConfig,
}

/// Build a service on PostgreSQL from `ECON_*` configuration.
pub async fn connect(config: &ServiceConfig) -> anyhow::Result<ProgressService<PgStore>> {
    let database_url = config
        .database_url
        .as_deref()
        .context("ECON_DATABASE_URL is not set")?;
    let engine = config.engine().context("invalid engine configuration")?;

    let pool = econ_db::create_pool(database_url, config.db_max_connections).await?;
    econ_db::ensure_db_and_migrate(database_url, &pool).await?;
    tracing::info!(max_connections = config.db_max_connections, "Progress store ready");

    Ok(ProgressService::new(PgStore::new(pool), engine))
}

impl<S: ProgressStore> ProgressService<S> {
    pub const fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// What a qualifying activity on `today` would do to the streak, without
    /// recording it.
    pub async fn check_in(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
    ) -> Result<StreakUpdate, ServiceError> {
        let profile = self.store.load_profile(learner_id).await?;
        let update = update_streak_with(
            &self.config.streak,
            profile.last_active_date,
            profile.current_streak_days,
            today,
        )?;
        tracing::debug!(
            %learner_id,
            event = update.event.as_str(),
            streak_days = update.streak_days,
            "Streak check-in"
        );
        Ok(update)
    }

    /// Record a qualifying activity on `today` and persist the new streak.
    ///
    /// Repeated calls on the same day write nothing.
    pub async fn record_activity(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
    ) -> Result<StreakUpdate, ServiceError> {
        let profile = self.store.load_profile(learner_id).await?;
        let update = update_streak_with(
            &self.config.streak,
            profile.last_active_date,
            profile.current_streak_days,
            today,
        )?;

        if update.event != StreakEvent::SameDay {
            self.store.record_activity(learner_id, today, &update).await?;
            metrics::record_streak_event(update.event);
            tracing::debug!(
                %learner_id,
                event = update.event.as_str(),
                streak_days = update.streak_days,
                days_away = update.days_away,
                "Activity recorded"
            );
        }
        Ok(update)
    }

    pub fn start_lesson(&self, plan: LessonPlan) -> Result<LessonSession, ServiceError> {
        Ok(LessonSession::start(plan)?)
    }

    /// Grade the answers for the session's current stage and advance.
    ///
    /// The intro has nothing to grade; move past it with
    /// [`LessonSession::advance`] and [`econ_progress::StageResult::intro`].
    pub fn submit_stage(
        &self,
        session: &mut LessonSession,
        questions: &[Question],
        answers: &StageAnswers,
    ) -> Result<Advance, ServiceError> {
        let result = grade_stage(
            session.stage(),
            session.plan(),
            questions,
            answers,
            &self.config.rewards,
        )?;
        Ok(session.advance(result)?)
    }

    /// Drop an unfinished session. Nothing reaches the store.
    pub fn abandon_lesson(&self, session: LessonSession) -> Abandoned {
        let abandoned = session.abandon();
        metrics::record_lesson_abandoned(abandoned.stage);
        abandoned
    }

    /// Credit a completed lesson to the learner.
    ///
    /// On failure the pending commit comes back inside the error and can be
    /// passed to this method again.
    pub async fn commit_lesson(
        &self,
        learner_id: LearnerId,
        pending: PendingCommit,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CommitReceipt, CommitError> {
        match self.try_commit(learner_id, &pending, today, now).await {
            Ok(receipt) => Ok(receipt),
            Err(source) => {
                let retryable = source.is_retryable();
                metrics::record_commit_failure(retryable);
                if retryable {
                    tracing::warn!(
                        %learner_id,
                        commit_id = %pending.commit_id,
                        error = %source,
                        "Lesson commit failed, can be retried"
                    );
                } else {
                    tracing::error!(
                        %learner_id,
                        commit_id = %pending.commit_id,
                        error = %source,
                        "Lesson commit failed"
                    );
                }
                Err(CommitError { pending, source })
            }
        }
    }

    async fn try_commit(
        &self,
        learner_id: LearnerId,
        pending: &PendingCommit,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CommitReceipt, ServiceError> {
        let profile = self.store.load_profile(learner_id).await?;
        let records = self.store.load_concept_records(learner_id).await?;
        let commit = plan_commit(&self.config, &profile, &records, pending, today, now)?;

        let outcome = self.store.apply_commit(learner_id, &commit).await?;
        let already_applied = outcome == CommitOutcome::AlreadyApplied;

        metrics::record_lesson_completed(already_applied);
        if !already_applied {
            metrics::record_streak_event(commit.streak.event);
            for outcome in &pending.term_outcomes {
                metrics::record_concept_review(outcome.correct);
            }
        }

        tracing::info!(
            %learner_id,
            lesson_id = %commit.lesson_id,
            commit_id = %commit.commit_id,
            xp = commit.xp_delta,
            level = commit.level_after.level,
            streak_days = commit.streak.streak_days,
            already_applied,
            "Lesson committed"
        );

        Ok(CommitReceipt {
            commit_id: commit.commit_id,
            levels_gained: levels_gained(&commit.level_before, &commit.level_after),
            lesson_id: commit.lesson_id,
            xp_earned: commit.xp_delta,
            level_before: commit.level_before,
            level_after: commit.level_after,
            streak: commit.streak,
            new_achievements: commit.new_achievements,
            lesson_milestone: commit.lesson_milestone,
            already_applied,
        })
    }

    /// Concepts due for review at `now`, weakest first.
    pub async fn review_queue(
        &self,
        learner_id: LearnerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ConceptRecord>, ServiceError> {
        let records = self.store.load_concept_records(learner_id).await?;
        Ok(self
            .config
            .review
            .select_due(&records, now)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Apply one standalone review answer to a known concept.
    pub async fn record_review(
        &self,
        learner_id: LearnerId,
        term: &str,
        correct: bool,
        now: DateTime<Utc>,
    ) -> Result<ConceptRecord, ServiceError> {
        let records = self.store.load_concept_records(learner_id).await?;
        let record = records
            .iter()
            .find(|record| record.term == term)
            .ok_or_else(|| {
                ProgressError::InvalidArgument(format!("'{term}' has no review record"))
            })?;

        let updated = self.config.review.record_outcome(record, correct, now);
        self.store.save_concept_record(learner_id, &updated).await?;

        metrics::record_concept_review(correct);
        tracing::debug!(
            %learner_id,
            term,
            correct,
            strength = updated.strength,
            "Concept reviewed"
        );
        Ok(updated)
    }

    pub async fn overview(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ProfileOverview, ServiceError> {
        let profile = self.store.load_profile(learner_id).await?;
        let records = self.store.load_concept_records(learner_id).await?;

        Ok(ProfileOverview {
            learner_id,
            experience_points: profile.experience_points,
            level: profile.level(&self.config)?,
            streak_days: effective_streak(
                profile.last_active_date,
                profile.current_streak_days,
                today,
            ),
            completed_lessons: profile.completed_lesson_ids.len(),
            learned_concepts: records.len(),
            review: self.config.review.summarize(&records, now),
            weekly_activity: profile.weekly_activity(today),
            achievements: profile.achievements,
        })
    }
}
