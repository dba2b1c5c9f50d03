use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use econ_db::{CommitOutcome, MemoryStore, ProgressStore, StoreError};
use econ_progress::{
    ConceptRecord, EngineConfig, LearnerId, LearnerProfile, LessonConcept, LessonPlan,
    ProfileCommit, StreakUpdate,
};
use econ_service::ProgressService;
use tokio::sync::Mutex;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 14, 9, 30, 0).unwrap()
}

pub fn rates_plan() -> LessonPlan {
    LessonPlan::new(
        "lesson-rates",
        vec![
            LessonConcept::new("금리", "금융"),
            LessonConcept::new("통화정책", "경제학"),
        ],
    )
    .unwrap()
}

pub fn memory_service() -> ProgressService<MemoryStore> {
    ProgressService::new(MemoryStore::new(), EngineConfig::default())
}

pub fn flaky_service() -> ProgressService<FlakyStore> {
    ProgressService::new(FlakyStore::default(), EngineConfig::default())
}

pub fn racing_service() -> ProgressService<RacingStore> {
    ProgressService::new(RacingStore::default(), EngineConfig::default())
}

/// Memory store that fails a configurable number of commits.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    /// Commits rejected before touching the store.
    failing_commits: AtomicUsize,
    /// Commits written but reported as failed, like a dropped connection
    /// after the transaction committed.
    lost_acks: AtomicUsize,
}

impl FlakyStore {
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    pub fn lose_next_acks(&self, count: usize) {
        self.lost_acks.store(count, Ordering::SeqCst);
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ProgressStore for FlakyStore {
    async fn load_profile(&self, learner_id: LearnerId) -> Result<LearnerProfile, StoreError> {
        self.inner.load_profile(learner_id).await
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<(), StoreError> {
        self.inner.save_profile(profile).await
    }

    async fn record_activity(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
        update: &StreakUpdate,
    ) -> Result<(), StoreError> {
        self.inner.record_activity(learner_id, today, update).await
    }

    async fn load_concept_records(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ConceptRecord>, StoreError> {
        self.inner.load_concept_records(learner_id).await
    }

    async fn save_concept_record(
        &self,
        learner_id: LearnerId,
        record: &ConceptRecord,
    ) -> Result<(), StoreError> {
        self.inner.save_concept_record(learner_id, record).await
    }

    async fn apply_commit(
        &self,
        learner_id: LearnerId,
        commit: &ProfileCommit,
    ) -> Result<CommitOutcome, StoreError> {
        if Self::take(&self.failing_commits) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        let outcome = self.inner.apply_commit(learner_id, commit).await?;
        if Self::take(&self.lost_acks) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        Ok(outcome)
    }
}

/// Memory store that lands a queued commit right after the next profile
/// load, so the caller works from a snapshot that is already stale.
#[derive(Debug, Default)]
pub struct RacingStore {
    inner: MemoryStore,
    queued: Mutex<Option<(LearnerId, ProfileCommit)>>,
}

impl RacingStore {
    pub async fn commit_after_next_load(&self, learner_id: LearnerId, commit: ProfileCommit) {
        *self.queued.lock().await = Some((learner_id, commit));
    }
}

impl ProgressStore for RacingStore {
    async fn load_profile(&self, learner_id: LearnerId) -> Result<LearnerProfile, StoreError> {
        let profile = self.inner.load_profile(learner_id).await?;
        let queued = self.queued.lock().await.take();
        if let Some((queued_learner, commit)) = queued {
            self.inner.apply_commit(queued_learner, &commit).await?;
        }
        Ok(profile)
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<(), StoreError> {
        self.inner.save_profile(profile).await
    }

    async fn record_activity(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
        update: &StreakUpdate,
    ) -> Result<(), StoreError> {
        self.inner.record_activity(learner_id, today, update).await
    }

    async fn load_concept_records(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ConceptRecord>, StoreError> {
        self.inner.load_concept_records(learner_id).await
    }

    async fn save_concept_record(
        &self,
        learner_id: LearnerId,
        record: &ConceptRecord,
    ) -> Result<(), StoreError> {
        self.inner.save_concept_record(learner_id, record).await
    }

    async fn apply_commit(
        &self,
        learner_id: LearnerId,
        commit: &ProfileCommit,
    ) -> Result<CommitOutcome, StoreError> {
        self.inner.apply_commit(learner_id, commit).await
    }
}
