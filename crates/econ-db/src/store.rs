use std::future::Future;

use chrono::NaiveDate;
use econ_progress::{ConceptRecord, LearnerId, LearnerProfile, ProfileCommit, StreakUpdate};

use crate::error::StoreError;

/// Result of writing a [`ProfileCommit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// The commit id had already landed; nothing was written.
    AlreadyApplied,
}

/// Read/write contract between the progress service and durable storage.
///
/// Level is derived from XP and never written.
pub trait ProgressStore: Send + Sync {
    /// Unknown learners load as a fresh profile.
    fn load_profile(
        &self,
        learner_id: LearnerId,
    ) -> impl Future<Output = Result<LearnerProfile, StoreError>> + Send;

    /// Overwrite the stored profile with `profile`.
    fn save_profile(
        &self,
        profile: &LearnerProfile,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Mark `today` as studied and set the streak from `update`.
    ///
    /// XP, lesson ids, daily counters and achievements are left untouched,
    /// and the last active date never moves backwards.
    fn record_activity(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
        update: &StreakUpdate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load_concept_records(
        &self,
        learner_id: LearnerId,
    ) -> impl Future<Output = Result<Vec<ConceptRecord>, StoreError>> + Send;

    /// Insert or replace the record keyed by its term.
    fn save_concept_record(
        &self,
        learner_id: LearnerId,
        record: &ConceptRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write every mutation of `commit` atomically.
    ///
    /// XP and daily counters are incremented, lesson ids, study dates and
    /// achievements are unioned. Idempotent per commit id.
    fn apply_commit(
        &self,
        learner_id: LearnerId,
        commit: &ProfileCommit,
    ) -> impl Future<Output = Result<CommitOutcome, StoreError>> + Send;
}
