use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use econ_progress::{ConceptRecord, LearnerId, LearnerProfile, ProfileCommit, StreakUpdate};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    store::{CommitOutcome, ProgressStore},
};

#[derive(Debug, Default)]
struct LearnerState {
    profile: Option<LearnerProfile>,
    concepts: BTreeMap<String, ConceptRecord>,
    applied_commits: HashSet<Uuid>,
}

/// Process-local [`ProgressStore`] for tests and offline use.
///
/// Each write holds the lock for its whole duration, which gives the same
/// atomicity as a database transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    learners: RwLock<HashMap<LearnerId, LearnerState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    async fn load_profile(&self, learner_id: LearnerId) -> Result<LearnerProfile, StoreError> {
        let learners = self.learners.read().await;
        Ok(learners
            .get(&learner_id)
            .and_then(|state| state.profile.clone())
            .unwrap_or_else(|| LearnerProfile::new(learner_id)))
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<(), StoreError> {
        let mut learners = self.learners.write().await;
        learners.entry(profile.learner_id).or_default().profile = Some(profile.clone());
        Ok(())
    }

    async fn record_activity(
        &self,
        learner_id: LearnerId,
        today: NaiveDate,
        update: &StreakUpdate,
    ) -> Result<(), StoreError> {
        let mut learners = self.learners.write().await;
        let profile = learners
            .entry(learner_id)
            .or_default()
            .profile
            .get_or_insert_with(|| LearnerProfile::new(learner_id));
        profile.current_streak_days = update.streak_days;
        profile.last_active_date = profile.last_active_date.max(Some(today));
        profile.study_history.insert(today);
        Ok(())
    }

    async fn load_concept_records(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<ConceptRecord>, StoreError> {
        let learners = self.learners.read().await;
        Ok(learners
            .get(&learner_id)
            .map(|state| state.concepts.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_concept_record(
        &self,
        learner_id: LearnerId,
        record: &ConceptRecord,
    ) -> Result<(), StoreError> {
        let mut learners = self.learners.write().await;
        learners
            .entry(learner_id)
            .or_default()
            .concepts
            .insert(record.term.clone(), record.clone());
        Ok(())
    }

    async fn apply_commit(
        &self,
        learner_id: LearnerId,
        commit: &ProfileCommit,
    ) -> Result<CommitOutcome, StoreError> {
        let mut learners = self.learners.write().await;
        let state = learners.entry(learner_id).or_default();

        if state.applied_commits.contains(&commit.commit_id) {
            return Ok(CommitOutcome::AlreadyApplied);
        }

        state
            .profile
            .get_or_insert_with(|| LearnerProfile::new(learner_id))
            .apply_commit(commit)
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        state.applied_commits.insert(commit.commit_id);
        for record in &commit.concept_updates {
            state.concepts.insert(record.term.clone(), record.clone());
        }
        Ok(CommitOutcome::Applied)
    }
}
