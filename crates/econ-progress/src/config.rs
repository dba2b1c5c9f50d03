use serde::{Deserialize, Serialize};

use crate::{
    error::ProgressError,
    lesson::Stage,
    level::LevelScale,
    review::ReviewPolicy,
    streak::StreakPolicy,
};

/// XP awarded for finishing each graded stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRewards {
    /// Paid once every flashcard has been reviewed.
    pub flashcard: i64,
    /// Paid for the fill-in-the-blank stage, right or wrong.
    pub fill_blank: i64,
    /// Paid for the multiple choice stage, right or wrong.
    pub multiple_choice: i64,
    /// Paid for the matching stage, right or wrong.
    pub matching: i64,
}

impl StageRewards {
    /// Reward for `stage`; ungraded stages earn nothing.
    pub const fn for_stage(&self, stage: Stage) -> i64 {
        match stage {
            Stage::Flashcard => self.flashcard,
            Stage::FillBlank => self.fill_blank,
            Stage::MultipleChoice => self.multiple_choice,
            Stage::Matching => self.matching,
            Stage::Intro | Stage::Complete => 0,
        }
    }
}

impl Default for StageRewards {
    fn default() -> Self {
        Self {
            flashcard: 15,
            fill_blank: 15,
            multiple_choice: 15,
            matching: 20,
        }
    }
}

/// Every tunable of the progress engine in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub levels: LevelScale,
    pub review: ReviewPolicy,
    pub streak: StreakPolicy,
    pub rewards: StageRewards,
    /// Flag a lesson milestone every this many completed lessons.
    pub lesson_milestone_every: usize,
}

impl EngineConfig {
    pub fn with_lesson_milestone_every(mut self, every: usize) -> Result<Self, ProgressError> {
        if every == 0 {
            return Err(ProgressError::invalid("lesson milestone interval must be positive"));
        }
        self.lesson_milestone_every = every;
        Ok(self)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            levels: LevelScale::default(),
            review: ReviewPolicy::default(),
            streak: StreakPolicy::default(),
            rewards: StageRewards::default(),
            lesson_milestone_every: 5,
        }
    }
}
