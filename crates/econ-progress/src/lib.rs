//! Progress engine for the economics news learning app.
//!
//! This crate holds the pure rules behind learner progress: XP to level
//! mapping, daily streaks, spaced repetition over concepts, the lesson flow
//! state machine and the commit that credits a finished lesson to a
//! profile. It performs no I/O; persistence lives in `econ-db`.

pub mod achievement;
pub mod config;
pub mod error;
pub mod exercise;
pub mod lesson;
pub mod level;
pub mod profile;
pub mod review;
pub mod streak;

pub use achievement::Achievement;
pub use config::{EngineConfig, StageRewards};
pub use error::ProgressError;
pub use exercise::{ContentProvider, Question, StageAnswers, StaticContent, grade_stage};
pub use lesson::{
    Abandoned, Advance, LessonConcept, LessonPlan, LessonSession, LessonSummary, PendingCommit,
    Stage, StageResult, TermOutcome,
};
pub use level::{LevelInfo, LevelScale, compute_level};
pub use profile::{DailyActivity, LearnerId, LearnerProfile, ProfileCommit, plan_commit};
pub use review::{
    ConceptRecord, ReviewPolicy, ReviewSummary, is_due, record_outcome, review_summary,
    select_due_concepts,
};
pub use streak::{StreakEvent, StreakPolicy, StreakUpdate, update_streak};
