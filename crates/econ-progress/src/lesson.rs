//! Lesson flow state machine.
//!
//! A session walks a fixed, linear stage sequence:
//! `intro -> flashcard -> fillblank -> multiplechoice -> matching -> complete`.
//! Counters live on the session only. The XP earned reaches the learner
//! profile through the [`PendingCommit`] produced on `complete`, never
//! before. Abandoning consumes the session and drops everything.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ProgressError;

/// Most concepts a single lesson may introduce.
pub const MAX_LESSON_CONCEPTS: usize = 20;

/// One step of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Intro,
    Flashcard,
    FillBlank,
    MultipleChoice,
    Matching,
    Complete,
}

impl Stage {
    /// Every stage in traversal order.
    pub const SEQUENCE: [Self; 6] = [
        Self::Intro,
        Self::Flashcard,
        Self::FillBlank,
        Self::MultipleChoice,
        Self::Matching,
        Self::Complete,
    ];

    /// Stages that are graded and count as attempts.
    pub const GRADED: [Self; 4] = [
        Self::Flashcard,
        Self::FillBlank,
        Self::MultipleChoice,
        Self::Matching,
    ];

    /// Stable label for logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Flashcard => "flashcard",
            Self::FillBlank => "fillblank",
            Self::MultipleChoice => "multiplechoice",
            Self::Matching => "matching",
            Self::Complete => "complete",
        }
    }

    /// Whether the stage is scored and counted as an attempt.
    pub const fn is_graded(&self) -> bool {
        matches!(
            self,
            Self::Flashcard | Self::FillBlank | Self::MultipleChoice | Self::Matching
        )
    }
}

/// A concept introduced by a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LessonConcept {
    #[validate(length(min = 1, max = 100))]
    pub term: String,
    #[validate(length(max = 100))]
    pub category: String,
}

impl LessonConcept {
    pub fn new(term: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            category: category.into(),
        }
    }
}

/// What a lesson teaches, as handed over by the content provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LessonPlan {
    #[validate(length(min = 1, max = 64))]
    pub lesson_id: String,
    #[validate(length(min = 1), nested)]
    pub concepts: Vec<LessonConcept>,
}

impl LessonPlan {
    /// Build and validate a plan.
    pub fn new(
        lesson_id: impl Into<String>,
        concepts: Vec<LessonConcept>,
    ) -> Result<Self, ProgressError> {
        let plan = Self {
            lesson_id: lesson_id.into(),
            concepts,
        };
        plan.check()?;
        Ok(plan)
    }

    /// Validate field bounds, the concept count and term uniqueness.
    pub fn check(&self) -> Result<(), ProgressError> {
        self.validate()
            .map_err(|e| ProgressError::invalid(format!("invalid lesson plan: {e}")))?;

        if self.concepts.len() > MAX_LESSON_CONCEPTS {
            return Err(ProgressError::invalid(format!(
                "lesson {} has {} concepts, at most {MAX_LESSON_CONCEPTS} are allowed",
                self.lesson_id,
                self.concepts.len()
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for concept in &self.concepts {
            if !seen.insert(concept.term.as_str()) {
                return Err(ProgressError::invalid(format!(
                    "duplicate term '{}' in lesson {}",
                    concept.term, self.lesson_id
                )));
            }
        }
        Ok(())
    }

    /// Terms in plan order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.concepts.iter().map(|c| c.term.as_str())
    }
}

/// Correctness for one term within a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermOutcome {
    pub term: String,
    pub correct: bool,
}

/// What a stage reports when the learner finishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub xp_earned: i64,
    pub correct: bool,
    /// Per-term detail. Empty means `correct` applies to every lesson term.
    #[serde(default)]
    pub term_outcomes: Vec<TermOutcome>,
}

impl StageResult {
    pub const fn new(xp_earned: i64, correct: bool) -> Self {
        Self {
            xp_earned,
            correct,
            term_outcomes: Vec::new(),
        }
    }

    /// The intro only gates the start: no XP, always correct.
    pub const fn intro() -> Self {
        Self::new(0, true)
    }

    pub fn with_term_outcomes(mut self, outcomes: Vec<TermOutcome>) -> Self {
        self.term_outcomes = outcomes;
        self
    }
}

/// Final tally emitted on reaching `complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub lesson_id: String,
    pub accumulated_xp: i64,
    pub correct_count: u32,
    pub total_attempts: u32,
    /// `correct_count / total_attempts`, in `[0, 1]`.
    pub accuracy: f64,
}

impl LessonSummary {
    pub fn is_perfect(&self) -> bool {
        self.total_attempts > 0 && self.correct_count == self.total_attempts
    }
}

/// Everything needed to credit a completed lesson to a profile.
///
/// Survives a failed store write so the same commit can be retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCommit {
    /// Idempotency key for the store.
    pub commit_id: Uuid,
    pub summary: LessonSummary,
    /// Concepts the lesson taught, with their categories.
    pub concepts: Vec<LessonConcept>,
    /// Per-term answers in stage order.
    pub term_outcomes: Vec<TermOutcome>,
}

/// Result of [`LessonSession::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Moved on to the given stage.
    Next(Stage),
    /// Reached `complete`.
    Completed(PendingCommit),
}

/// What was thrown away by [`LessonSession::abandon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned {
    pub stage: Stage,
    pub discarded_xp: i64,
}

/// An in-progress traversal of one lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonSession {
    plan: LessonPlan,
    stage_index: usize,
    accumulated_xp: i64,
    correct_count: u32,
    total_attempts: u32,
    term_outcomes: Vec<TermOutcome>,
}

impl LessonSession {
    /// Start a session at `intro` with zeroed counters.
    pub fn start(plan: LessonPlan) -> Result<Self, ProgressError> {
        plan.check()?;
        tracing::debug!(lesson_id = %plan.lesson_id, "Lesson session started");
        Ok(Self {
            plan,
            stage_index: 0,
            accumulated_xp: 0,
            correct_count: 0,
            total_attempts: 0,
            term_outcomes: Vec::new(),
        })
    }

    pub fn plan(&self) -> &LessonPlan {
        &self.plan
    }

    pub fn stage(&self) -> Stage {
        Stage::SEQUENCE[self.stage_index]
    }

    pub const fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub const fn accumulated_xp(&self) -> i64 {
        self.accumulated_xp
    }

    pub const fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub const fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    /// Share of the sequence passed so far, for a progress bar.
    pub fn progress(&self) -> f64 {
        (self.stage_index + 1) as f64 / Stage::SEQUENCE.len() as f64
    }

    /// Finish the current stage and move to the next one.
    ///
    /// The intro accepts only [`StageResult::intro`] and is not counted as
    /// an attempt. Graded stages add their XP and one attempt. Reaching
    /// `complete` yields the [`PendingCommit`]; any further call fails with
    /// [`ProgressError::SessionFinished`].
    pub fn advance(&mut self, result: StageResult) -> Result<Advance, ProgressError> {
        let stage = self.stage();
        match stage {
            Stage::Complete => return Err(ProgressError::SessionFinished),
            Stage::Intro => {
                if result.xp_earned != 0 {
                    return Err(ProgressError::invalid("the intro stage awards no XP"));
                }
                if !result.correct || !result.term_outcomes.is_empty() {
                    return Err(ProgressError::invalid(
                        "the intro stage is ungraded and always correct",
                    ));
                }
            }
            _ => self.grade(stage, result)?,
        }

        self.stage_index += 1;
        let next = self.stage();
        tracing::debug!(
            lesson_id = %self.plan.lesson_id,
            from = stage.as_str(),
            to = next.as_str(),
            accumulated_xp = self.accumulated_xp,
            "Lesson stage advanced"
        );

        if next == Stage::Complete {
            return Ok(Advance::Completed(self.pending_commit()));
        }
        Ok(Advance::Next(next))
    }

    /// Leave the lesson early. No partial credit is kept anywhere.
    pub fn abandon(self) -> Abandoned {
        tracing::info!(
            lesson_id = %self.plan.lesson_id,
            stage = self.stage().as_str(),
            discarded_xp = self.accumulated_xp,
            "Lesson abandoned"
        );
        Abandoned {
            stage: self.stage(),
            discarded_xp: self.accumulated_xp,
        }
    }

    fn grade(&mut self, stage: Stage, result: StageResult) -> Result<(), ProgressError> {
        if result.xp_earned < 0 {
            return Err(ProgressError::invalid(format!(
                "stage {} reported negative XP ({})",
                stage.as_str(),
                result.xp_earned
            )));
        }

        let accumulated_xp = self
            .accumulated_xp
            .checked_add(result.xp_earned)
            .ok_or_else(|| {
                ProgressError::invalid(format!(
                    "stage {} pushes lesson XP past {}",
                    stage.as_str(),
                    i64::MAX
                ))
            })?;

        let outcomes = if result.term_outcomes.is_empty() {
            self.plan
                .terms()
                .map(|term| TermOutcome {
                    term: term.to_string(),
                    correct: result.correct,
                })
                .collect()
        } else {
            for outcome in &result.term_outcomes {
                if !self.plan.terms().any(|term| term == outcome.term) {
                    return Err(ProgressError::invalid(format!(
                        "term '{}' is not part of lesson {}",
                        outcome.term, self.plan.lesson_id
                    )));
                }
            }
            result.term_outcomes
        };

        self.accumulated_xp = accumulated_xp;
        self.total_attempts += 1;
        if result.correct {
            self.correct_count += 1;
        }
        self.term_outcomes.extend(outcomes);
        Ok(())
    }

    fn pending_commit(&self) -> PendingCommit {
        let accuracy = if self.total_attempts == 0 {
            0.0
        } else {
            f64::from(self.correct_count) / f64::from(self.total_attempts)
        };

        PendingCommit {
            commit_id: Uuid::new_v4(),
            summary: LessonSummary {
                lesson_id: self.plan.lesson_id.clone(),
                accumulated_xp: self.accumulated_xp,
                correct_count: self.correct_count,
                total_attempts: self.total_attempts,
                accuracy,
            },
            concepts: self.plan.concepts.clone(),
            term_outcomes: self.term_outcomes.clone(),
        }
    }
}
