//! Exercise content and per-stage grading.
//!
//! Each graded stage compares the learner's picks against a fixed answer key
//! and reports a [`StageResult`] for the lesson session. Question banks come
//! from a [`ContentProvider`].

use std::collections::{HashMap, HashSet};

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::{
    config::StageRewards,
    error::ProgressError,
    lesson::{LessonPlan, Stage, StageResult, TermOutcome},
};

/// A term/definition pair on a matching board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub term: String,
    pub definition: String,
}

/// One exercise item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    Flashcard {
        term: String,
        definition: String,
        example: String,
    },
    FillBlank {
        /// Sentence with a `___` placeholder.
        sentence: String,
        answer: String,
        options: Vec<String>,
    },
    MultipleChoice {
        prompt: String,
        options: Vec<String>,
        correct_index: usize,
        explanation: String,
        /// Concept the question tests, if any.
        #[serde(default)]
        term: Option<String>,
    },
    Matching {
        pairs: Vec<MatchPair>,
    },
}

impl Question {
    /// The lesson stage this question belongs to.
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Flashcard { .. } => Stage::Flashcard,
            Self::FillBlank { .. } => Stage::FillBlank,
            Self::MultipleChoice { .. } => Stage::MultipleChoice,
            Self::Matching { .. } => Stage::Matching,
        }
    }
}

/// Source of exercise content.
pub trait ContentProvider {
    /// Questions for `lesson_id`, in presentation order. Unknown lessons
    /// yield an empty list.
    fn questions_for_lesson(&self, lesson_id: &str) -> Vec<Question>;
}

/// Question banks held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticContent {
    lessons: HashMap<String, Vec<Question>>,
}

impl StaticContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(mut self, lesson_id: impl Into<String>, questions: Vec<Question>) -> Self {
        self.lessons.insert(lesson_id.into(), questions);
        self
    }
}

impl ContentProvider for StaticContent {
    fn questions_for_lesson(&self, lesson_id: &str) -> Vec<Question> {
        self.lessons.get(lesson_id).cloned().unwrap_or_default()
    }
}

/// What the learner did during one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAnswers {
    /// Number of flashcards flipped through.
    Reviewed(usize),
    /// Option picked for each fill-in-the-blank sentence.
    Blanks(Vec<String>),
    /// Index picked for each multiple choice question.
    Choices(Vec<usize>),
    /// Every (term, definition) pairing attempted, in order.
    Pairings(Vec<(String, String)>),
}

/// Normalize a string for answer comparison: strip accents and punctuation,
/// lowercase, collapse whitespace.
pub fn normalize_for_comparison(s: &str) -> String {
    s.nfd()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Grade one stage of `plan` from the questions of that stage.
///
/// The stage is correct only when every item is answered correctly. The
/// stage reward is paid either way once the stage is finished. Per-term
/// outcomes are reported only for terms the lesson plan teaches.
pub fn grade_stage(
    stage: Stage,
    plan: &LessonPlan,
    questions: &[Question],
    answers: &StageAnswers,
    rewards: &StageRewards,
) -> Result<StageResult, ProgressError> {
    let items: Vec<&Question> = questions.iter().filter(|q| q.stage() == stage).collect();
    let lesson_terms: HashSet<&str> = plan.terms().collect();

    let graded = match (stage, answers) {
        (Stage::Flashcard, StageAnswers::Reviewed(count)) => grade_flashcards(&items, *count)?,
        (Stage::FillBlank, StageAnswers::Blanks(picks)) => grade_blanks(&items, picks)?,
        (Stage::MultipleChoice, StageAnswers::Choices(picks)) => grade_choices(&items, picks)?,
        (Stage::Matching, StageAnswers::Pairings(attempts)) => grade_matching(&items, attempts)?,
        (stage, answers) => {
            return Err(ProgressError::invalid(format!(
                "answers {answers:?} do not fit stage {}",
                stage.as_str()
            )));
        }
    };

    let correct = graded.iter().all(|(_, ok)| *ok);
    let term_outcomes = graded
        .into_iter()
        .filter_map(|(term, ok)| term.map(|term| (term, ok)))
        .filter(|(term, _)| lesson_terms.contains(term.as_str()))
        .map(|(term, correct)| TermOutcome { term, correct })
        .collect();

    Ok(StageResult::new(rewards.for_stage(stage), correct).with_term_outcomes(term_outcomes))
}

/// Definitions of a matching board in random order.
pub fn shuffled_definitions<R: Rng + ?Sized>(pairs: &[MatchPair], rng: &mut R) -> Vec<String> {
    let mut definitions: Vec<String> = pairs.iter().map(|p| p.definition.clone()).collect();
    definitions.shuffle(rng);
    definitions
}

type Graded = Vec<(Option<String>, bool)>;

fn expect_count(stage: Stage, expected: usize, got: usize) -> Result<(), ProgressError> {
    if expected != got {
        return Err(ProgressError::invalid(format!(
            "stage {} has {expected} items but {got} answers were given",
            stage.as_str()
        )));
    }
    Ok(())
}

fn grade_flashcards(items: &[&Question], reviewed: usize) -> Result<Graded, ProgressError> {
    expect_count(Stage::Flashcard, items.len(), reviewed)?;
    Ok(items
        .iter()
        .filter_map(|q| match q {
            Question::Flashcard { term, .. } => Some((Some(term.clone()), true)),
            _ => None,
        })
        .collect())
}

fn grade_blanks(items: &[&Question], picks: &[String]) -> Result<Graded, ProgressError> {
    expect_count(Stage::FillBlank, items.len(), picks.len())?;
    Ok(items
        .iter()
        .zip(picks)
        .filter_map(|(q, pick)| match q {
            Question::FillBlank { answer, .. } => Some((
                Some(answer.clone()),
                normalize_for_comparison(pick) == normalize_for_comparison(answer),
            )),
            _ => None,
        })
        .collect())
}

fn grade_choices(items: &[&Question], picks: &[usize]) -> Result<Graded, ProgressError> {
    expect_count(Stage::MultipleChoice, items.len(), picks.len())?;
    items
        .iter()
        .zip(picks)
        .filter_map(|(q, pick)| match q {
            Question::MultipleChoice {
                options,
                correct_index,
                term,
                ..
            } => Some(if *pick >= options.len() {
                Err(ProgressError::invalid(format!(
                    "choice {pick} is out of range for {} options",
                    options.len()
                )))
            } else {
                Ok((term.clone(), pick == correct_index))
            }),
            _ => None,
        })
        .collect()
}

fn grade_matching(
    items: &[&Question],
    attempts: &[(String, String)],
) -> Result<Graded, ProgressError> {
    let pairs: Vec<&MatchPair> = items
        .iter()
        .filter_map(|q| match q {
            Question::Matching { pairs } => Some(pairs),
            _ => None,
        })
        .flatten()
        .collect();

    let mut matched: HashSet<&str> = HashSet::new();
    let mut missed: HashSet<&str> = HashSet::new();
    for (term, definition) in attempts {
        let Some(pair) = pairs.iter().find(|p| p.term == *term) else {
            return Err(ProgressError::invalid(format!(
                "'{term}' is not on the matching board"
            )));
        };
        if pair.definition == *definition {
            matched.insert(pair.term.as_str());
        } else {
            missed.insert(pair.term.as_str());
        }
    }

    if matched.len() != pairs.len() {
        return Err(ProgressError::invalid(format!(
            "matching board finished with {} of {} pairs matched",
            matched.len(),
            pairs.len()
        )));
    }

    Ok(pairs
        .iter()
        .map(|p| (Some(p.term.clone()), !missed.contains(p.term.as_str())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::LessonConcept;
    use rand::{SeedableRng, rngs::StdRng};

    fn plan() -> LessonPlan {
        LessonPlan::new(
            "lesson-money",
            vec![
                LessonConcept::new("통화정책", "경제학"),
                LessonConcept::new("금리", "금융"),
                LessonConcept::new("물가상승률", "경제학"),
            ],
        )
        .unwrap()
    }

    fn bank() -> Vec<Question> {
        vec![
            Question::Flashcard {
                term: "통화정책".to_string(),
                definition: "중앙은행이 통화량과 금리를 조절하는 정책".to_string(),
                example: "물가가 오르면 금리를 올려요.".to_string(),
            },
            Question::Flashcard {
                term: "금리".to_string(),
                definition: "돈을 빌리는 데 드는 비용".to_string(),
                example: "금리가 오르면 대출 이자가 늘어요.".to_string(),
            },
            Question::FillBlank {
                sentence: "중앙은행은 ___을(를) 사용하여 통화량에 영향을 미쳐요.".to_string(),
                answer: "통화정책".to_string(),
                options: vec!["통화정책".to_string(), "재정정책".to_string()],
            },
            Question::FillBlank {
                sentence: "___은(는) 물가를 조절해요.".to_string(),
                answer: "한국은행".to_string(),
                options: vec!["한국은행".to_string(), "국회".to_string()],
            },
            Question::MultipleChoice {
                prompt: "물가상승률이 높아지면?".to_string(),
                options: vec![
                    "물건 가격이 떨어져요".to_string(),
                    "같은 돈으로 살 수 있는 물건이 줄어들어요".to_string(),
                ],
                correct_index: 1,
                explanation: "구매력이 떨어져요.".to_string(),
                term: Some("물가상승률".to_string()),
            },
            Question::Matching {
                pairs: vec![
                    MatchPair {
                        term: "금리".to_string(),
                        definition: "돈을 빌리는 데 드는 비용".to_string(),
                    },
                    MatchPair {
                        term: "통화정책".to_string(),
                        definition: "통화량을 조절하는 정책".to_string(),
                    },
                ],
            },
        ]
    }

    #[test]
    fn test_normalize_for_comparison() {
        assert_eq!(normalize_for_comparison("  Café,  au LAIT! "), "cafe au lait");
        assert_eq!(
            normalize_for_comparison("통화정책"),
            normalize_for_comparison(" 통화정책. ")
        );
    }

    #[test]
    fn test_flashcards_always_correct() {
        let result = grade_stage(
            Stage::Flashcard,
            &plan(),
            &bank(),
            &StageAnswers::Reviewed(2),
            &StageRewards::default(),
        )
        .unwrap();
        assert_eq!(result.xp_earned, 15);
        assert!(result.correct);
        assert_eq!(result.term_outcomes.len(), 2);
    }

    #[test]
    fn test_fill_blank_partial_miss() {
        let result = grade_stage(
            Stage::FillBlank,
            &plan(),
            &bank(),
            &StageAnswers::Blanks(vec!["통화정책 ".to_string(), "국회".to_string()]),
            &StageRewards::default(),
        )
        .unwrap();
        assert!(!result.correct);
        assert_eq!(result.xp_earned, 15);
        // "한국은행" is not taught by this lesson, so only one term is reported
        assert_eq!(
            result.term_outcomes,
            vec![TermOutcome {
                term: "통화정책".to_string(),
                correct: true,
            }]
        );
    }

    #[test]
    fn test_multiple_choice() {
        let rewards = StageRewards::default();
        let right = grade_stage(
            Stage::MultipleChoice,
            &plan(),
            &bank(),
            &StageAnswers::Choices(vec![1]),
            &rewards,
        )
        .unwrap();
        assert!(right.correct);

        let wrong = grade_stage(
            Stage::MultipleChoice,
            &plan(),
            &bank(),
            &StageAnswers::Choices(vec![0]),
            &rewards,
        )
        .unwrap();
        assert!(!wrong.correct);
        assert!(!wrong.term_outcomes[0].correct);

        let out_of_range = grade_stage(
            Stage::MultipleChoice,
            &plan(),
            &bank(),
            &StageAnswers::Choices(vec![7]),
            &rewards,
        );
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_matching_requires_clean_run_for_correct() {
        let rewards = StageRewards::default();
        let clean = grade_stage(
            Stage::Matching,
            &plan(),
            &bank(),
            &StageAnswers::Pairings(vec![
                ("금리".to_string(), "돈을 빌리는 데 드는 비용".to_string()),
                ("통화정책".to_string(), "통화량을 조절하는 정책".to_string()),
            ]),
            &rewards,
        )
        .unwrap();
        assert!(clean.correct);
        assert_eq!(clean.xp_earned, 20);

        let with_mistake = grade_stage(
            Stage::Matching,
            &plan(),
            &bank(),
            &StageAnswers::Pairings(vec![
                ("금리".to_string(), "통화량을 조절하는 정책".to_string()),
                ("금리".to_string(), "돈을 빌리는 데 드는 비용".to_string()),
                ("통화정책".to_string(), "통화량을 조절하는 정책".to_string()),
            ]),
            &rewards,
        )
        .unwrap();
        assert!(!with_mistake.correct);
        let rate = with_mistake
            .term_outcomes
            .iter()
            .find(|o| o.term == "금리")
            .unwrap();
        assert!(!rate.correct);

        let unfinished = grade_stage(
            Stage::Matching,
            &plan(),
            &bank(),
            &StageAnswers::Pairings(vec![(
                "금리".to_string(),
                "돈을 빌리는 데 드는 비용".to_string(),
            )]),
            &rewards,
        );
        assert!(unfinished.is_err());
    }

    #[test]
    fn test_answer_shape_must_match_stage() {
        let result = grade_stage(
            Stage::FillBlank,
            &plan(),
            &bank(),
            &StageAnswers::Choices(vec![0, 1]),
            &StageRewards::default(),
        );
        assert!(matches!(result, Err(ProgressError::InvalidArgument(_))));

        let count = grade_stage(
            Stage::Flashcard,
            &plan(),
            &bank(),
            &StageAnswers::Reviewed(1),
            &StageRewards::default(),
        );
        assert!(count.is_err());
    }

    #[test]
    fn test_static_content() {
        let content = StaticContent::new().with_lesson("lesson-money", bank());
        assert_eq!(content.questions_for_lesson("lesson-money").len(), 6);
        assert!(content.questions_for_lesson("missing").is_empty());
    }

    #[test]
    fn test_shuffle_is_deterministic_with_seed() {
        let pairs = match &bank()[5] {
            Question::Matching { pairs } => pairs.clone(),
            _ => unreachable!(),
        };
        let a = shuffled_definitions(&pairs, &mut StdRng::seed_from_u64(7));
        let b = shuffled_definitions(&pairs, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        let mut expected: Vec<_> = pairs.iter().map(|p| p.definition.clone()).collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
