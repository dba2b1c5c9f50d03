//! Spaced repetition over learned concepts.
//!
//! Each concept carries a 0-100 strength. Correct answers raise it, wrong
//! answers lower it, and the strength band decides how long a concept can
//! rest before it is due again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProgressError;

/// Highest strength a concept can reach.
pub const MAX_STRENGTH: u8 = 100;

/// Strength below which a concept counts as weak on the review dashboard.
pub const WEAK_THRESHOLD: u8 = 70;

/// Retention record for a single concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRecord {
    /// Unique concept name (e.g. "기준금리").
    pub term: String,
    /// Display-only classification.
    pub category: String,
    /// Retention confidence, 0-100.
    pub strength: u8,
    /// `None` means never reviewed.
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ConceptRecord {
    /// A concept seen for the first time.
    pub fn new(term: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            category: category.into(),
            strength: 0,
            last_reviewed_at: None,
        }
    }
}

/// Strength adjustments and due-interval bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPolicy {
    /// Added on a correct answer.
    pub correct_gain: u8,
    /// Removed on a wrong answer.
    pub incorrect_penalty: u8,
    /// Strength at which the interval grows from short to medium.
    pub medium_band_from: u8,
    /// Strength at which the interval grows from medium to long.
    pub long_band_from: u8,
    /// Days until a concept below `medium_band_from` is due again.
    pub short_interval_days: i64,
    /// Days until a concept in the medium band is due again.
    pub medium_interval_days: i64,
    /// Days until a concept at or above `long_band_from` is due again.
    pub long_interval_days: i64,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            correct_gain: 15,
            incorrect_penalty: 20,
            medium_band_from: 50,
            long_band_from: 80,
            short_interval_days: 1,
            medium_interval_days: 3,
            long_interval_days: 7,
        }
    }
}

impl ReviewPolicy {
    /// Policy with custom step sizes and the default bands.
    pub fn with_steps(correct_gain: u8, incorrect_penalty: u8) -> Result<Self, ProgressError> {
        if correct_gain == 0 || correct_gain > MAX_STRENGTH {
            return Err(ProgressError::invalid(format!(
                "correct gain must be within 1..=100, got {correct_gain}"
            )));
        }
        if incorrect_penalty > MAX_STRENGTH {
            return Err(ProgressError::invalid(format!(
                "incorrect penalty must be within 0..=100, got {incorrect_penalty}"
            )));
        }
        Ok(Self {
            correct_gain,
            incorrect_penalty,
            ..Self::default()
        })
    }

    /// Apply one answer to a record.
    ///
    /// Strength saturates at 0 and 100; it is never an error to overshoot.
    pub fn record_outcome(
        &self,
        record: &ConceptRecord,
        correct: bool,
        now: DateTime<Utc>,
    ) -> ConceptRecord {
        let strength = if correct {
            record
                .strength
                .saturating_add(self.correct_gain)
                .min(MAX_STRENGTH)
        } else {
            record.strength.saturating_sub(self.incorrect_penalty)
        };

        ConceptRecord {
            strength,
            last_reviewed_at: Some(now),
            ..record.clone()
        }
    }

    /// How long a concept of `strength` may rest before it is due.
    ///
    /// * strength < 50: 1 day
    /// * 50 <= strength < 80: 3 days
    /// * strength >= 80: 7 days
    pub fn due_interval(&self, strength: u8) -> Duration {
        let days = if strength < self.medium_band_from {
            self.short_interval_days
        } else if strength < self.long_band_from {
            self.medium_interval_days
        } else {
            self.long_interval_days
        };
        Duration::days(days)
    }

    /// Whether `record` should be reviewed at `now`.
    pub fn is_due(&self, record: &ConceptRecord, now: DateTime<Utc>) -> bool {
        match record.last_reviewed_at {
            None => true,
            Some(last) => now - last >= self.due_interval(record.strength),
        }
    }

    /// All due records, weakest first, then least recently reviewed.
    ///
    /// Recomputed from scratch on every call.
    pub fn select_due<'a>(
        &self,
        records: impl IntoIterator<Item = &'a ConceptRecord>,
        now: DateTime<Utc>,
    ) -> Vec<&'a ConceptRecord> {
        let mut due: Vec<_> = records
            .into_iter()
            .filter(|record| self.is_due(record, now))
            .collect();

        // `None` (never reviewed) orders before any timestamp
        due.sort_by(|a, b| {
            a.strength
                .cmp(&b.strength)
                .then_with(|| a.last_reviewed_at.cmp(&b.last_reviewed_at))
                .then_with(|| a.term.cmp(&b.term))
        });
        due
    }

    /// Counts for the review dashboard.
    pub fn summarize<'a>(
        &self,
        records: impl IntoIterator<Item = &'a ConceptRecord>,
        now: DateTime<Utc>,
    ) -> ReviewSummary {
        records
            .into_iter()
            .fold(ReviewSummary::default(), |mut summary, record| {
                summary.total += 1;
                if self.is_due(record, now) {
                    summary.due += 1;
                }
                if record.strength < WEAK_THRESHOLD {
                    summary.weak += 1;
                }
                if record.strength >= self.long_band_from {
                    summary.mastered += 1;
                }
                summary
            })
    }
}

/// Dashboard counts over a learner's concept records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// Concepts whose review interval has elapsed.
    pub due: usize,
    /// Concepts below the weak strength threshold.
    pub weak: usize,
    /// Concepts in the long interval band.
    pub mastered: usize,
    /// Every record counted.
    pub total: usize,
}

/// [`ReviewPolicy::record_outcome`] with the default policy.
pub fn record_outcome(record: &ConceptRecord, correct: bool, now: DateTime<Utc>) -> ConceptRecord {
    ReviewPolicy::default().record_outcome(record, correct, now)
}

/// [`ReviewPolicy::is_due`] with the default policy.
pub fn is_due(record: &ConceptRecord, now: DateTime<Utc>) -> bool {
    ReviewPolicy::default().is_due(record, now)
}

/// [`ReviewPolicy::select_due`] with the default policy.
pub fn select_due_concepts(records: &[ConceptRecord], now: DateTime<Utc>) -> Vec<&ConceptRecord> {
    ReviewPolicy::default().select_due(records, now)
}

/// [`ReviewPolicy::summarize`] with the default policy.
pub fn review_summary(records: &[ConceptRecord], now: DateTime<Utc>) -> ReviewSummary {
    ReviewPolicy::default().summarize(records, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn record(term: &str, strength: u8, last: Option<DateTime<Utc>>) -> ConceptRecord {
        ConceptRecord {
            term: term.to_string(),
            category: "경제학".to_string(),
            strength,
            last_reviewed_at: last,
        }
    }

    #[test]
    fn test_record_outcome_steps() {
        let now = at(1, 9);
        let updated = record_outcome(&record("금리", 40, None), true, now);
        assert_eq!(updated.strength, 55);
        assert_eq!(updated.last_reviewed_at, Some(now));

        let updated = record_outcome(&record("금리", 40, None), false, now);
        assert_eq!(updated.strength, 20);
    }

    #[test]
    fn test_strength_saturates() {
        let now = at(1, 9);
        let high = record("GDP", 95, None);
        let once = record_outcome(&high, true, now);
        let twice = record_outcome(&once, true, now);
        assert_eq!(once.strength, 100);
        assert_eq!(twice.strength, 100);

        let low = record("GDP", 10, None);
        let once = record_outcome(&low, false, now);
        let twice = record_outcome(&once, false, now);
        assert_eq!(once.strength, 0);
        assert_eq!(twice.strength, 0);
    }

    #[test]
    fn test_due_uses_post_update_strength() {
        let reviewed_at = at(1, 9);
        let updated = record_outcome(&record("통화정책", 40, Some(at(1, 0))), true, reviewed_at);
        assert_eq!(updated.strength, 55);

        // 55 sits in the 3-day band, so two days later it is still resting
        assert!(!is_due(&updated, reviewed_at + Duration::days(2)));
        assert!(is_due(&updated, reviewed_at + Duration::days(3)));

        // The pre-update strength would have been due after one day
        let stale = record("통화정책", 40, Some(reviewed_at));
        assert!(is_due(&stale, reviewed_at + Duration::days(2)));
    }

    #[test]
    fn test_due_intervals_by_band() {
        let policy = ReviewPolicy::default();
        assert_eq!(policy.due_interval(0), Duration::days(1));
        assert_eq!(policy.due_interval(49), Duration::days(1));
        assert_eq!(policy.due_interval(50), Duration::days(3));
        assert_eq!(policy.due_interval(79), Duration::days(3));
        assert_eq!(policy.due_interval(80), Duration::days(7));
        assert_eq!(policy.due_interval(100), Duration::days(7));
    }

    #[test]
    fn test_never_reviewed_is_due() {
        assert!(is_due(&record("EBITDA", 100, None), at(1, 0)));
    }

    #[test]
    fn test_select_due_order() {
        let now = at(20, 12);
        let records = vec![
            record("강세장", 30, Some(at(10, 0))),
            record("재정정책", 30, Some(at(5, 0))),
            record("물가상승률", 90, Some(at(19, 0))),
            record("통화정책", 40, Some(at(15, 0))),
            record("코스피", 30, None),
            record("EBITDA", 75, Some(at(12, 0))),
        ];

        let due: Vec<_> = select_due_concepts(&records, now)
            .into_iter()
            .map(|r| r.term.as_str())
            .collect();

        assert_eq!(due, vec!["코스피", "재정정책", "강세장", "통화정책", "EBITDA"]);

        // Restartable: a second call yields the same sequence
        let again: Vec<_> = select_due_concepts(&records, now)
            .into_iter()
            .map(|r| r.term.as_str())
            .collect();
        assert_eq!(due, again);
    }

    #[test]
    fn test_summary() {
        let now = at(20, 12);
        let records = vec![
            record("통화정책", 40, Some(at(15, 0))),
            record("재정정책", 60, Some(at(17, 0))),
            record("EBITDA", 75, Some(at(18, 0))),
            record("물가상승률", 90, Some(at(19, 0))),
        ];
        let summary = review_summary(&records, now);
        assert_eq!(
            summary,
            ReviewSummary {
                due: 2,
                weak: 2,
                mastered: 1,
                total: 4,
            }
        );
    }

    #[test]
    fn test_policy_validation() {
        assert!(ReviewPolicy::with_steps(10, 10).is_ok());
        assert!(ReviewPolicy::with_steps(0, 10).is_err());
        assert!(ReviewPolicy::with_steps(10, 101).is_err());
    }
}
