//! Progress counters on the `metrics` facade. Installing an exporter is up
//! to the embedding application; without one these are no-ops.

use econ_progress::{Stage, StreakEvent};
use metrics::counter;

/// Record a lesson commit that reached the store.
pub fn record_lesson_completed(replayed: bool) {
    let status = if replayed { "replayed" } else { "applied" };

    counter!("lessons_completed_total", "status" => status).increment(1);
}

pub fn record_lesson_abandoned(stage: Stage) {
    counter!("lessons_abandoned_total", "stage" => stage.as_str()).increment(1);
}

pub fn record_commit_failure(retryable: bool) {
    let kind = if retryable { "retryable" } else { "fatal" };

    counter!("lesson_commit_failures_total", "kind" => kind).increment(1);
}

pub fn record_streak_event(event: StreakEvent) {
    counter!("streak_events_total", "event" => event.as_str()).increment(1);
}

/// Record one answer applied to a concept record.
pub fn record_concept_review(correct: bool) {
    let outcome = if correct { "correct" } else { "incorrect" };

    counter!("concept_reviews_total", "outcome" => outcome).increment(1);
}
