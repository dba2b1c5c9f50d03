//! Daily streak tracking.
//!
//! Dates are plain calendar dates with no time zone attached; the caller
//! decides which local day "today" is.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ProgressError;

/// Thresholds that shape streak events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    /// Longest absence (in days) still greeted as a comeback.
    pub comeback_window_days: i64,
    /// A continued streak that lands on a multiple of this is a milestone.
    pub milestone_every: u32,
}

impl StreakPolicy {
    /// Build a policy, rejecting zero-width windows.
    pub fn new(comeback_window_days: i64, milestone_every: u32) -> Result<Self, ProgressError> {
        if comeback_window_days < 2 {
            return Err(ProgressError::invalid(format!(
                "comeback window must span at least 2 days, got {comeback_window_days}"
            )));
        }
        if milestone_every == 0 {
            return Err(ProgressError::invalid("milestone interval must be positive"));
        }
        Ok(Self {
            comeback_window_days,
            milestone_every,
        })
    }
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            comeback_window_days: 7,
            milestone_every: 7,
        }
    }
}

/// What happened to the streak at a day boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakEvent {
    /// Already active today.
    SameDay,
    /// Active yesterday, streak extended.
    Continued,
    /// Missed a few days, streak restarts.
    Comeback,
    /// Away longer than the comeback window, streak restarts.
    MissedLong,
    /// First recorded activity.
    FirstTime,
}

impl StreakEvent {
    /// Stable label for logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SameDay => "same_day",
            Self::Continued => "continued",
            Self::Comeback => "comeback",
            Self::MissedLong => "missed_long",
            Self::FirstTime => "first_time",
        }
    }
}

/// Outcome of [`update_streak`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    /// Streak length including `today`.
    pub streak_days: u32,
    /// How `today` relates to the previous activity.
    pub event: StreakEvent,
    /// Set alongside [`StreakEvent::Continued`] when the new streak is a
    /// positive multiple of the milestone interval.
    pub milestone: bool,
    /// Whole days since the previous activity (0 on first activity).
    pub days_away: i64,
}

/// Compute the streak after activity on `today`, with the default policy.
pub fn update_streak(
    last_active: Option<NaiveDate>,
    current_streak_days: u32,
    today: NaiveDate,
) -> Result<StreakUpdate, ProgressError> {
    update_streak_with(&StreakPolicy::default(), last_active, current_streak_days, today)
}

/// Compute the streak after activity on `today`.
///
/// # Algorithm
///
/// * Same day: streak unchanged
/// * One day later: streak + 1, milestone on multiples of `milestone_every`
/// * Up to `comeback_window_days` later: streak restarts at 1 (comeback)
/// * Longer: streak restarts at 1 (missed long)
/// * No previous activity: streak starts at 1
///
/// `today` earlier than `last_active` is rejected.
pub fn update_streak_with(
    policy: &StreakPolicy,
    last_active: Option<NaiveDate>,
    current_streak_days: u32,
    today: NaiveDate,
) -> Result<StreakUpdate, ProgressError> {
    let Some(last_active) = last_active else {
        return Ok(StreakUpdate {
            streak_days: 1,
            event: StreakEvent::FirstTime,
            milestone: false,
            days_away: 0,
        });
    };

    let days_away = days_between(last_active, today)?;

    let (streak_days, event) = match days_away {
        0 => (current_streak_days, StreakEvent::SameDay),
        1 => (current_streak_days.saturating_add(1), StreakEvent::Continued),
        d if d <= policy.comeback_window_days => (1, StreakEvent::Comeback),
        _ => (1, StreakEvent::MissedLong),
    };

    let milestone = event == StreakEvent::Continued
        && streak_days > 0
        && streak_days % policy.milestone_every == 0;

    Ok(StreakUpdate {
        streak_days,
        event,
        milestone,
        days_away,
    })
}

/// The streak as it should be displayed on `today`, without recording any
/// activity. A streak whose last activity is older than yesterday is broken.
pub fn effective_streak(last_active: Option<NaiveDate>, streak_days: u32, today: NaiveDate) -> u32 {
    match last_active.map(|last| (today - last).num_days()) {
        Some(0 | 1) => streak_days,
        _ => 0,
    }
}

/// Parse a persisted study date (`YYYY-MM-DD`).
pub fn parse_study_date(value: &str) -> Result<NaiveDate, ProgressError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| ProgressError::invalid(format!("malformed date '{value}': {e}")))
}

fn days_between(earlier: NaiveDate, later: NaiveDate) -> Result<i64, ProgressError> {
    let days = (later - earlier).num_days();
    if days < 0 {
        return Err(ProgressError::invalid(format!(
            "today ({later}) is before the last active date ({earlier})"
        )));
    }
    Ok(days)
}
