use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{AchievementRow, ActivityRow, LearnerRow};

pub async fn find_learner<'e, E>(
    executor: E,
    learner_id: Uuid,
) -> Result<Option<LearnerRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, experience_points, current_streak_days, last_active_date
            FROM learners
            WHERE id = $1
        "#,
    )
    .bind(learner_id)
    .fetch_optional(executor)
    .await
}

/// Create the learner row if missing so child rows can reference it.
pub async fn ensure_learner<'e, E>(executor: E, learner_id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learners (id)
            VALUES ($1)
            ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(learner_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn upsert_learner<'e, E>(
    executor: E,
    learner_id: Uuid,
    experience_points: i64,
    current_streak_days: i32,
    last_active_date: Option<NaiveDate>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learners (id, experience_points, current_streak_days, last_active_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET
                experience_points = $2,
                current_streak_days = $3,
                last_active_date = $4,
                updated_at = NOW()
        "#,
    )
    .bind(learner_id)
    .bind(experience_points)
    .bind(current_streak_days)
    .bind(last_active_date)
    .execute(executor)
    .await?;
    Ok(())
}

/// Add XP and set the streak for `study_date`. The last active date only
/// moves forward.
pub async fn credit_learner<'e, E>(
    executor: E,
    learner_id: Uuid,
    xp_delta: i64,
    current_streak_days: i32,
    study_date: NaiveDate,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE learners
            SET experience_points = experience_points + $2,
                current_streak_days = $3,
                last_active_date = GREATEST(COALESCE(last_active_date, $4), $4),
                updated_at = NOW()
            WHERE id = $1
        "#,
    )
    .bind(learner_id)
    .bind(xp_delta)
    .bind(current_streak_days)
    .bind(study_date)
    .execute(executor)
    .await?;
    Ok(())
}

/// Set the streak for a day with no lesson credit. XP is left alone and the
/// last active date only moves forward.
pub async fn mark_active<'e, E>(
    executor: E,
    learner_id: Uuid,
    current_streak_days: i32,
    activity_date: NaiveDate,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE learners
            SET current_streak_days = $2,
                last_active_date = GREATEST(COALESCE(last_active_date, $3), $3),
                updated_at = NOW()
            WHERE id = $1
        "#,
    )
    .bind(learner_id)
    .bind(current_streak_days)
    .bind(activity_date)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_completed_lessons<'e, E>(
    executor: E,
    learner_id: Uuid,
) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT lesson_id
            FROM learner_completed_lessons
            WHERE learner_id = $1
            ORDER BY lesson_id
        "#,
    )
    .bind(learner_id)
    .fetch_all(executor)
    .await
}

pub async fn insert_completed_lesson<'e, E>(
    executor: E,
    learner_id: Uuid,
    lesson_id: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learner_completed_lessons (learner_id, lesson_id)
            VALUES ($1, $2)
            ON CONFLICT (learner_id, lesson_id) DO NOTHING
        "#,
    )
    .bind(learner_id)
    .bind(lesson_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_activity<'e, E>(
    executor: E,
    learner_id: Uuid,
) -> Result<Vec<ActivityRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT activity_date, xp, lessons
            FROM learner_activity
            WHERE learner_id = $1
            ORDER BY activity_date
        "#,
    )
    .bind(learner_id)
    .fetch_all(executor)
    .await
}

/// Overwrite the counters of one study day.
pub async fn upsert_activity<'e, E>(
    executor: E,
    learner_id: Uuid,
    activity_date: NaiveDate,
    xp: i64,
    lessons: i32,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learner_activity (learner_id, activity_date, xp, lessons)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (learner_id, activity_date)
            DO UPDATE SET xp = $3, lessons = $4
        "#,
    )
    .bind(learner_id)
    .bind(activity_date)
    .bind(xp)
    .bind(lessons)
    .execute(executor)
    .await?;
    Ok(())
}

/// Mark a study day without touching its counters.
pub async fn insert_study_day<'e, E>(
    executor: E,
    learner_id: Uuid,
    activity_date: NaiveDate,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learner_activity (learner_id, activity_date)
            VALUES ($1, $2)
            ON CONFLICT (learner_id, activity_date) DO NOTHING
        "#,
    )
    .bind(learner_id)
    .bind(activity_date)
    .execute(executor)
    .await?;
    Ok(())
}

/// Add one lesson and its XP to a study day.
pub async fn increment_activity<'e, E>(
    executor: E,
    learner_id: Uuid,
    activity_date: NaiveDate,
    xp_delta: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learner_activity (learner_id, activity_date, xp, lessons)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (learner_id, activity_date)
            DO UPDATE SET xp = learner_activity.xp + $3,
                          lessons = learner_activity.lessons + 1
        "#,
    )
    .bind(learner_id)
    .bind(activity_date)
    .bind(xp_delta)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_achievements<'e, E>(
    executor: E,
    learner_id: Uuid,
) -> Result<Vec<AchievementRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT achievement, earned_on
            FROM learner_achievements
            WHERE learner_id = $1
        "#,
    )
    .bind(learner_id)
    .fetch_all(executor)
    .await
}

/// Achievements are never revoked, so an existing row wins.
pub async fn insert_achievement<'e, E>(
    executor: E,
    learner_id: Uuid,
    achievement: &str,
    earned_on: NaiveDate,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learner_achievements (learner_id, achievement, earned_on)
            VALUES ($1, $2, $3)
            ON CONFLICT (learner_id, achievement) DO NOTHING
        "#,
    )
    .bind(learner_id)
    .bind(achievement)
    .bind(earned_on)
    .execute(executor)
    .await?;
    Ok(())
}
