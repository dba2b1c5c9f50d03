use sqlx::{Executor, Postgres};
use uuid::Uuid;

/// Claim a commit id. Returns `false` when the commit was already applied.
pub async fn claim_commit<'e, E>(
    executor: E,
    commit_id: Uuid,
    learner_id: Uuid,
    lesson_id: &str,
    xp_delta: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO lesson_commits (commit_id, learner_id, lesson_id, xp_delta)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (commit_id) DO NOTHING
        "#,
    )
    .bind(commit_id)
    .bind(learner_id)
    .bind(lesson_id)
    .bind(xp_delta)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
