use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::ConceptRow;

pub async fn find_concepts<'e, E>(
    executor: E,
    learner_id: Uuid,
) -> Result<Vec<ConceptRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT term, category, strength, last_reviewed_at
            FROM concept_reviews
            WHERE learner_id = $1
            ORDER BY strength, last_reviewed_at NULLS FIRST, term
        "#,
    )
    .bind(learner_id)
    .fetch_all(executor)
    .await
}

pub async fn upsert_concept<'e, E>(
    executor: E,
    learner_id: Uuid,
    term: &str,
    category: &str,
    strength: i16,
    last_reviewed_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO concept_reviews (learner_id, term, category, strength, last_reviewed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (learner_id, term)
            DO UPDATE SET
                category = $3,
                strength = $4,
                last_reviewed_at = $5,
                updated_at = NOW()
        "#,
    )
    .bind(learner_id)
    .bind(term)
    .bind(category)
    .bind(strength)
    .bind(last_reviewed_at)
    .execute(executor)
    .await?;
    Ok(())
}
