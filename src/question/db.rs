use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{common::error::ServerError, question::models::Question};

pub async fn get_random_question(pool: &Pool<Postgres>) -> Result<Option<Question>, ServerError> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT *
        FROM "questions"
        ORDER BY RANDOM()
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(question)
}

pub async fn get_question_by_id(
    pool: &Pool<Postgres>,
    question_id: Uuid,
) -> Result<Option<Question>, ServerError> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT *
        FROM "questions"
        WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(pool)
    .await?;

    Ok(question)
}
