// src/db/cost_hint_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::quote::CostHint};

#[derive(Clone)]
pub struct CostHintRepository {
    pool: PgPool,
}

impl CostHintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<CostHint>, AppError> {
        let hints = sqlx::query_as::<_, CostHint>(
            "SELECT name, cost FROM cost_hints WHERE user_id = $1 ORDER BY position",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(hints)
    }

    /// Substitui a lista inteira, mantendo a ordem recebida.
    pub async fn replace_all(&self, user_id: Uuid, hints: &[CostHint]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cost_hints WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (position, hint) in hints.iter().enumerate() {
            sqlx::query("INSERT INTO cost_hints (user_id, position, name, cost) VALUES ($1, $2, $3, $4)")
                .bind(user_id)
                .bind(position as i32)
                .bind(&hint.name)
                .bind(hint.cost)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
