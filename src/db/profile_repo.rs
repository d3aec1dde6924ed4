// src/db/profile_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::profile::{PlanType, Profile, UpdateProfilePayload},
};

const PROFILE_COLUMNS: &str =
    "id, first_name, last_name, avatar_url, email, plan_type, query_count, query_limit, is_active, updated_at";

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn create_trial<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (id, email, first_name, last_name, plan_type, query_count, query_limit, is_active)
            VALUES ($1, $2, $3, $4, $5, 0, $6, FALSE)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(PlanType::Trial)
        .bind(PlanType::Trial.query_limit())
        .fetch_one(executor)
        .await?;
        Ok(profile)
    }

    pub async fn increment_query_count(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE profiles SET query_count = query_count + 1, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update(&self, id: Uuid, input: &UpdateProfilePayload) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.first_name.as_deref())
        .bind(input.last_name.as_deref())
        .bind(input.avatar_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Troca o plano de quem comprou/cancelou. Ativação zera a contagem de consultas.
    /// Devolve quantos perfis foram alterados.
    pub async fn set_plan_by_email(&self, email: &str, plan: PlanType, is_active: bool) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                plan_type = $2,
                query_limit = $3,
                is_active = $4,
                query_count = CASE WHEN $4 THEN 0 ELSE query_count END,
                updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(plan)
        .bind(plan.query_limit())
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
