// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProfileRepository, UserRepository},
    models::auth::{Claims, RegisterUserPayload, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    profile_repo: ProfileRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, profile_repo: ProfileRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self {
            user_repo,
            profile_repo,
            jwt_secret,
            pool,
        }
    }

    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<String, AppError> {
        // 1. Hashing fora da transação, numa thread de bloqueio
        let password_clone = payload.password.clone();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // 2. Cria o usuário
        let new_user = self
            .user_repo
            .create_user(&mut *tx, &payload.email, &hashed_password)
            .await?; // Se falhar aqui, o tx sofre rollback automático (drop)

        // 3. Todo usuário novo começa no plano de teste
        self.profile_repo
            .create_trial(
                &mut *tx,
                new_user.id,
                &new_user.email,
                payload.first_name.as_deref(),
                payload.last_name.as_deref(),
            )
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!("👤 Novo usuário registrado: {}", new_user.email);
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let user_id = decode_token(&self.jwt_secret, token)?;

        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        issue_token(&self.jwt_secret, user_id)
    }
}

/// JWT HS256 válido por 7 dias.
pub fn issue_token(secret: &str, user_id: Uuid) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(7);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map_err(|_| AppError::InvalidToken)?;
    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let user_id = Uuid::new_v4();

        let token = issue_token("segredo", user_id).unwrap();

        assert_eq!(decode_token("segredo", &token).unwrap(), user_id);
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let token = issue_token("segredo", Uuid::new_v4()).unwrap();

        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));
    }
}
