// src/handlers/profile.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::profile::{PlanStatus, UpdateProfilePayload},
};

// GET /api/profile
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Perfil e situação do plano", body = PlanStatus),
        (status = 404, description = "Perfil não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<PlanStatus>, AppError> {
    Ok(Json(app_state.plan_service.get_status(user.id).await?))
}

// PUT /api/profile
#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "Profile",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = PlanStatus),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<PlanStatus>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.plan_service.update_profile(user.id, &payload).await?))
}
