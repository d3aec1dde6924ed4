// src/handlers/cost_hints.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser, models::quote::CostHint,
};

// GET /api/cost-hints
#[utoipa::path(
    get,
    path = "/api/cost-hints",
    tag = "Cost Hints",
    responses((status = 200, description = "Dicas de custo do usuário (ou as padrão)", body = Vec<CostHint>)),
    security(("api_jwt" = []))
)]
pub async fn list_cost_hints(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<CostHint>>, AppError> {
    Ok(Json(app_state.cost_hint_service.list_or_default(user.id).await?))
}

// PUT /api/cost-hints
#[utoipa::path(
    put,
    path = "/api/cost-hints",
    tag = "Cost Hints",
    request_body = Vec<CostHint>,
    responses((status = 200, description = "Dicas substituídas", body = Vec<CostHint>)),
    security(("api_jwt" = []))
)]
pub async fn replace_cost_hints(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(hints): Json<Vec<CostHint>>,
) -> Result<Json<Vec<CostHint>>, AppError> {
    Ok(Json(app_state.cost_hint_service.replace(user.id, &hints).await?))
}
