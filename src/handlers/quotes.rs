// src/handlers/quotes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    editor::session::QuoteSummary,
    middleware::auth::AuthenticatedUser,
    models::quote::{Quote, QuotePatch},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuotePayload {
    #[validate(length(min = 3, message = "Descreva o evento para gerar o orçamento."))]
    #[schema(example = "Casamento para 100 pessoas com churrasco, saladas e sobremesas")]
    pub description: String,
}

// POST /api/quotes/generate
#[utoipa::path(
    post,
    path = "/api/quotes/generate",
    tag = "Quotes",
    request_body = GenerateQuotePayload,
    responses(
        (status = 201, description = "Rascunho gerado e sessão de edição aberta", body = QuoteSummary),
        (status = 402, description = "Limite do plano atingido"),
        (status = 502, description = "Falha na IA")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_quote(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<GenerateQuotePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hints = app_state.cost_hint_service.list_or_default(user.id).await?;
    let summary = app_state
        .quote_service
        .generate(user.id, &payload.description, &hints)
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

// POST /api/quotes/{id}/edit
#[utoipa::path(
    post,
    path = "/api/quotes/{id}/edit",
    tag = "Quotes",
    params(("id" = Uuid, Path, description = "ID do orçamento salvo")),
    responses(
        (status = 201, description = "Sessão de edição aberta", body = QuoteSummary),
        (status = 404, description = "Orçamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn edit_quote(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(quote_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.quote_service.edit_persisted(user.id, quote_id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

// GET /api/quotes
#[utoipa::path(
    get,
    path = "/api/quotes",
    tag = "Quotes",
    responses((status = 200, description = "Orçamentos do usuário, mais recentes primeiro", body = Vec<Quote>)),
    security(("api_jwt" = []))
)]
pub async fn list_quotes(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Quote>>, AppError> {
    Ok(Json(app_state.quote_service.list(user.id).await?))
}

// PATCH /api/quotes/{id}
#[utoipa::path(
    patch,
    path = "/api/quotes/{id}",
    tag = "Quotes",
    params(("id" = Uuid, Path, description = "ID do orçamento salvo")),
    request_body = QuotePatch,
    responses(
        (status = 200, description = "Orçamento atualizado", body = Quote),
        (status = 404, description = "Orçamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn patch_quote(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(quote_id): Path<Uuid>,
    Json(payload): Json<QuotePatch>,
) -> Result<Json<Quote>, AppError> {
    Ok(Json(app_state.quote_service.patch(user.id, quote_id, &payload).await?))
}
