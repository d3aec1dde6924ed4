// src/handlers/sessions.rs

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, numeric::coerce_decimal},
    config::AppState,
    editor::{
        edits::{EditMode, QuoteEdit},
        session::QuoteSummary,
    },
    middleware::auth::AuthenticatedUser,
    services::export_service::{file_name, render_csv},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyEditPayload {
    pub edit: QuoteEdit,
    #[serde(default)]
    pub mode: EditMode,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarginPayload {
    // Texto livre do campo de margem; "30,5" é aceito
    #[schema(example = "30")]
    pub margin_percent: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddSectionPayload {
    #[validate(length(min = 1, message = "O nome da seção é obrigatório."))]
    #[schema(example = "Sobremesas")]
    pub name: String,
}

// GET /api/sessions/{sid}
#[utoipa::path(
    get,
    path = "/api/sessions/{sid}",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses(
        (status = 200, description = "Estado atual da sessão", body = QuoteSummary),
        (status = 404, description = "Sessão não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_session(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuoteSummary>, AppError> {
    Ok(Json(app_state.quote_service.summary(user.id, session_id).await?))
}

// POST /api/sessions/{sid}/edits
#[utoipa::path(
    post,
    path = "/api/sessions/{sid}/edits",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    request_body = ApplyEditPayload,
    responses(
        (status = 200, description = "Edição aplicada e totais recalculados", body = QuoteSummary),
        (status = 409, description = "Salvamento em andamento"),
        (status = 422, description = "Linha inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_edit(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<ApplyEditPayload>,
) -> Result<Json<QuoteSummary>, AppError> {
    let summary = app_state
        .quote_service
        .apply_edit(user.id, session_id, &payload.edit, payload.mode)
        .await?;
    Ok(Json(summary))
}

// POST /api/sessions/{sid}/commit
#[utoipa::path(
    post,
    path = "/api/sessions/{sid}/commit",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses((status = 200, description = "Edição em digitação registrada no histórico", body = QuoteSummary)),
    security(("api_jwt" = []))
)]
pub async fn commit(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuoteSummary>, AppError> {
    Ok(Json(app_state.quote_service.commit(user.id, session_id).await?))
}

// POST /api/sessions/{sid}/undo
#[utoipa::path(
    post,
    path = "/api/sessions/{sid}/undo",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses(
        (status = 200, description = "Estado anterior restaurado", body = QuoteSummary),
        (status = 409, description = "Salvamento em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn undo(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuoteSummary>, AppError> {
    Ok(Json(app_state.quote_service.undo(user.id, session_id).await?))
}

// POST /api/sessions/{sid}/redo
#[utoipa::path(
    post,
    path = "/api/sessions/{sid}/redo",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses(
        (status = 200, description = "Estado desfeito reaplicado", body = QuoteSummary),
        (status = 409, description = "Salvamento em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn redo(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuoteSummary>, AppError> {
    Ok(Json(app_state.quote_service.redo(user.id, session_id).await?))
}

// PUT /api/sessions/{sid}/margin
#[utoipa::path(
    put,
    path = "/api/sessions/{sid}/margin",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    request_body = MarginPayload,
    responses((status = 200, description = "Simulação de preço atualizada", body = QuoteSummary)),
    security(("api_jwt" = []))
)]
pub async fn set_margin(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<MarginPayload>,
) -> Result<Json<QuoteSummary>, AppError> {
    let margin = coerce_decimal(&payload.margin_percent);
    Ok(Json(app_state.quote_service.set_margin(user.id, session_id, margin).await?))
}

// POST /api/sessions/{sid}/sections
#[utoipa::path(
    post,
    path = "/api/sessions/{sid}/sections",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    request_body = AddSectionPayload,
    responses(
        (status = 200, description = "Seção gerada pela IA e anexada", body = QuoteSummary),
        (status = 409, description = "Outra operação em andamento"),
        (status = 502, description = "Falha na IA")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_section(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AddSectionPayload>,
) -> Result<Json<QuoteSummary>, AppError> {
    payload.validate()?;
    let summary = app_state
        .quote_service
        .add_section(user.id, session_id, payload.name.trim())
        .await?;
    Ok(Json(summary))
}

// POST /api/sessions/{sid}/save
#[utoipa::path(
    post,
    path = "/api/sessions/{sid}/save",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses(
        (status = 200, description = "Orçamento salvo", body = QuoteSummary),
        (status = 409, description = "Outra operação em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn save(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuoteSummary>, AppError> {
    Ok(Json(app_state.quote_service.save(user.id, session_id).await?))
}

// GET /api/sessions/{sid}/export/pdf
#[utoipa::path(
    get,
    path = "/api/sessions/{sid}/export/pdf",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses(
        (status = 200, description = "Orçamento em PDF", content_type = "application/pdf"),
        (status = 500, description = "Fonte do PDF ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_pdf(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state.quote_service.snapshot(user.id, session_id).await?;
    let export_service = app_state.export_service.clone();

    let name = file_name(
        &snapshot.quote.event_label,
        snapshot.quote.guest_count,
        Utc::now().date_naive(),
        "pdf",
    );

    // genpdf é síncrono; renderiza fora do runtime
    let bytes = tokio::task::spawn_blocking(move || export_service.render_pdf(&snapshot))
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\"")),
        ],
        bytes,
    ))
}

// GET /api/sessions/{sid}/export/csv
#[utoipa::path(
    get,
    path = "/api/sessions/{sid}/export/csv",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses((status = 200, description = "Orçamento em CSV", content_type = "text/csv")),
    security(("api_jwt" = []))
)]
pub async fn export_csv(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state.quote_service.snapshot(user.id, session_id).await?;

    let name = file_name(
        &snapshot.quote.event_label,
        snapshot.quote.guest_count,
        Utc::now().date_naive(),
        "csv",
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\"")),
        ],
        render_csv(&snapshot),
    ))
}

// DELETE /api/sessions/{sid}
#[utoipa::path(
    delete,
    path = "/api/sessions/{sid}",
    tag = "Sessions",
    params(("sid" = Uuid, Path, description = "ID da sessão de edição")),
    responses(
        (status = 204, description = "Sessão encerrada"),
        (status = 404, description = "Sessão não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_session(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.quote_service.close(user.id, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
