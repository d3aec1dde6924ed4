// src/handlers/webhooks.rs

use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{common::error::AppError, config::AppState, services::plan_service::KiwifyWebhook};

const SIGNATURE_HEADER: &str = "x-kiwify-signature";

// POST /api/webhooks/kiwify (público, autenticado pela assinatura)
#[utoipa::path(
    post,
    path = "/api/webhooks/kiwify",
    tag = "Webhooks",
    request_body = KiwifyWebhook,
    params(("x-kiwify-signature" = String, Header, description = "Segredo compartilhado com a Kiwify")),
    responses(
        (status = 200, description = "Evento recebido"),
        (status = 400, description = "Payload sem e-mail ou produto"),
        (status = 401, description = "Assinatura inválida")
    )
)]
pub async fn kiwify_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<KiwifyWebhook>,
) -> Result<Json<Value>, AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    app_state.plan_service.handle_webhook(signature, &payload).await?;

    Ok(Json(json!({ "received": true })))
}
