// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{
    editor::EditError,
    models::profile::PlanError,
    services::ai::AiError,
};

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Orçamento não encontrado")]
    QuoteNotFound,

    #[error("Perfil não encontrado")]
    ProfileNotFound,

    #[error("Assinatura do webhook inválida")]
    InvalidWebhookSignature,

    #[error("Payload do webhook inválido")]
    InvalidWebhookPayload,

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // Erros de edição (índices inexistentes, operação em andamento, sessão encerrada)
    #[error(transparent)]
    Edit(#[from] EditError),

    // Falhas do colaborador de IA: a mensagem chega ao usuário sem alterações
    #[error(transparent)]
    Ai(#[from] AiError),

    // Portão do plano fechado (limite de consultas, período de teste)
    #[error(transparent)]
    Plan(#[from] PlanError),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            AppError::InvalidWebhookPayload => StatusCode::BAD_REQUEST,
            AppError::UserNotFound | AppError::QuoteNotFound | AppError::ProfileNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Edit(e) => match e {
                EditError::OperationInFlight(_) => StatusCode::CONFLICT,
                EditError::SessionNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            AppError::Ai(e) => match e {
                AiError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Plan(_) => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_message = match self {
            // Sugestão B: Retornar todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::EmailAlreadyExists => "Este e-mail já está em uso.".to_string(),
            AppError::InvalidCredentials => "E-mail ou senha inválidos.".to_string(),
            AppError::InvalidToken => "Token de autenticação inválido ou ausente.".to_string(),
            AppError::UserNotFound => "Usuário não encontrado.".to_string(),
            AppError::QuoteNotFound => "Orçamento não encontrado.".to_string(),
            AppError::ProfileNotFound => "Perfil de usuário não encontrado.".to_string(),
            AppError::InvalidWebhookSignature => "Unauthorized: invalid secret".to_string(),
            AppError::InvalidWebhookPayload => "Invalid webhook payload".to_string(),

            // Erros de domínio: a mensagem já é a que o usuário deve ver.
            e @ (AppError::Edit(_) | AppError::Ai(_) | AppError::Plan(_)) => {
                tracing::warn!("⚠️ Operação recusada: {}", e);
                e.to_string()
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` vai logar a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                "Ocorreu um erro inesperado.".to_string()
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
