// src/editor.rs

//! Edição de orçamentos: histórico com desfazer/refazer, operações de edição
//! e as sessões abertas por usuário.

pub mod edits;
pub mod history;
pub mod registry;
pub mod session;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Operação assíncrona em andamento numa sessão. No máximo uma por vez.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum PendingOperation {
    AddSection,
    Save,
}

impl PendingOperation {
    pub fn label(&self) -> &'static str {
        match self {
            PendingOperation::AddSection => "geração de seção",
            PendingOperation::Save => "salvamento",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Seção {0} não encontrada.")]
    SectionNotFound(usize),

    #[error("Item {item} da seção {section} não encontrado.")]
    IngredientNotFound { section: usize, item: usize },

    #[error("Profissional {0} não encontrado.")]
    LaborNotFound(usize),

    #[error("Custo {0} não encontrado.")]
    OtherCostNotFound(usize),

    #[error("Premissa {0} não encontrada.")]
    PremiseNotFound(usize),

    #[error("Aguarde: {} em andamento.", .0.label())]
    OperationInFlight(PendingOperation),

    #[error("Sessão de edição não encontrada.")]
    SessionNotFound,
}
