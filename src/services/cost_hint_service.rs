// src/services/cost_hint_service.rs

use uuid::Uuid;

use crate::{common::error::AppError, db::CostHintRepository, models::quote::CostHint};

#[derive(Clone)]
pub struct CostHintService {
    repo: CostHintRepository,
}

impl CostHintService {
    pub fn new(repo: CostHintRepository) -> Self {
        Self { repo }
    }

    /// Usuário sem dicas próprias recebe as padrão.
    pub async fn list_or_default(&self, user_id: Uuid) -> Result<Vec<CostHint>, AppError> {
        let hints = self.repo.list(user_id).await?;
        if hints.is_empty() {
            return Ok(CostHint::defaults());
        }
        Ok(hints)
    }

    pub async fn replace(&self, user_id: Uuid, hints: &[CostHint]) -> Result<Vec<CostHint>, AppError> {
        let hints: Vec<CostHint> = hints
            .iter()
            .filter(|hint| !hint.name.trim().is_empty())
            .cloned()
            .collect();
        self.repo.replace_all(user_id, &hints).await?;
        tracing::info!("💡 {} dicas de custo salvas para {}", hints.len(), user_id);
        Ok(hints)
    }
}
