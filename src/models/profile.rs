// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const TRIAL_QUERY_LIMIT: i32 = 3;
pub const START_QUERY_LIMIT: i32 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plan_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Trial, // Teste
    Start, // 19 consultas/mês
    Pro,   // Ilimitado
}

impl PlanType {
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Trial => "Teste",
            PlanType::Start => "Start",
            PlanType::Pro => "Pro",
        }
    }

    /// `None` = consultas ilimitadas.
    pub fn query_limit(&self) -> Option<i32> {
        match self {
            PlanType::Trial => Some(TRIAL_QUERY_LIMIT),
            PlanType::Start => Some(START_QUERY_LIMIT),
            PlanType::Pro => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    #[schema(example = "Maria")]
    pub first_name: Option<String>,
    #[schema(example = "Souza")]
    pub last_name: Option<String>,
    #[schema(example = "https://cdn.exemplo.com/avatar.png")]
    pub avatar_url: Option<String>,
    #[schema(example = "maria@buffet.com")]
    pub email: String,
    pub plan_type: PlanType,
    #[schema(example = 1)]
    pub query_count: i32,
    #[schema(example = 3)]
    pub query_limit: Option<i32>,
    pub is_active: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn gate(&self) -> PlanGate {
        PlanGate {
            plan_type: self.plan_type,
            query_count: self.query_count,
            query_limit: self.query_limit,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Seu período de teste terminou. Ative um plano para continuar.")]
    TrialExpired,

    #[error("Você atingiu o limite de consultas do seu plano. Faça upgrade para continuar.")]
    QueryLimitReached,
}

/// Visão somente leitura do plano, consultada antes de chamar a IA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanGate {
    pub plan_type: PlanType,
    pub query_count: i32,
    pub query_limit: Option<i32>,
    pub is_active: bool,
}

impl PlanGate {
    fn limit_reached(&self) -> bool {
        matches!(self.query_limit, Some(limit) if self.query_count >= limit)
    }

    pub fn check(&self) -> Result<(), PlanError> {
        if !self.is_active && self.plan_type == PlanType::Trial && self.limit_reached() {
            return Err(PlanError::TrialExpired);
        }

        if self.limit_reached() {
            return Err(PlanError::QueryLimitReached);
        }

        Ok(())
    }

    pub fn remaining_queries(&self) -> Option<i32> {
        self.query_limit.map(|limit| (limit - self.query_count).max(0))
    }

    /// Mensagem do banner de status do plano.
    pub fn status_message(&self) -> String {
        let name = self.plan_type.display_name();
        match self.plan_type {
            PlanType::Trial => match self.remaining_queries() {
                Some(remaining) if remaining > 0 => {
                    format!("Você está no Plano {name}. Restam {remaining} consultas gratuitas.")
                }
                _ => format!("Seu Plano {name} expirou. Faça upgrade para continuar gerando orçamentos."),
            },
            PlanType::Start => {
                format!("Você está no Plano {name}. Limite de {START_QUERY_LIMIT} consultas/mês.")
            }
            PlanType::Pro => format!("Parabéns! Você está no Plano {name} com consultas Ilimitadas."),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatus {
    pub profile: Profile,
    pub gate: PlanGate,
    pub remaining_queries: Option<i32>,
    #[schema(example = "Você está no Plano Teste. Restam 2 consultas gratuitas.")]
    pub message: String,
}

impl From<Profile> for PlanStatus {
    fn from(profile: Profile) -> Self {
        let gate = profile.gate();
        Self {
            remaining_queries: gate.remaining_queries(),
            message: gate.status_message(),
            gate,
            profile,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(max = 100, message = "O nome deve ter no máximo 100 caracteres."))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "O sobrenome deve ter no máximo 100 caracteres."))]
    pub last_name: Option<String>,
    #[validate(url(message = "A URL do avatar é inválida."))]
    pub avatar_url: Option<String>,
}
