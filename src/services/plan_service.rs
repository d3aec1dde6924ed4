// src/services/plan_service.rs

use async_trait::async_trait;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProfileRepository,
    models::profile::{PlanStatus, PlanType, Profile, UpdateProfilePayload},
};

/// Portão consultado antes de cada chamada à IA.
#[async_trait]
pub trait QueryGate: Send + Sync {
    /// Recusa quando o plano não permite mais consultas; caso contrário
    /// contabiliza a consulta.
    async fn authorize_query(&self, user_id: Uuid) -> Result<(), AppError>;
}

// --- Webhook da Kiwify ---

#[derive(Debug, Deserialize, ToSchema)]
pub struct KiwifyWebhook {
    #[schema(example = "order.approved")]
    pub event: Option<String>,
    pub data: Option<KiwifyData>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct KiwifyData {
    pub buyer: Option<KiwifyBuyer>,
    pub product: Option<KiwifyProduct>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct KiwifyBuyer {
    #[schema(example = "maria@buffet.com")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct KiwifyProduct {
    #[schema(example = "Plano Pro 497")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    Activate { email: String, plan: PlanType },
    Cancel { email: String },
    Ignore,
}

/// Plano correspondente ao nome do produto vendido.
pub fn plan_for_product(product_name: &str) -> Option<PlanType> {
    if product_name.contains("497") {
        Some(PlanType::Pro)
    } else if product_name.contains("197") {
        Some(PlanType::Start)
    } else {
        None
    }
}

impl KiwifyWebhook {
    pub fn action(&self) -> Result<WebhookAction, AppError> {
        let (Some(event), Some(data)) = (&self.event, &self.data) else {
            return Err(AppError::InvalidWebhookPayload);
        };

        let email = data.buyer.as_ref().and_then(|b| b.email.clone());

        let action = match (event.as_str(), email) {
            ("order.approved", Some(email)) => {
                let product = data.product.as_ref().and_then(|p| p.name.as_deref()).unwrap_or_default();
                match plan_for_product(product) {
                    Some(plan) => WebhookAction::Activate { email, plan },
                    None => {
                        tracing::warn!("⚠️ Produto sem plano correspondente: '{}'", product);
                        WebhookAction::Ignore
                    }
                }
            }
            ("subscription.cancelled", Some(email)) => WebhookAction::Cancel { email },
            _ => WebhookAction::Ignore,
        };

        Ok(action)
    }
}

pub fn verify_signature(expected: Option<&str>, provided: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Err(AppError::InternalServerError(anyhow::anyhow!(
            "KIWIFY_WEBHOOK_SECRET não configurado no ambiente."
        )));
    };

    if provided != Some(expected) {
        return Err(AppError::InvalidWebhookSignature);
    }
    Ok(())
}

#[derive(Clone)]
pub struct PlanService {
    profile_repo: ProfileRepository,
    webhook_secret: Option<String>,
}

impl PlanService {
    pub fn new(profile_repo: ProfileRepository, webhook_secret: Option<String>) -> Self {
        Self { profile_repo, webhook_secret }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.profile_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::ProfileNotFound)
    }

    pub async fn get_status(&self, user_id: Uuid) -> Result<PlanStatus, AppError> {
        Ok(PlanStatus::from(self.get_profile(user_id).await?))
    }

    pub async fn update_profile(&self, user_id: Uuid, payload: &UpdateProfilePayload) -> Result<PlanStatus, AppError> {
        let profile = self
            .profile_repo
            .update(user_id, payload)
            .await?
            .ok_or(AppError::ProfileNotFound)?;
        Ok(PlanStatus::from(profile))
    }

    pub async fn handle_webhook(&self, signature: Option<&str>, payload: &KiwifyWebhook) -> Result<(), AppError> {
        verify_signature(self.webhook_secret.as_deref(), signature)?;

        match payload.action()? {
            WebhookAction::Activate { email, plan } => {
                let updated = self.profile_repo.set_plan_by_email(&email, plan, true).await?;
                tracing::info!("✅ Plano atualizado: {} → {} ({} perfil)", email, plan.display_name(), updated);
            }
            WebhookAction::Cancel { email } => {
                let updated = self.profile_repo.set_plan_by_email(&email, PlanType::Trial, false).await?;
                tracing::info!("❌ Assinatura cancelada: {} ({} perfil)", email, updated);
            }
            WebhookAction::Ignore => {
                tracing::debug!("Evento de webhook ignorado: {:?}", payload.event);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QueryGate for PlanService {
    async fn authorize_query(&self, user_id: Uuid) -> Result<(), AppError> {
        let profile = self.get_profile(user_id).await?;
        profile.gate().check()?;

        // Falha ao contabilizar não bloqueia a IA
        if let Err(e) = self.profile_repo.increment_query_count(user_id).await {
            tracing::warn!("⚠️ Não foi possível incrementar query_count de {}: {:?}", user_id, e);
        }
        Ok(())
    }
}
