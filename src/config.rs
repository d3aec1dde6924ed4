// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{CostHintRepository, ProfileRepository, QuoteRepository, UserRepository},
    editor::registry::{SessionRegistry, DEFAULT_IDLE_TIMEOUT, MAX_SESSIONS_PER_OWNER},
    engine::{
        cascade::{AliasMatcher, PremiseMatcher},
        recalc::{KeywordClassifier, StaffClassifier},
        QuoteRules,
    },
    models::quote::DEFAULT_TAX_RATE,
    services::{
        ai::{GeminiQuoteGenerator, DEFAULT_GEMINI_MODEL},
        auth::AuthService,
        cost_hint_service::CostHintService,
        export_service::ExportService,
        plan_service::PlanService,
        quote_service::QuoteService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub kiwify_webhook_secret: Option<String>,
    pub kitchen_staff_keywords: Vec<String>,
    pub premise_aliases: Option<String>,
    pub session_idle_timeout: Duration,
    pub default_tax_rate: Decimal,
    pub bind_addr: String,
    pub fonts_dir: String,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let kitchen_staff_keywords = optional("KITCHEN_STAFF_KEYWORDS")
            .map(|raw| raw.split(',').map(|k| k.trim().to_string()).collect())
            .unwrap_or_else(|| KeywordClassifier::default().keywords().to_vec());

        let default_tax_rate = match optional("DEFAULT_TAX_RATE") {
            Some(raw) => raw
                .parse::<Decimal>()
                .with_context(|| format!("DEFAULT_TAX_RATE inválido: {raw}"))?,
            None => DEFAULT_TAX_RATE,
        };

        let session_idle_timeout = match optional("SESSION_IDLE_MINUTES") {
            Some(raw) => {
                let minutes = raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("SESSION_IDLE_MINUTES inválido: {raw}"))?;
                Duration::from_secs(minutes * 60)
            }
            None => DEFAULT_IDLE_TIMEOUT,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            kiwify_webhook_secret: optional("KIWIFY_WEBHOOK_SECRET"),
            kitchen_staff_keywords,
            premise_aliases: optional("PREMISE_ALIASES"),
            session_idle_timeout,
            default_tax_rate,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            fonts_dir: optional("FONTS_DIR").unwrap_or_else(|| "./fonts".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub plan_service: PlanService,
    pub quote_service: QuoteService,
    pub cost_hint_service: CostHintService,
    pub export_service: ExportService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let classifier: Arc<dyn StaffClassifier> = Arc::new(KeywordClassifier::new(&config.kitchen_staff_keywords));
        let matcher: Arc<dyn PremiseMatcher> = match config.premise_aliases.as_deref() {
            Some(raw) => Arc::new(AliasMatcher::parse(raw)),
            None => Arc::new(AliasMatcher::meat_cuts()),
        };
        let rules = QuoteRules::new(Arc::clone(&classifier), matcher);

        let user_repo = UserRepository::new(db_pool.clone());
        let profile_repo = ProfileRepository::new(db_pool.clone());
        let quote_repo = QuoteRepository::new(db_pool.clone(), Arc::clone(&classifier));
        let cost_hint_repo = CostHintRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo,
            profile_repo.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let plan_service = PlanService::new(profile_repo, config.kiwify_webhook_secret.clone());

        if config.gemini_api_key.is_none() {
            tracing::warn!("⚠️ GEMINI_API_KEY não configurada: a geração por IA ficará indisponível.");
        }
        let generator = GeminiQuoteGenerator::new(config.gemini_api_key.clone(), config.gemini_model.clone())
            .with_default_tax_rate(config.default_tax_rate)
            .with_classifier(Arc::clone(&classifier));

        let sessions = SessionRegistry::with_limits(config.session_idle_timeout, MAX_SESSIONS_PER_OWNER);
        sessions.spawn_sweeper(Duration::from_secs(5 * 60));

        let quote_service = QuoteService::new(
            Arc::new(quote_repo),
            Arc::new(generator),
            Arc::new(plan_service.clone()),
            sessions,
            rules,
        );

        Ok(Self {
            db_pool,
            auth_service,
            plan_service,
            quote_service,
            cost_hint_service: CostHintService::new(cost_hint_repo),
            export_service: ExportService::new(config.fonts_dir.clone()),
        })
    }
}
