// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::{editor, engine, handlers, models, services};

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Profile ---
        handlers::profile::get_profile,
        handlers::profile::update_profile,

        // --- Cost Hints ---
        handlers::cost_hints::list_cost_hints,
        handlers::cost_hints::replace_cost_hints,

        // --- Quotes ---
        handlers::quotes::generate_quote,
        handlers::quotes::edit_quote,
        handlers::quotes::list_quotes,
        handlers::quotes::patch_quote,

        // --- Sessions ---
        handlers::sessions::get_session,
        handlers::sessions::apply_edit,
        handlers::sessions::commit,
        handlers::sessions::undo,
        handlers::sessions::redo,
        handlers::sessions::set_margin,
        handlers::sessions::add_section,
        handlers::sessions::save,
        handlers::sessions::export_pdf,
        handlers::sessions::export_csv,
        handlers::sessions::close_session,

        // --- Webhooks ---
        handlers::webhooks::kiwify_webhook,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Profile ---
            models::profile::PlanType,
            models::profile::Profile,
            models::profile::PlanGate,
            models::profile::PlanStatus,
            models::profile::UpdateProfilePayload,

            // --- Quotes ---
            models::quote::QuoteStatus,
            models::quote::DeliveryStatus,
            models::quote::IngredientRecord,
            models::quote::MenuSection,
            models::quote::LaborLineRecord,
            models::quote::OtherCost,
            models::quote::Totals,
            models::quote::Quote,
            models::quote::CostHint,
            models::quote::QuotePatch,
            models::premise::ConsumptionPremise,
            engine::recalc::PriceSimulation,

            // --- Editor ---
            editor::PendingOperation,
            editor::edits::EditMode,
            editor::edits::IngredientField,
            editor::edits::LaborField,
            editor::edits::OtherCostField,
            editor::edits::PremiseField,
            editor::edits::QuoteEdit,
            editor::session::QuoteSummary,

            // --- Payloads ---
            handlers::quotes::GenerateQuotePayload,
            handlers::sessions::ApplyEditPayload,
            handlers::sessions::MarginPayload,
            handlers::sessions::AddSectionPayload,

            // --- Webhooks ---
            services::plan_service::KiwifyWebhook,
            services::plan_service::KiwifyData,
            services::plan_service::KiwifyBuyer,
            services::plan_service::KiwifyProduct,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Profile", description = "Perfil e Plano de Assinatura"),
        (name = "Cost Hints", description = "Dicas de Custo usadas pela IA"),
        (name = "Quotes", description = "Geração e Gestão de Orçamentos"),
        (name = "Sessions", description = "Edição de Orçamentos (desfazer/refazer, seções, exportação)"),
        (name = "Webhooks", description = "Eventos de Pagamento da Kiwify")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
