// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod editor;
mod engine;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let webhook_routes = Router::new().route("/kiwify", post(handlers::webhooks::kiwify_webhook));

    // Rotas protegidas
    let user_routes = Router::new().route("/me", get(handlers::auth::get_me));

    let profile_routes = Router::new().route(
        "/",
        get(handlers::profile::get_profile).put(handlers::profile::update_profile),
    );

    let cost_hint_routes = Router::new().route(
        "/",
        get(handlers::cost_hints::list_cost_hints).put(handlers::cost_hints::replace_cost_hints),
    );

    let quote_routes = Router::new()
        .route("/", get(handlers::quotes::list_quotes))
        .route("/generate", post(handlers::quotes::generate_quote))
        .route("/{id}", patch(handlers::quotes::patch_quote))
        .route("/{id}/edit", post(handlers::quotes::edit_quote));

    let session_routes = Router::new()
        .route(
            "/{sid}",
            get(handlers::sessions::get_session).delete(handlers::sessions::close_session),
        )
        .route("/{sid}/edits", post(handlers::sessions::apply_edit))
        .route("/{sid}/commit", post(handlers::sessions::commit))
        .route("/{sid}/undo", post(handlers::sessions::undo))
        .route("/{sid}/redo", post(handlers::sessions::redo))
        .route("/{sid}/margin", put(handlers::sessions::set_margin))
        .route("/{sid}/sections", post(handlers::sessions::add_section))
        .route("/{sid}/save", post(handlers::sessions::save))
        .route("/{sid}/export/pdf", get(handlers::sessions::export_pdf))
        .route("/{sid}/export/csv", get(handlers::sessions::export_csv));

    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/cost-hints", cost_hint_routes)
        .nest("/api/quotes", quote_routes)
        .nest("/api/sessions", session_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/webhooks", webhook_routes)
        .merge(protected)
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
