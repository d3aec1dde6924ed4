// src/db/quote_repo.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    engine::recalc::{refresh_totals, StaffClassifier},
    models::quote::{DeliveryStatus, LaborLine, MenuSection, OtherCost, Quote, QuotePatch, QuoteStatus, Totals},
    services::quote_service::QuoteStore,
};

const QUOTE_COLUMNS: &str = "id, event_label, guest_count, menu_sections, labor_lines, other_costs, \
     consumption_premises, tax_rate, margin_percent, suggested_price, status, delivery_status, \
     event_date, created_at";

// Linha da tabela 'quotes'. Os totais gravados são ignorados na leitura.
#[derive(FromRow)]
struct QuoteRow {
    id: Uuid,
    event_label: String,
    guest_count: i32,
    menu_sections: Json<Vec<MenuSection>>,
    labor_lines: Json<Vec<LaborLine>>,
    other_costs: Json<Vec<OtherCost>>,
    consumption_premises: Json<Vec<String>>,
    tax_rate: Decimal,
    margin_percent: Decimal,
    suggested_price: Decimal,
    status: QuoteStatus,
    delivery_status: DeliveryStatus,
    event_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl QuoteRow {
    fn into_quote(self, classifier: &dyn StaffClassifier) -> Quote {
        let mut quote = Quote {
            id: Some(self.id),
            event_label: self.event_label,
            guest_count: self.guest_count,
            menu_sections: Arc::new(self.menu_sections.0),
            labor_lines: Arc::new(self.labor_lines.0),
            other_costs: Arc::new(self.other_costs.0),
            consumption_premises: Arc::new(self.consumption_premises.0),
            premises: Arc::default(),
            totals: Totals::default(),
            tax_rate: self.tax_rate,
            margin_percent: self.margin_percent,
            suggested_price: self.suggested_price,
            status: self.status,
            created_at: self.created_at,
            event_date: self.event_date,
            delivery_status: self.delivery_status,
        };
        quote.sync_premises();
        refresh_totals(&mut quote, classifier);
        quote
    }
}

#[derive(Clone)]
pub struct QuoteRepository {
    pool: PgPool,
    classifier: Arc<dyn StaffClassifier>,
}

impl QuoteRepository {
    pub fn new(pool: PgPool, classifier: Arc<dyn StaffClassifier>) -> Self {
        Self { pool, classifier }
    }

    fn to_quote(&self, row: QuoteRow) -> Quote {
        row.into_quote(self.classifier.as_ref())
    }
}

#[async_trait]
impl QuoteStore for QuoteRepository {
    async fn list(&self, owner: Uuid) -> Result<Vec<Quote>, AppError> {
        let rows = sqlx::query_as::<_, QuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| self.to_quote(row)).collect())
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> Result<Option<Quote>, AppError> {
        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| self.to_quote(row)))
    }

    async fn create(&self, owner: Uuid, quote: &Quote) -> Result<Quote, AppError> {
        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            r#"
            INSERT INTO quotes (
                user_id, event_label, guest_count,
                menu_sections, labor_lines, other_costs, consumption_premises, totals,
                tax_rate, margin_percent, suggested_price,
                status, delivery_status, event_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {QUOTE_COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(&quote.event_label)
        .bind(quote.guest_count)
        .bind(Json(quote.menu_sections.as_ref()))
        .bind(Json(quote.labor_lines.as_ref()))
        .bind(Json(quote.other_costs.as_ref()))
        .bind(Json(quote.consumption_premises.as_ref()))
        .bind(Json(&quote.totals))
        .bind(quote.tax_rate)
        .bind(quote.margin_percent)
        .bind(quote.suggested_price)
        .bind(quote.status)
        .bind(quote.delivery_status)
        .bind(quote.event_date)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("💾 Orçamento criado: {}", row.id);
        Ok(self.to_quote(row))
    }

    async fn update(&self, owner: Uuid, quote: &Quote) -> Result<Quote, AppError> {
        let id = quote.id.ok_or(AppError::QuoteNotFound)?;

        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            r#"
            UPDATE quotes SET
                event_label = $3,
                guest_count = $4,
                menu_sections = $5,
                labor_lines = $6,
                other_costs = $7,
                consumption_premises = $8,
                totals = $9,
                tax_rate = $10,
                margin_percent = $11,
                suggested_price = $12,
                status = $13,
                delivery_status = $14,
                event_date = $15,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {QUOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(&quote.event_label)
        .bind(quote.guest_count)
        .bind(Json(quote.menu_sections.as_ref()))
        .bind(Json(quote.labor_lines.as_ref()))
        .bind(Json(quote.other_costs.as_ref()))
        .bind(Json(quote.consumption_premises.as_ref()))
        .bind(Json(&quote.totals))
        .bind(quote.tax_rate)
        .bind(quote.margin_percent)
        .bind(quote.suggested_price)
        .bind(quote.status)
        .bind(quote.delivery_status)
        .bind(quote.event_date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::QuoteNotFound)?;

        Ok(self.to_quote(row))
    }

    async fn patch(&self, owner: Uuid, id: Uuid, patch: &QuotePatch) -> Result<Option<Quote>, AppError> {
        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            r#"
            UPDATE quotes SET
                event_date = COALESCE($3, event_date),
                delivery_status = COALESCE($4, delivery_status),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {QUOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(patch.event_date)
        .bind(patch.delivery_status)
        .bind(patch.status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| self.to_quote(row)))
    }
}
