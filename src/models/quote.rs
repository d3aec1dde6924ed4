// src/models/quote.rs

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::premise::{parse_premises, serialize_premises, ConsumptionPremise};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "quote_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    Draft,    // Rascunho
    Sent,     // Enviado
    Approved, // Aprovado
    Rejected, // Rejeitado
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "delivery_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,   // Pendente
    Sent,      // Enviado
    Delivered, // Entregue
    Cancelled, // Cancelado
}

// --- Linhas de custo ---
//
// O custo total de cada linha nunca é armazenado: é sempre `quantidade * custo
// unitário`. Os registros `*Record` existem só para manter o formato JSON
// persistido (com `totalCost`) e são recalculados na leitura.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IngredientRecord", into = "IngredientRecord")]
pub struct Ingredient {
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_cost: Decimal,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: Decimal, unit: impl Into<String>, unit_cost: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            unit_cost,
        }
    }

    pub fn line_cost(&self) -> Decimal {
        self.quantity.saturating_mul(self.unit_cost)
    }
}

impl Default for Ingredient {
    fn default() -> Self {
        Self::new("Novo Item", Decimal::ONE, "unidade", Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = Ingredient)]
pub struct IngredientRecord {
    #[schema(example = "Picanha")]
    pub name: String,
    #[schema(value_type = f64, example = 40)]
    pub qty: Decimal,
    #[schema(example = "kg")]
    pub unit: String,
    #[schema(value_type = f64, example = 89.9)]
    pub unit_cost: Decimal,
    // Ignorado na leitura
    #[serde(default)]
    #[schema(value_type = f64, example = 3596)]
    pub total_cost: Decimal,
}

impl From<IngredientRecord> for Ingredient {
    fn from(record: IngredientRecord) -> Self {
        Self::new(record.name, record.qty, record.unit, record.unit_cost)
    }
}

impl From<Ingredient> for IngredientRecord {
    fn from(item: Ingredient) -> Self {
        let total_cost = item.line_cost();
        Self {
            name: item.name,
            qty: item.quantity,
            unit: item.unit,
            unit_cost: item.unit_cost,
            total_cost,
        }
    }
}

/// Seção do cardápio ("Churrasco", "Saladas") com seus ingredientes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuSection {
    #[schema(example = "Churrasco")]
    pub name: String,
    #[schema(value_type = Vec<IngredientRecord>)]
    pub ingredients: Arc<Vec<Ingredient>>,
}

impl MenuSection {
    pub fn new(name: impl Into<String>, ingredients: Vec<Ingredient>) -> Self {
        Self {
            name: name.into(),
            ingredients: Arc::new(ingredients),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LaborLineRecord", into = "LaborLineRecord")]
pub struct LaborLine {
    pub role: String,
    pub count: Decimal,
    pub cost_per_unit: Decimal,
}

impl LaborLine {
    pub fn new(role: impl Into<String>, count: Decimal, cost_per_unit: Decimal) -> Self {
        Self {
            role: role.into(),
            count,
            cost_per_unit,
        }
    }

    pub fn line_cost(&self) -> Decimal {
        self.count.saturating_mul(self.cost_per_unit)
    }
}

impl Default for LaborLine {
    fn default() -> Self {
        Self::new("Novo Profissional", Decimal::ONE, Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = LaborLine)]
pub struct LaborLineRecord {
    #[schema(example = "Cozinheiro")]
    pub role: String,
    #[schema(value_type = f64, example = 2)]
    pub count: Decimal,
    #[schema(value_type = f64, example = 200)]
    pub cost_per_unit: Decimal,
    #[serde(default)]
    #[schema(value_type = f64, example = 400)]
    pub total_cost: Decimal,
}

impl From<LaborLineRecord> for LaborLine {
    fn from(record: LaborLineRecord) -> Self {
        Self::new(record.role, record.count, record.cost_per_unit)
    }
}

impl From<LaborLine> for LaborLineRecord {
    fn from(line: LaborLine) -> Self {
        let total_cost = line.line_cost();
        Self {
            role: line.role,
            count: line.count,
            cost_per_unit: line.cost_per_unit,
            total_cost,
        }
    }
}

/// Custo adicional sem quantidade (frete, aluguel de equipamentos).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtherCost {
    #[schema(example = "Frete")]
    pub name: String,
    #[serde(rename = "cost")]
    #[schema(value_type = f64, example = 250)]
    pub amount: Decimal,
}

impl OtherCost {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

impl Default for OtherCost {
    fn default() -> Self {
        Self::new("Novo Custo", Decimal::ZERO)
    }
}

/// Totais derivados. Nunca editados diretamente: são sempre o resultado do
/// motor de recálculo sobre as linhas do orçamento.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[schema(value_type = f64)]
    pub ingredients_cost: Decimal,
    #[schema(value_type = f64)]
    pub labor_cost: Decimal,
    #[schema(value_type = f64)]
    pub production_cost: Decimal,
    #[schema(value_type = f64)]
    pub other_costs_total: Decimal,
    #[schema(value_type = f64, example = 8)]
    pub tax_rate: Decimal,
    #[schema(value_type = f64)]
    pub tax_amount: Decimal,
    #[schema(value_type = f64)]
    pub total_cost: Decimal,
}

pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 0);
pub const DEFAULT_MARGIN_PERCENT: Decimal = Decimal::from_parts(40, 0, 0, false, 0);

/// A raiz do agregado. Os vetores ficam atrás de `Arc` para que cada edição
/// produza um novo valor compartilhando as partes que não mudaram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// `None` enquanto for um rascunho gerado pela IA ainda não salvo.
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Option<Uuid>,

    #[schema(example = "Casamento")]
    pub event_label: String,

    #[schema(example = 100)]
    pub guest_count: i32,

    #[schema(value_type = Vec<MenuSection>)]
    pub menu_sections: Arc<Vec<MenuSection>>,

    #[schema(value_type = Vec<LaborLineRecord>)]
    pub labor_lines: Arc<Vec<LaborLine>>,

    #[schema(value_type = Vec<OtherCost>)]
    pub other_costs: Arc<Vec<OtherCost>>,

    /// Fonte da verdade das premissas: as strings, não a forma estruturada.
    #[schema(value_type = Vec<String>, example = json!(["Carne: 0.5kg por pessoa"]))]
    pub consumption_premises: Arc<Vec<String>>,

    /// Forma estruturada das premissas durante a edição. Guarda quantidade e
    /// unidade mesmo quando a string serializada vira só o assunto
    /// (quantidade zero, unidade vazia). Não é persistida.
    #[serde(skip)]
    #[schema(ignore)]
    pub premises: Arc<Vec<ConsumptionPremise>>,

    pub totals: Totals,

    #[schema(value_type = f64, example = 8)]
    pub tax_rate: Decimal,

    #[schema(value_type = f64, example = 40)]
    pub margin_percent: Decimal,

    /// Preço sugerido carimbado no momento do salvamento.
    #[schema(value_type = f64)]
    pub suggested_price: Decimal,

    pub status: QuoteStatus,

    pub created_at: DateTime<Utc>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-12-20")]
    pub event_date: Option<NaiveDate>,

    pub delivery_status: DeliveryStatus,
}

impl Quote {
    pub fn new(event_label: impl Into<String>, guest_count: i32) -> Self {
        Self {
            id: None,
            event_label: event_label.into(),
            guest_count,
            menu_sections: Arc::default(),
            labor_lines: Arc::default(),
            other_costs: Arc::default(),
            consumption_premises: Arc::default(),
            premises: Arc::default(),
            totals: Totals {
                tax_rate: DEFAULT_TAX_RATE,
                ..Totals::default()
            },
            tax_rate: DEFAULT_TAX_RATE,
            margin_percent: DEFAULT_MARGIN_PERCENT,
            suggested_price: Decimal::ZERO,
            status: QuoteStatus::Draft,
            created_at: Utc::now(),
            event_date: None,
            delivery_status: DeliveryStatus::Pending,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Reconstrói as premissas estruturadas a partir das strings, a menos que
    /// as atuais já produzam exatamente essas strings.
    pub fn sync_premises(&mut self) {
        if serialize_premises(&self.premises) != *self.consumption_premises {
            self.premises = Arc::new(parse_premises(&self.consumption_premises));
        }
    }

    /// Troca as premissas estruturadas e deriva as strings delas.
    pub fn set_premises(&mut self, premises: Vec<ConsumptionPremise>) {
        self.consumption_premises = Arc::new(serialize_premises(&premises));
        self.premises = Arc::new(premises);
    }
}

/// Dica de custo personalizada do dono do buffet, repassada à IA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostHint {
    #[schema(example = "Diária Garçom")]
    pub name: String,
    #[schema(value_type = f64, example = 150)]
    pub cost: Decimal,
}

impl CostHint {
    pub fn defaults() -> Vec<CostHint> {
        vec![
            CostHint { name: "Diária Garçom".to_string(), cost: Decimal::new(150, 0) },
            CostHint { name: "Diária Cozinheira".to_string(), cost: Decimal::new(200, 0) },
            CostHint { name: "Marketing e Foto".to_string(), cost: Decimal::new(250, 0) },
        ]
    }
}

/// Campos que o painel altera diretamente, fora de uma sessão de edição.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotePatch {
    #[schema(value_type = Option<String>, format = Date, example = "2025-12-20")]
    pub event_date: Option<NaiveDate>,
    pub delivery_status: Option<DeliveryStatus>,
    pub status: Option<QuoteStatus>,
}
