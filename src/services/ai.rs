// src/services/ai.rs

//! Colaborador de IA: transforma o pedido do cliente num orçamento e gera
//! seções avulsas do cardápio, via API REST do Gemini.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    engine::recalc::{refresh_totals, KeywordClassifier, StaffClassifier},
    models::quote::{CostHint, DeliveryStatus, LaborLine, MenuSection, OtherCost, Quote, QuoteStatus, DEFAULT_TAX_RATE},
};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Mensagens exibidas ao usuário sem alterações. Nunca há nova tentativa automática.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("A chave da API Gemini está ausente. Por favor, configure-a.")]
    MissingApiKey,

    #[error("A IA retornou um formato inválido. Tente novamente ou simplifique o pedido.")]
    InvalidQuoteFormat,

    #[error("A IA retornou um formato inválido ao calcular a receita. Tente novamente.")]
    InvalidSectionFormat,

    #[error("Não foi possível gerar o orçamento. Verifique a chave da API e tente novamente.")]
    QuoteGenerationFailed,

    #[error("Não foi possível calcular a receita. Verifique a chave da API e tente novamente.")]
    SectionGenerationFailed,
}

#[async_trait]
pub trait QuoteGenerator: Send + Sync {
    /// Rascunho completo (sem id) a partir da descrição livre do evento.
    async fn generate_quote(&self, description: &str, cost_hints: &[CostHint]) -> Result<Quote, AiError>;

    async fn generate_section(&self, name: &str, guest_count: i32) -> Result<MenuSection, AiError>;
}

// --- Formato devolvido pela IA ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateResponse {
    event_type: String,
    guests: i32,
    #[serde(default)]
    consumption_averages: Vec<String>,
    #[serde(default)]
    menu_items: Vec<MenuSection>,
    totals: EstimateTotals,
}

// Os totais da IA são descartados; só as linhas interessam.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateTotals {
    #[serde(default)]
    labor_details: Vec<LaborLine>,
    #[serde(default)]
    other_costs: Vec<OtherCost>,
}

impl EstimateResponse {
    fn into_quote(self, tax_rate: Decimal, classifier: &dyn StaffClassifier) -> Quote {
        let mut quote = Quote::new(self.event_type, self.guests);
        quote.menu_sections = Arc::new(self.menu_items);
        quote.labor_lines = Arc::new(self.totals.labor_details);
        quote.other_costs = Arc::new(self.totals.other_costs);
        quote.consumption_premises = Arc::new(self.consumption_averages);
        quote.tax_rate = tax_rate;
        quote.status = QuoteStatus::Draft;
        quote.delivery_status = DeliveryStatus::Pending;
        quote.suggested_price = Decimal::ZERO;
        quote.sync_premises();
        refresh_totals(&mut quote, classifier);
        quote
    }
}

/// Interpreta a resposta JSON da geração completa, recalculando todos os custos.
pub fn parse_quote_draft(text: &str, tax_rate: Decimal, classifier: &dyn StaffClassifier) -> Result<Quote, AiError> {
    serde_json::from_str::<EstimateResponse>(text)
        .map(|estimate| estimate.into_quote(tax_rate, classifier))
        .map_err(|e| {
            tracing::warn!("⚠️ Resposta da IA fora do formato: {}", e);
            AiError::InvalidQuoteFormat
        })
}

pub fn parse_menu_section(text: &str) -> Result<MenuSection, AiError> {
    serde_json::from_str::<MenuSection>(text).map_err(|e| {
        tracing::warn!("⚠️ Seção gerada pela IA fora do formato: {}", e);
        AiError::InvalidSectionFormat
    })
}

// --- Schemas de resposta ---

fn menu_section_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING", "description": "Nome do prato/item principal do menu." },
            "ingredients": {
                "type": "ARRAY",
                "description": "Lista de ingredientes e seus custos.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "Nome do ingrediente." },
                        "qty": { "type": "NUMBER", "description": "Quantidade total necessária." },
                        "unit": { "type": "STRING", "description": "Unidade de medida (kg, g, L, ml, unidade, caixa, pacote)." },
                        "unitCost": { "type": "NUMBER", "description": "Custo estimado por unidade, baseado em preços médios de mercado no Brasil." },
                        "totalCost": { "type": "NUMBER", "description": "Custo total do item (quantidade * custo unitário)." }
                    },
                    "required": ["name", "qty", "unit", "unitCost", "totalCost"]
                }
            }
        },
        "required": ["name", "ingredients"]
    })
}

fn estimate_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "eventType": { "type": "STRING", "description": "Tipo de evento (ex: Casamento, Aniversário, Corporativo)." },
            "guests": { "type": "INTEGER", "description": "Número de convidados." },
            "consumptionAverages": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Premissas de consumo por pessoa usadas no cálculo (ex: 'Carne: 0.5kg por pessoa')."
            },
            "menuItems": {
                "type": "ARRAY",
                "description": "Lista de pratos do menu, cada um com seus respectivos ingredientes.",
                "items": menu_section_schema()
            },
            "totals": {
                "type": "OBJECT",
                "properties": {
                    "ingredients": { "type": "NUMBER" },
                    "labor": { "type": "NUMBER" },
                    "laborDetails": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "role": { "type": "STRING", "description": "Função do profissional (ex: Cozinheiro, Garçom)." },
                                "count": { "type": "INTEGER" },
                                "costPerUnit": { "type": "NUMBER" },
                                "totalCost": { "type": "NUMBER" }
                            },
                            "required": ["role", "count", "costPerUnit", "totalCost"]
                        }
                    },
                    "productionCost": { "type": "NUMBER" },
                    "otherCosts": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": { "type": "STRING", "description": "Nome do custo (ex: Frete)." },
                                "cost": { "type": "NUMBER" }
                            },
                            "required": ["name", "cost"]
                        }
                    },
                    "tax": { "type": "NUMBER" },
                    "totalCost": { "type": "NUMBER" },
                    "suggestedPrice": { "type": "NUMBER" }
                },
                "required": ["ingredients", "labor", "otherCosts", "tax", "totalCost", "suggestedPrice"]
            }
        },
        "required": ["eventType", "guests", "menuItems", "totals", "consumptionAverages"]
    })
}

fn quote_prompt(description: &str, cost_hints: &[CostHint]) -> String {
    let hints = cost_hints
        .iter()
        .map(|hint| format!("- Custo de \"{}\": {} BRL", hint.name, hint.cost))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analise o seguinte pedido para um buffet e transforme-o em um orçamento detalhado em formato JSON.

Pedido do cliente: "{description}"

Use os seguintes custos personalizados fornecidos pelo dono do buffet como base para a mão de obra e outros custos fixos:
{hints}

Regras:
1. Ingredientes: quantidades totais por prato, agrupadas em 'menuItems', com preços médios de mercado em BRL.
2. Mão de obra: detalhe cada função (role, count, costPerUnit, totalCost) usando os custos personalizados que se aplicam.
3. Outros custos: custos personalizados que não são mão de obra. Estime frete de R$2.50 por convidado se não houver frete fixo.
4. Impostos: 8% sobre ingredientes + mão de obra + outros custos.
5. Preço sugerido: custo total * 1.4.
6. Em 'consumptionAverages' liste as premissas por pessoa no formato "Item: 500g por pessoa".

O resultado DEVE ser um objeto JSON que siga estritamente o schema fornecido."#
    )
}

fn section_prompt(name: &str, guest_count: i32) -> String {
    format!(
        r#"Calcule os ingredientes e custos necessários para preparar o prato "{name}" para um evento com {guest_count} convidados.

1. Determine a quantidade de cada ingrediente com base no número de convidados.
2. Estime o custo unitário de cada ingrediente (em BRL).
3. Calcule o custo total de cada ingrediente (quantidade * custo unitário).

O resultado DEVE ser um objeto JSON que siga estritamente o schema fornecido."#
    )
}

// --- Cliente REST ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .and_then(|mut candidates| candidates.pop())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
}

fn describe_http_error(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| format!("HTTP {status}: {body}"))
}

#[derive(Clone)]
pub struct GeminiQuoteGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    tax_rate: Decimal,
    classifier: Arc<dyn StaffClassifier>,
}

impl GeminiQuoteGenerator {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            tax_rate: DEFAULT_TAX_RATE,
            classifier: Arc::new(KeywordClassifier::default()),
        }
    }

    /// Alíquota aplicada aos rascunhos gerados.
    pub fn with_default_tax_rate(mut self, tax_rate: Decimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Classificador da equipe de cozinha usado nos totais do rascunho.
    pub fn with_classifier(mut self, classifier: Arc<dyn StaffClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Devolve o texto JSON gerado, ou `None` em qualquer falha de rede/API (já logada).
    async fn generate_json(&self, prompt: String, schema: Value) -> Result<Option<String>, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;
        let url = format!("{BASE_URL}/{}:generateContent?key={api_key}", self.model);

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            },
        };

        let response = match self.client.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("🔥 Falha na chamada à API Gemini: {}", e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            tracing::error!("🔥 API Gemini respondeu com erro: {}", describe_http_error(status, &body_text));
            return Ok(None);
        }

        match response.json::<GenerateContentResponse>().await {
            Ok(parsed) => Ok(extract_text(parsed)),
            Err(e) => {
                tracing::error!("🔥 Resposta da API Gemini ilegível: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl QuoteGenerator for GeminiQuoteGenerator {
    async fn generate_quote(&self, description: &str, cost_hints: &[CostHint]) -> Result<Quote, AiError> {
        let text = self
            .generate_json(quote_prompt(description, cost_hints), estimate_schema())
            .await?
            .ok_or(AiError::QuoteGenerationFailed)?;

        let quote = parse_quote_draft(&text, self.tax_rate, self.classifier.as_ref())?;
        tracing::info!(
            "🤖 Orçamento gerado pela IA: {} ({} convidados, {} seções)",
            quote.event_label,
            quote.guest_count,
            quote.menu_sections.len()
        );
        Ok(quote)
    }

    async fn generate_section(&self, name: &str, guest_count: i32) -> Result<MenuSection, AiError> {
        let text = self
            .generate_json(section_prompt(name, guest_count), menu_section_schema())
            .await?
            .ok_or(AiError::SectionGenerationFailed)?;

        parse_menu_section(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DRAFT: &str = r#"{
        "eventType": "Casamento",
        "guests": 100,
        "consumptionAverages": ["Carne: 0.5kg por pessoa"],
        "menuItems": [
            { "name": "Churrasco", "ingredients": [
                { "name": "Picanha", "qty": 2, "unit": "kg", "unitCost": 10, "totalCost": 999 }
            ]}
        ],
        "totals": {
            "ingredients": 1, "labor": 1, "tax": 1, "totalCost": 1, "suggestedPrice": 1,
            "laborDetails": [ { "role": "Garçom", "count": 1, "costPerUnit": 150, "totalCost": 0 } ],
            "otherCosts": [ { "name": "Frete", "cost": 250 } ]
        }
    }"#;

    #[test]
    fn draft_costs_are_recomputed() {
        let quote = parse_quote_draft(DRAFT, DEFAULT_TAX_RATE, &KeywordClassifier::default()).unwrap();

        assert_eq!(quote.id, None);
        assert_eq!(quote.event_label, "Casamento");
        assert_eq!(quote.menu_sections[0].ingredients[0].line_cost(), Decimal::new(20, 0));
        assert_eq!(quote.totals.ingredients_cost, Decimal::new(20, 0));
        assert_eq!(quote.totals.labor_cost, Decimal::new(150, 0));
        assert_eq!(quote.totals.other_costs_total, Decimal::new(250, 0));
        assert_eq!(quote.totals.tax_rate, DEFAULT_TAX_RATE);
        assert_eq!(quote.consumption_premises.as_slice(), ["Carne: 0.5kg por pessoa".to_string()]);
        assert_eq!(quote.status, QuoteStatus::Draft);
        assert_eq!(quote.delivery_status, DeliveryStatus::Pending);
    }

    #[test]
    fn draft_totals_follow_the_given_classifier() {
        let default = parse_quote_draft(DRAFT, DEFAULT_TAX_RATE, &KeywordClassifier::default()).unwrap();
        let waiters_in_kitchen = |role: &str| role.contains("Garçom");
        let custom = parse_quote_draft(DRAFT, DEFAULT_TAX_RATE, &waiters_in_kitchen).unwrap();

        assert_eq!(default.totals.production_cost, Decimal::new(20, 0));
        assert_eq!(custom.totals.production_cost, Decimal::new(170, 0));
        assert_eq!(custom.totals.labor_cost, default.totals.labor_cost);
    }

    #[test]
    fn draft_premises_are_parsed() {
        let quote = parse_quote_draft(DRAFT, DEFAULT_TAX_RATE, &KeywordClassifier::default()).unwrap();

        assert_eq!(quote.premises.len(), 1);
        assert_eq!(quote.premises[0].subject, "Carne");
    }

    #[test]
    fn malformed_draft_is_an_invalid_format() {
        assert_eq!(
            parse_quote_draft("{ nope", DEFAULT_TAX_RATE, &KeywordClassifier::default()),
            Err(AiError::InvalidQuoteFormat)
        );
        assert_eq!(parse_menu_section("[]"), Err(AiError::InvalidSectionFormat));
    }

    #[test]
    fn section_without_total_cost_parses() {
        let section = parse_menu_section(
            r#"{ "name": "Sobremesas", "ingredients": [ { "name": "Pudim", "qty": 3, "unit": "unidade", "unitCost": 12.5 } ] }"#,
        )
        .unwrap();

        assert_eq!(section.ingredients[0].line_cost(), Decimal::new(375, 1));
    }

    #[test]
    fn prompt_lists_cost_hints() {
        let prompt = quote_prompt("Casamento para 100 pessoas", &CostHint::defaults());

        assert!(prompt.contains("- Custo de \"Diária Garçom\": 150 BRL"));
        assert!(prompt.contains("Casamento para 100 pessoas"));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let generator = GeminiQuoteGenerator::new(Some("  ".to_string()), DEFAULT_GEMINI_MODEL);

        let result = generator.generate_section("Sobremesas", 10).await;

        assert_eq!(result, Err(AiError::MissingApiKey));
    }

    #[test]
    fn api_error_body_is_summarised() {
        let body = r#"{ "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" } }"#;

        assert_eq!(
            describe_http_error(StatusCode::TOO_MANY_REQUESTS, body),
            "RESOURCE_EXHAUSTED: Quota exceeded"
        );
    }
}
