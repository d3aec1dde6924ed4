// src/engine/recalc.rs

//! Motor de recálculo: funções puras que derivam os totais do orçamento a
//! partir das linhas de ingredientes, mão de obra e outros custos.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::quote::{LaborLine, MenuSection, OtherCost, Quote, Totals};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Decide se uma função conta como equipe de cozinha (entra no custo de
/// produção). Calculado sempre a partir do nome atual, nunca guardado.
pub trait StaffClassifier: Send + Sync {
    fn is_kitchen_staff(&self, role: &str) -> bool;
}

impl<F> StaffClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_kitchen_staff(&self, role: &str) -> bool {
        self(role)
    }
}

/// Classificação por substring, sem diferenciar maiúsculas.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordClassifier {
    // "Cozinheiro(a)" e "Auxiliar de cozinha"
    fn default() -> Self {
        Self::new(["cozinheir", "auxiliar"])
    }
}

impl StaffClassifier for KeywordClassifier {
    fn is_kitchen_staff(&self, role: &str) -> bool {
        let role = role.to_lowercase();
        self.keywords.iter().any(|k| role.contains(k.as_str()))
    }
}

pub fn ingredients_cost(menu_sections: &[MenuSection]) -> Decimal {
    menu_sections
        .iter()
        .flat_map(|section| section.ingredients.iter())
        .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.line_cost()))
}

pub fn labor_cost(labor_lines: &[LaborLine]) -> Decimal {
    labor_lines
        .iter()
        .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.line_cost()))
}

pub fn kitchen_staff_cost(classifier: &dyn StaffClassifier, labor_lines: &[LaborLine]) -> Decimal {
    labor_lines
        .iter()
        .filter(|line| classifier.is_kitchen_staff(&line.role))
        .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.line_cost()))
}

pub fn other_costs_total(other_costs: &[OtherCost]) -> Decimal {
    other_costs
        .iter()
        .fold(Decimal::ZERO, |acc, cost| acc.saturating_add(cost.amount))
}

/// Recalcula os totais com a classificação padrão de equipe de cozinha.
pub fn recompute(
    menu_sections: &[MenuSection],
    other_costs: &[OtherCost],
    labor_lines: &[LaborLine],
    tax_rate: Decimal,
) -> Totals {
    recompute_with(&KeywordClassifier::default(), menu_sections, other_costs, labor_lines, tax_rate)
}

/// Imposto sobre ingredientes + mão de obra + outros custos; o custo de
/// produção soma só a equipe de cozinha. Nunca falha: valores negativos ou
/// zerados passam direto.
pub fn recompute_with(
    classifier: &dyn StaffClassifier,
    menu_sections: &[MenuSection],
    other_costs: &[OtherCost],
    labor_lines: &[LaborLine],
    tax_rate: Decimal,
) -> Totals {
    let ingredients_cost = ingredients_cost(menu_sections);
    let labor_cost = labor_cost(labor_lines);
    let production_cost = ingredients_cost.saturating_add(kitchen_staff_cost(classifier, labor_lines));
    let other_costs_total = other_costs_total(other_costs);

    let tax_base = ingredients_cost
        .saturating_add(labor_cost)
        .saturating_add(other_costs_total);
    let tax_amount = tax_base.saturating_mul(tax_rate) / HUNDRED;
    let total_cost = tax_base.saturating_add(tax_amount);

    Totals {
        ingredients_cost,
        labor_cost,
        production_cost,
        other_costs_total,
        tax_rate,
        tax_amount,
        total_cost,
    }
}

/// Substitui os totais do orçamento pelos recalculados.
pub fn refresh_totals(quote: &mut Quote, classifier: &dyn StaffClassifier) {
    quote.totals = recompute_with(
        classifier,
        &quote.menu_sections,
        &quote.other_costs,
        &quote.labor_lines,
        quote.tax_rate,
    );
}

/// Simulação de preço de venda. Fica fora do histórico: a margem é um
/// controle ao vivo aplicado a cada leitura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceSimulation {
    #[schema(value_type = f64, example = 40)]
    pub margin_percent: Decimal,
    #[schema(value_type = f64)]
    pub suggested_price: Decimal,
    #[schema(value_type = f64)]
    pub gross_profit: Decimal,
}

pub fn suggested_price(total_cost: Decimal, margin_percent: Decimal) -> Decimal {
    total_cost.saturating_mul(Decimal::ONE.saturating_add(margin_percent / HUNDRED))
}

pub fn simulate_price(totals: &Totals, margin_percent: Decimal) -> PriceSimulation {
    let suggested_price = suggested_price(totals.total_cost, margin_percent);
    PriceSimulation {
        margin_percent,
        suggested_price,
        gross_profit: suggested_price.saturating_sub(totals.total_cost),
    }
}
