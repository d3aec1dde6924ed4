// src/editor/edits.rs

//! Operações de edição sobre um orçamento. Cada operação produz um novo
//! `Quote` (compartilhando o que não mudou) já com os totais recalculados;
//! o original nunca é alterado.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use super::EditError;
use crate::{
    common::numeric::{coerce_count, coerce_decimal},
    engine::{
        cascade::apply_premises,
        recalc::{refresh_totals, StaffClassifier},
        QuoteRules,
    },
    models::{
        premise::ConsumptionPremise,
        quote::{DeliveryStatus, Ingredient, LaborLine, MenuSection, OtherCost, Quote, QuoteStatus},
    },
};

/// `stage` a cada tecla, `commit` ao sair do campo ou em edições estruturais.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    Stage,
    #[default]
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum IngredientField {
    Name,
    Quantity,
    Unit,
    UnitCost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum LaborField {
    Role,
    Count,
    CostPerUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum OtherCostField {
    Name,
    Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum PremiseField {
    Subject,
    Quantity,
    Unit,
}

/// Valores numéricos chegam como o texto digitado e são convertidos aqui
/// (vazio ou inválido vira zero).
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum QuoteEdit {
    UpdateIngredient { section: usize, item: usize, field: IngredientField, value: String },
    AddIngredient { section: usize },
    RemoveIngredient { section: usize, item: usize },
    RenameSection { section: usize, name: String },
    RemoveSection { section: usize },
    UpdateLabor { index: usize, field: LaborField, value: String },
    AddLabor,
    RemoveLabor { index: usize },
    UpdateOtherCost { index: usize, field: OtherCostField, value: String },
    AddOtherCost,
    RemoveOtherCost { index: usize },
    UpdatePremise { index: usize, field: PremiseField, value: String },
    AddPremise,
    RemovePremise { index: usize },
    SetEventLabel { value: String },
    SetGuestCount { value: String },
    SetTaxRate { value: String },
    SetEventDate {
        #[schema(value_type = Option<String>, format = Date)]
        value: Option<NaiveDate>,
    },
    SetStatus { value: QuoteStatus },
    SetDeliveryStatus { value: DeliveryStatus },
}

impl QuoteEdit {
    /// Adições e remoções vão direto para o histórico, qualquer que seja o modo pedido.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            QuoteEdit::AddIngredient { .. }
                | QuoteEdit::RemoveIngredient { .. }
                | QuoteEdit::RemoveSection { .. }
                | QuoteEdit::AddLabor
                | QuoteEdit::RemoveLabor { .. }
                | QuoteEdit::AddOtherCost
                | QuoteEdit::RemoveOtherCost { .. }
                | QuoteEdit::AddPremise
                | QuoteEdit::RemovePremise { .. }
        )
    }
}

fn section_mut(quote: &mut Quote, section: usize) -> Result<&mut MenuSection, EditError> {
    Arc::make_mut(&mut quote.menu_sections)
        .get_mut(section)
        .ok_or(EditError::SectionNotFound(section))
}

fn ingredients_mut(quote: &mut Quote, section: usize) -> Result<&mut Vec<Ingredient>, EditError> {
    let section = section_mut(quote, section)?;
    Ok(Arc::make_mut(&mut section.ingredients))
}

fn labor_mut(quote: &mut Quote, index: usize) -> Result<&mut LaborLine, EditError> {
    Arc::make_mut(&mut quote.labor_lines)
        .get_mut(index)
        .ok_or(EditError::LaborNotFound(index))
}

fn other_cost_mut(quote: &mut Quote, index: usize) -> Result<&mut OtherCost, EditError> {
    Arc::make_mut(&mut quote.other_costs)
        .get_mut(index)
        .ok_or(EditError::OtherCostNotFound(index))
}

fn remove_at<T: Clone>(items: &mut Arc<Vec<T>>, index: usize, err: EditError) -> Result<(), EditError> {
    if index >= items.len() {
        return Err(err);
    }
    Arc::make_mut(items).remove(index);
    Ok(())
}

/// Reaplica as premissas às quantidades (troca de premissa ou de convidados).
fn cascade(quote: &mut Quote, rules: &QuoteRules) {
    quote.menu_sections = Arc::new(apply_premises(
        &quote.menu_sections,
        &quote.premises,
        quote.guest_count,
        rules.matcher.as_ref(),
    ));
}

/// Altera a lista estruturada e deriva as strings dela.
fn edit_premises<F>(quote: &mut Quote, change: F) -> Result<(), EditError>
where
    F: FnOnce(&mut Vec<ConsumptionPremise>) -> Result<(), EditError>,
{
    let mut premises = quote.premises.to_vec();
    change(&mut premises)?;
    quote.set_premises(premises);
    Ok(())
}

pub fn apply_edit(quote: &Quote, edit: &QuoteEdit, rules: &QuoteRules) -> Result<Quote, EditError> {
    let mut next = quote.clone();
    next.sync_premises();

    match edit {
        QuoteEdit::UpdateIngredient { section, item, field, value } => {
            let items = ingredients_mut(&mut next, *section)?;
            let ingredient = items.get_mut(*item).ok_or(EditError::IngredientNotFound {
                section: *section,
                item: *item,
            })?;
            match field {
                IngredientField::Name => ingredient.name = value.clone(),
                IngredientField::Quantity => ingredient.quantity = coerce_decimal(value),
                IngredientField::Unit => ingredient.unit = value.clone(),
                IngredientField::UnitCost => ingredient.unit_cost = coerce_decimal(value),
            }
        }
        QuoteEdit::AddIngredient { section } => {
            ingredients_mut(&mut next, *section)?.push(Ingredient::default());
        }
        QuoteEdit::RemoveIngredient { section, item } => {
            let target = section_mut(&mut next, *section)?;
            remove_at(
                &mut target.ingredients,
                *item,
                EditError::IngredientNotFound { section: *section, item: *item },
            )?;
        }
        QuoteEdit::RenameSection { section, name } => {
            section_mut(&mut next, *section)?.name = name.clone();
        }
        QuoteEdit::RemoveSection { section } => {
            remove_at(&mut next.menu_sections, *section, EditError::SectionNotFound(*section))?;
        }
        QuoteEdit::UpdateLabor { index, field, value } => {
            let line = labor_mut(&mut next, *index)?;
            match field {
                LaborField::Role => line.role = value.clone(),
                LaborField::Count => line.count = coerce_decimal(value),
                LaborField::CostPerUnit => line.cost_per_unit = coerce_decimal(value),
            }
        }
        QuoteEdit::AddLabor => Arc::make_mut(&mut next.labor_lines).push(LaborLine::default()),
        QuoteEdit::RemoveLabor { index } => {
            remove_at(&mut next.labor_lines, *index, EditError::LaborNotFound(*index))?;
        }
        QuoteEdit::UpdateOtherCost { index, field, value } => {
            let cost = other_cost_mut(&mut next, *index)?;
            match field {
                OtherCostField::Name => cost.name = value.clone(),
                OtherCostField::Amount => cost.amount = coerce_decimal(value),
            }
        }
        QuoteEdit::AddOtherCost => Arc::make_mut(&mut next.other_costs).push(OtherCost::default()),
        QuoteEdit::RemoveOtherCost { index } => {
            remove_at(&mut next.other_costs, *index, EditError::OtherCostNotFound(*index))?;
        }
        QuoteEdit::UpdatePremise { index, field, value } => {
            edit_premises(&mut next, |premises| {
                let premise = premises.get_mut(*index).ok_or(EditError::PremiseNotFound(*index))?;
                match field {
                    PremiseField::Subject => premise.subject = value.clone(),
                    PremiseField::Quantity => premise.quantity_per_guest = coerce_decimal(value),
                    PremiseField::Unit => premise.unit = value.trim().to_string(),
                }
                Ok(())
            })?;
            cascade(&mut next, rules);
        }
        // Adicionar ou remover premissa só muda a lista; as quantidades ficam como estão
        QuoteEdit::AddPremise => {
            edit_premises(&mut next, |premises| {
                premises.push(ConsumptionPremise::placeholder());
                Ok(())
            })?;
        }
        QuoteEdit::RemovePremise { index } => {
            edit_premises(&mut next, |premises| {
                if *index >= premises.len() {
                    return Err(EditError::PremiseNotFound(*index));
                }
                premises.remove(*index);
                Ok(())
            })?;
        }
        QuoteEdit::SetEventLabel { value } => next.event_label = value.clone(),
        QuoteEdit::SetGuestCount { value } => {
            next.guest_count = coerce_count(value);
            cascade(&mut next, rules);
        }
        QuoteEdit::SetTaxRate { value } => next.tax_rate = coerce_decimal(value),
        QuoteEdit::SetEventDate { value } => next.event_date = *value,
        QuoteEdit::SetStatus { value } => next.status = *value,
        QuoteEdit::SetDeliveryStatus { value } => next.delivery_status = *value,
    }

    refresh_totals(&mut next, rules.classifier.as_ref());
    Ok(next)
}

/// Acrescenta ao fim do cardápio uma seção gerada pela IA.
pub fn append_section(quote: &Quote, section: MenuSection, classifier: &dyn StaffClassifier) -> Quote {
    let mut next = quote.clone();
    Arc::make_mut(&mut next.menu_sections).push(section);
    refresh_totals(&mut next, classifier);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recalc::{recompute_with, KeywordClassifier};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn dec(n: i64, scale: u32) -> Decimal {
        Decimal::new(n, scale)
    }

    fn quote() -> Quote {
        let mut quote = Quote::new("Casamento", 100);
        quote.menu_sections = Arc::new(vec![
            MenuSection::new(
                "Churrasco",
                vec![
                    Ingredient::new("Picanha", dec(40, 0), "kg", dec(90, 0)),
                    Ingredient::new("Fraldinha", dec(25, 0), "kg", dec(50, 0)),
                ],
            ),
            MenuSection::new("Saladas", vec![Ingredient::new("Alface", dec(10, 0), "unidade", dec(3, 0))]),
        ]);
        quote.labor_lines = Arc::new(vec![
            LaborLine::new("Cozinheira", dec(2, 0), dec(200, 0)),
            LaborLine::new("Garçom", dec(4, 0), dec(150, 0)),
        ]);
        quote.other_costs = Arc::new(vec![OtherCost::new("Frete", dec(250, 0))]);
        quote.consumption_premises = Arc::new(vec!["Carne: 0.4kg por pessoa".to_string()]);
        refresh_totals(&mut quote, &KeywordClassifier::default());
        quote
    }

    fn apply(quote: &Quote, edit: QuoteEdit) -> Result<Quote, EditError> {
        apply_edit(quote, &edit, &QuoteRules::default())
    }

    fn assert_totals_consistent(quote: &Quote) {
        let expected = recompute_with(
            &KeywordClassifier::default(),
            &quote.menu_sections,
            &quote.other_costs,
            &quote.labor_lines,
            quote.tax_rate,
        );
        assert_eq!(quote.totals, expected);
    }

    #[test]
    fn updating_a_quantity_recomputes_totals() {
        let original = quote();

        let next = apply(
            &original,
            QuoteEdit::UpdateIngredient {
                section: 1,
                item: 0,
                field: IngredientField::Quantity,
                value: "20".into(),
            },
        )
        .unwrap();

        assert_eq!(next.menu_sections[1].ingredients[0].line_cost(), dec(60, 0));
        assert_totals_consistent(&next);
        // Original intacto e seção não tocada compartilhada
        assert_eq!(original.menu_sections[1].ingredients[0].quantity, dec(10, 0));
        assert!(Arc::ptr_eq(&original.menu_sections[0].ingredients, &next.menu_sections[0].ingredients));
        assert!(Arc::ptr_eq(&original.labor_lines, &next.labor_lines));
    }

    #[test]
    fn invalid_numbers_become_zero() {
        let next = apply(
            &quote(),
            QuoteEdit::UpdateOtherCost { index: 0, field: OtherCostField::Amount, value: "abc".into() },
        )
        .unwrap();

        assert_eq!(next.other_costs[0].amount, Decimal::ZERO);
        assert_eq!(next.totals.other_costs_total, Decimal::ZERO);
    }

    #[test]
    fn renaming_a_waiter_to_cook_moves_production_cost() {
        let original = quote();

        let next = apply(
            &original,
            QuoteEdit::UpdateLabor { index: 1, field: LaborField::Role, value: "Cozinheiro".into() },
        )
        .unwrap();

        assert_eq!(next.totals.production_cost - original.totals.production_cost, dec(600, 0));
        assert_eq!(next.totals.labor_cost, original.totals.labor_cost);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let original = quote();

        assert_eq!(
            apply(&original, QuoteEdit::RemoveIngredient { section: 0, item: 9 }),
            Err(EditError::IngredientNotFound { section: 0, item: 9 })
        );
        assert_eq!(apply(&original, QuoteEdit::AddIngredient { section: 5 }), Err(EditError::SectionNotFound(5)));
        assert_eq!(apply(&original, QuoteEdit::RemoveLabor { index: 2 }), Err(EditError::LaborNotFound(2)));
        assert_eq!(apply(&original, QuoteEdit::RemovePremise { index: 1 }), Err(EditError::PremiseNotFound(1)));
    }

    #[test]
    fn added_rows_use_defaults() {
        let q = apply(&quote(), QuoteEdit::AddIngredient { section: 0 }).unwrap();
        let q = apply(&q, QuoteEdit::AddLabor).unwrap();
        let q = apply(&q, QuoteEdit::AddOtherCost).unwrap();

        assert_eq!(q.menu_sections[0].ingredients[2], Ingredient::default());
        assert_eq!(q.labor_lines.last(), Some(&LaborLine::new("Novo Profissional", Decimal::ONE, Decimal::ZERO)));
        assert_eq!(q.other_costs.last(), Some(&OtherCost::new("Novo Custo", Decimal::ZERO)));
        assert_totals_consistent(&q);
    }

    #[test]
    fn editing_a_premise_cascades_to_ingredients() {
        let next = apply(
            &quote(),
            QuoteEdit::UpdatePremise { index: 0, field: PremiseField::Quantity, value: "0,5".into() },
        )
        .unwrap();

        assert_eq!(next.consumption_premises.as_slice(), ["Carne: 0.5kg por pessoa".to_string()]);
        assert_eq!(next.menu_sections[0].ingredients[0].quantity, dec(50, 0));
        assert_eq!(next.menu_sections[0].ingredients[1].quantity, dec(50, 0));
        assert_totals_consistent(&next);
    }

    #[test]
    fn guest_count_change_reapplies_premises() {
        let next = apply(&quote(), QuoteEdit::SetGuestCount { value: "150".into() }).unwrap();

        assert_eq!(next.guest_count, 150);
        assert_eq!(next.menu_sections[0].ingredients[0].quantity, dec(60, 0));
        assert_eq!(next.menu_sections[1].ingredients[0].quantity, dec(10, 0));
    }

    #[test]
    fn added_premise_uses_the_placeholder() {
        let next = apply(&quote(), QuoteEdit::AddPremise).unwrap();

        assert_eq!(next.consumption_premises[1], "Novo Item: 100g por pessoa");
    }

    #[test]
    fn adding_a_premise_leaves_ingredients_alone() {
        let q = apply(&quote(), QuoteEdit::AddIngredient { section: 0 }).unwrap();
        let q = apply(
            &q,
            QuoteEdit::UpdateIngredient { section: 0, item: 2, field: IngredientField::UnitCost, value: "5".into() },
        )
        .unwrap();

        let next = apply(&q, QuoteEdit::AddPremise).unwrap();

        // O ingrediente novo se chama "Novo Item", como o placeholder da premissa
        let added = &next.menu_sections[0].ingredients[2];
        assert_eq!(added.quantity, Decimal::ONE);
        assert_eq!(added.unit, "unidade");
        assert_eq!(added.line_cost(), dec(5, 0));
        assert!(Arc::ptr_eq(&q.menu_sections, &next.menu_sections));
    }

    #[test]
    fn removing_a_premise_keeps_hand_edited_quantities() {
        let mut original = quote();
        original.consumption_premises = Arc::new(vec![
            "Carne: 0.4kg por pessoa".to_string(),
            "Alface: 0.1unidade por pessoa".to_string(),
        ]);
        let q = apply(
            &original,
            QuoteEdit::UpdateIngredient { section: 0, item: 0, field: IngredientField::Quantity, value: "12".into() },
        )
        .unwrap();

        let next = apply(&q, QuoteEdit::RemovePremise { index: 1 }).unwrap();

        assert_eq!(next.consumption_premises.as_slice(), ["Carne: 0.4kg por pessoa".to_string()]);
        assert_eq!(next.menu_sections[0].ingredients[0].quantity, dec(12, 0));
        assert_eq!(next.menu_sections[1].ingredients[0].quantity, dec(10, 0));
    }

    #[test]
    fn retyping_a_premise_quantity_keeps_its_unit() {
        let mut q = quote();
        for keystroke in ["", "0", "0.", "0.5"] {
            q = apply(
                &q,
                QuoteEdit::UpdatePremise { index: 0, field: PremiseField::Quantity, value: keystroke.into() },
            )
            .unwrap();
            assert_eq!(q.premises[0].unit, "kg");
        }

        assert_eq!(q.consumption_premises.as_slice(), ["Carne: 0.5kg por pessoa".to_string()]);
        assert_eq!(q.menu_sections[0].ingredients[0].quantity, dec(50, 0));
        assert_totals_consistent(&q);
    }

    #[test]
    fn retyping_a_premise_unit_keeps_its_quantity() {
        let mut q = quote();
        for keystroke in ["", "k", "kg"] {
            q = apply(&q, QuoteEdit::UpdatePremise { index: 0, field: PremiseField::Unit, value: keystroke.into() })
                .unwrap();
            assert_eq!(q.premises[0].quantity_per_guest, dec(4, 1));
        }

        assert_eq!(q.consumption_premises.as_slice(), ["Carne: 0.4kg por pessoa".to_string()]);
        assert_eq!(q.menu_sections[0].ingredients[0].unit, "kg");
        assert_eq!(q.menu_sections[0].ingredients[0].quantity, dec(40, 0));
    }

    #[test]
    fn tax_rate_edit_changes_tax_amount() {
        let next = apply(&quote(), QuoteEdit::SetTaxRate { value: "10".into() }).unwrap();

        assert_eq!(next.totals.tax_rate, dec(10, 0));
        assert_totals_consistent(&next);
    }

    #[test]
    fn appended_section_lands_at_the_end() {
        let section = MenuSection::new("Sobremesas", vec![Ingredient::new("Pudim", dec(5, 0), "unidade", dec(30, 0))]);

        let next = append_section(&quote(), section.clone(), &KeywordClassifier::default());

        assert_eq!(next.menu_sections.last(), Some(&section));
        assert_totals_consistent(&next);
    }

    #[test]
    fn edits_deserialize_from_tagged_json() {
        let edit: QuoteEdit = serde_json::from_value(json!({
            "op": "updateIngredient",
            "section": 0,
            "item": 1,
            "field": "unitCost",
            "value": "12,50"
        }))
        .unwrap();

        assert_eq!(
            edit,
            QuoteEdit::UpdateIngredient { section: 0, item: 1, field: IngredientField::UnitCost, value: "12,50".into() }
        );
        assert!(!edit.is_structural());
    }
}
