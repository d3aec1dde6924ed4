// src/engine/cascade.rs

use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;

use crate::models::{
    premise::ConsumptionPremise,
    quote::{Ingredient, MenuSection},
};

/// Decide se uma premissa atinge um ingrediente. Os dois nomes chegam em
/// minúsculas.
pub trait PremiseMatcher: Send + Sync {
    fn matches(&self, subject: &str, ingredient: &str) -> bool;
}

impl<F> PremiseMatcher for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn matches(&self, subject: &str, ingredient: &str) -> bool {
        self(subject, ingredient)
    }
}

// Cortes cobertos pela premissa genérica "Carne".
const MEAT_CUTS: &[&str] = &[
    "picanha",
    "fraldinha",
    "alcatra",
    "maminha",
    "costela",
    "cupim",
    "contra-filé",
    "contrafilé",
    "filé mignon",
    "linguiça",
];

// "Carnes" e "carne " usam a mesma chave que "carne".
fn alias_key(subject: &str) -> String {
    subject.trim().trim_end_matches('s').to_lowercase()
}

/// Substring sem diferenciar maiúsculas, mais apelidos por assunto.
#[derive(Debug, Clone, Default)]
pub struct AliasMatcher {
    aliases: HashMap<String, Vec<String>>,
}

impl AliasMatcher {
    /// Só substring, sem apelidos.
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_alias<I, S>(mut self, subject: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty());
        self.aliases.entry(alias_key(subject)).or_default().extend(names);
        self
    }

    /// "Carne" também cobre os cortes mais comuns de churrasco.
    pub fn meat_cuts() -> Self {
        Self::plain().with_alias("carne", MEAT_CUTS)
    }

    /// Formato `assunto=nome|nome;assunto=nome`, como em
    /// `carne=picanha|fraldinha;frango=coxa|sobrecoxa`.
    pub fn parse(raw: &str) -> Self {
        raw.split(';')
            .filter_map(|entry| entry.split_once('='))
            .filter(|(subject, _)| !subject.trim().is_empty())
            .fold(Self::plain(), |matcher, (subject, names)| {
                matcher.with_alias(subject, names.split('|'))
            })
    }

    pub fn aliases(&self, subject: &str) -> &[String] {
        self.aliases.get(&alias_key(subject)).map(Vec::as_slice).unwrap_or_default()
    }
}

impl PremiseMatcher for AliasMatcher {
    fn matches(&self, subject: &str, ingredient: &str) -> bool {
        ingredient.contains(subject)
            || self.aliases(subject).iter().any(|alias| ingredient.contains(alias.as_str()))
    }
}

/// Aplica as premissas de consumo às quantidades dos ingredientes.
///
/// Todo ingrediente atingido pela premissa (`matcher`) passa a ter
/// `quantidade = por convidado * convidados` e a unidade da premissa; o custo
/// unitário não muda. Uma premissa pode atingir vários ingredientes. Quando
/// duas premissas atingem o mesmo ingrediente vale a última da lista.
///
/// Seções sem nenhum ingrediente afetado são devolvidas com o mesmo `Arc`.
pub fn apply_premises(
    menu_sections: &[MenuSection],
    premises: &[ConsumptionPremise],
    guest_count: i32,
    matcher: &dyn PremiseMatcher,
) -> Vec<MenuSection> {
    let guests = Decimal::from(guest_count);
    let rules: Vec<(String, &ConsumptionPremise)> = premises
        .iter()
        .filter(|p| p.is_measured())
        .map(|p| (p.subject.to_lowercase(), p))
        .collect();

    menu_sections
        .iter()
        .map(|section| {
            let mut changed = false;
            let ingredients: Vec<Ingredient> = section
                .ingredients
                .iter()
                .map(|ingredient| {
                    let name = ingredient.name.to_lowercase();
                    let mut updated = ingredient.clone();
                    for (subject, premise) in &rules {
                        if matcher.matches(subject, &name) {
                            updated.quantity = premise.quantity_per_guest.saturating_mul(guests);
                            updated.unit = premise.unit.clone();
                            changed = true;
                        }
                    }
                    updated
                })
                .collect();

            if changed {
                MenuSection {
                    name: section.name.clone(),
                    ingredients: Arc::new(ingredients),
                }
            } else {
                section.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recalc::recompute;

    fn dec(n: i64, scale: u32) -> Decimal {
        Decimal::new(n, scale)
    }

    fn churrasco() -> Vec<MenuSection> {
        vec![
            MenuSection::new(
                "Churrasco",
                vec![
                    Ingredient::new("Picanha", dec(40, 0), "kg", dec(90, 0)),
                    Ingredient::new("Fraldinha", dec(25, 0), "kg", dec(50, 0)),
                ],
            ),
            MenuSection::new("Saladas", vec![Ingredient::new("Alface", dec(10, 0), "unidade", dec(3, 0))]),
        ]
    }

    #[test]
    fn one_premise_updates_every_matching_ingredient() {
        let premises = vec![ConsumptionPremise::parse("Carne: 0.5kg por pessoa")];

        let sections = apply_premises(&churrasco(), &premises, 100, &AliasMatcher::meat_cuts());

        for item in sections[0].ingredients.iter() {
            assert_eq!(item.quantity, dec(50, 0));
            assert_eq!(item.unit, "kg");
            assert_eq!(item.line_cost(), dec(50, 0) * item.unit_cost);
        }
        assert_eq!(sections[0].ingredients[0].unit_cost, dec(90, 0));
    }

    #[test]
    fn plain_substring_still_matches() {
        let sections = vec![MenuSection::new(
            "Pratos",
            vec![Ingredient::new("Carne de Sol", dec(5, 0), "kg", dec(60, 0))],
        )];
        let premises = vec![ConsumptionPremise::parse("carne: 0.3kg por pessoa")];

        let sections = apply_premises(&sections, &premises, 10, &AliasMatcher::plain());

        assert_eq!(sections[0].ingredients[0].quantity, dec(3, 0));
    }

    #[test]
    fn untouched_sections_are_shared() {
        let original = churrasco();
        let premises = vec![ConsumptionPremise::parse("Carne: 0.5kg por pessoa")];

        let sections = apply_premises(&original, &premises, 100, &AliasMatcher::meat_cuts());

        assert!(!Arc::ptr_eq(&original[0].ingredients, &sections[0].ingredients));
        assert!(Arc::ptr_eq(&original[1].ingredients, &sections[1].ingredients));
    }

    #[test]
    fn matching_ignores_case() {
        let premises = vec![ConsumptionPremise::parse("alface: 0,2unidade por pessoa")];

        let sections = apply_premises(&churrasco(), &premises, 50, &AliasMatcher::plain());

        assert_eq!(sections[1].ingredients[0].quantity, dec(10, 0));
        assert_eq!(sections[1].ingredients[0].unit, "unidade");
    }

    #[test]
    fn last_matching_premise_wins() {
        let premises = vec![
            ConsumptionPremise::parse("Carne: 0.5kg por pessoa"),
            ConsumptionPremise::parse("Picanha: 0.2kg por pessoa"),
        ];

        let sections = apply_premises(&churrasco(), &premises, 100, &AliasMatcher::meat_cuts());

        assert_eq!(sections[0].ingredients[0].quantity, dec(20, 0));
        assert_eq!(sections[0].ingredients[1].quantity, dec(50, 0));
    }

    #[test]
    fn labels_without_quantity_do_not_cascade() {
        let premises = vec![ConsumptionPremise::parse("Carne à vontade")];

        let sections = apply_premises(&churrasco(), &premises, 100, &AliasMatcher::meat_cuts());

        assert_eq!(sections[0].ingredients[0].quantity, dec(40, 0));
    }

    #[test]
    fn totals_follow_the_cascade() {
        let premises = vec![ConsumptionPremise::parse("Carne: 0.5kg por pessoa")];
        let sections = apply_premises(&churrasco(), &premises, 100, &AliasMatcher::meat_cuts());

        let totals = recompute(&sections, &[], &[], Decimal::ZERO);

        assert_eq!(totals.ingredients_cost, dec(50 * 90 + 50 * 50 + 10 * 3, 0));
    }

    #[test]
    fn plain_matcher_is_substring_only() {
        let premises = vec![ConsumptionPremise::parse("Carne: 0.5kg por pessoa")];

        let sections = apply_premises(&churrasco(), &premises, 100, &AliasMatcher::plain());

        assert_eq!(sections[0].ingredients[0].quantity, dec(40, 0));
        assert_eq!(sections[0].ingredients[1].quantity, dec(25, 0));
    }

    #[test]
    fn aliases_come_from_configuration() {
        let matcher = AliasMatcher::parse("folhas=alface|rúcula; =ignorado");

        assert!(matcher.matches("folhas", "alface americana"));
        assert!(!matcher.matches("carne", "picanha"));
        assert!(AliasMatcher::meat_cuts().matches("carnes", "picanha"));
        assert_eq!(matcher.aliases("folha"), ["alface".to_string(), "rúcula".to_string()]);
    }

    #[test]
    fn closures_can_match() {
        let exact = |subject: &str, ingredient: &str| subject == ingredient;
        let premises = vec![ConsumptionPremise::parse("Alface: 0.1unidade por pessoa")];

        let sections = apply_premises(&churrasco(), &premises, 100, &exact);

        assert_eq!(sections[1].ingredients[0].quantity, dec(10, 0));
        assert_eq!(sections[0].ingredients[0].quantity, dec(40, 0));
    }
}
