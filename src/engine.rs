// src/engine.rs

pub mod cascade;
pub mod recalc;

use std::sync::Arc;

use cascade::{AliasMatcher, PremiseMatcher};
use recalc::{KeywordClassifier, StaffClassifier};

/// Regras configuráveis do motor: quem é equipe de cozinha e quais
/// ingredientes cada premissa atinge.
#[derive(Clone)]
pub struct QuoteRules {
    pub classifier: Arc<dyn StaffClassifier>,
    pub matcher: Arc<dyn PremiseMatcher>,
}

impl QuoteRules {
    pub fn new(classifier: Arc<dyn StaffClassifier>, matcher: Arc<dyn PremiseMatcher>) -> Self {
        Self { classifier, matcher }
    }
}

impl Default for QuoteRules {
    fn default() -> Self {
        Self::new(Arc::new(KeywordClassifier::default()), Arc::new(AliasMatcher::meat_cuts()))
    }
}
