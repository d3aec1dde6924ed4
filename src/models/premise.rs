// src/models/premise.rs

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::numeric::format_quantity;

// "Carne: 550g por pessoa", "Água: 1,5L/pessoa"
// Captura: (Item): (Quantidade) (Unidade) (por pessoa | /pessoa)
static PREMISE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(.+):\s*([0-9]+[.,]?[0-9]*)\s*([a-zA-Z]+)\s*(?:por pessoa|/pessoa)")
        .expect("padrão de premissa inválido")
});

/// Premissa de consumo por convidado, na forma estruturada.
///
/// As strings guardadas no orçamento continuam sendo a fonte da verdade; esta
/// estrutura é reconstruída a partir delas e serializada de volta a cada
/// alteração. Strings que não seguem o padrão viram um rótulo com quantidade
/// zero e unidade vazia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionPremise {
    #[schema(example = "Carne")]
    pub subject: String,
    #[schema(value_type = f64, example = 0.5)]
    pub quantity_per_guest: Decimal,
    #[schema(example = "kg")]
    pub unit: String,
}

impl ConsumptionPremise {
    pub fn new(subject: impl Into<String>, quantity_per_guest: Decimal, unit: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            quantity_per_guest,
            unit: unit.into(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        let parsed = PREMISE_PATTERN.captures(raw).and_then(|caps| {
            let quantity = caps[2].replace(',', ".");
            let quantity = Decimal::from_str(quantity.trim_end_matches('.')).ok()?;
            Some(Self::new(caps[1].trim(), quantity, caps[3].trim()))
        });

        parsed.unwrap_or_else(|| Self::label(raw))
    }

    /// Premissa degenerada: só o texto, sem quantidade.
    pub fn label(raw: &str) -> Self {
        Self::new(raw, Decimal::ZERO, "")
    }

    /// Só premissas com quantidade e unidade viram texto estruturado e
    /// participam do recálculo das quantidades.
    pub fn is_measured(&self) -> bool {
        self.quantity_per_guest > Decimal::ZERO && !self.unit.is_empty()
    }

    /// Nova premissa criada pelo botão "adicionar".
    pub fn placeholder() -> Self {
        Self::new("Novo Item", Decimal::new(100, 0), "g")
    }
}

impl fmt::Display for ConsumptionPremise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_measured() {
            write!(
                f,
                "{}: {}{} por pessoa",
                self.subject,
                format_quantity(self.quantity_per_guest),
                self.unit
            )
        } else {
            f.write_str(&self.subject)
        }
    }
}

pub fn parse_premises(raw: &[String]) -> Vec<ConsumptionPremise> {
    raw.iter().map(|s| ConsumptionPremise::parse(s)).collect()
}

/// Rótulos vazios são descartados na serialização.
pub fn serialize_premises(premises: &[ConsumptionPremise]) -> Vec<String> {
    premises
        .iter()
        .map(ToString::to_string)
        .filter(|s| !s.trim().is_empty())
        .collect()
}
