// src/common/numeric.rs

use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Converte o texto digitado num campo numérico em `Decimal`.
///
/// Aceita vírgula como separador decimal ("1,5"). Qualquer coisa que não seja
/// um número vira zero: o motor de cálculo nunca recebe entrada inválida.
pub fn coerce_decimal(raw: &str) -> Decimal {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return Decimal::ZERO;
    }

    if let Ok(value) = Decimal::from_str(normalized.trim_end_matches('.')) {
        return value;
    }

    // Notação científica ("1e3") e afins
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ZERO)
}

/// Mesma regra de `coerce_decimal`, truncando para um inteiro (número de convidados).
pub fn coerce_count(raw: &str) -> i32 {
    let value = coerce_decimal(raw).trunc();
    value
        .to_i32()
        .unwrap_or(if value.is_sign_negative() { i32::MIN } else { i32::MAX })
}

/// Arredondamento monetário: duas casas, metade para longe do zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// "R$ 1234.50"
pub fn format_money(value: Decimal) -> String {
    format!("R$ {:.2}", round_money(value))
}

/// Quantidade com no máximo duas casas e sem zeros à direita ("0.5", "100").
pub fn format_quantity(value: Decimal) -> String {
    round_money(value).normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn coerces_plain_and_comma_decimals() {
        assert_eq!(coerce_decimal("12"), Decimal::new(12, 0));
        assert_eq!(coerce_decimal(" 1,5 "), Decimal::new(15, 1));
        assert_eq!(coerce_decimal("0.25"), Decimal::new(25, 2));
        assert_eq!(coerce_decimal("-3"), Decimal::new(-3, 0));
    }

    #[test]
    fn non_numeric_input_becomes_zero() {
        assert_eq!(coerce_decimal(""), Decimal::ZERO);
        assert_eq!(coerce_decimal("abc"), Decimal::ZERO);
        assert_eq!(coerce_decimal("NaN"), Decimal::ZERO);
    }

    #[test]
    fn counts_are_truncated() {
        assert_eq!(coerce_count("150"), 150);
        assert_eq!(coerce_count("12,9"), 12);
        assert_eq!(coerce_count("x"), 0);
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(format_money(Decimal::new(1005, 3)), "R$ 1.01");
        assert_eq!(format_money(Decimal::new(216, 1)), "R$ 21.60");
    }

    #[test]
    fn quantities_drop_trailing_zeros() {
        assert_eq!(format_quantity(Decimal::new(50, 2)), "0.5");
        assert_eq!(format_quantity(Decimal::new(10000, 2)), "100");
        assert_eq!(format_quantity(Decimal::new(1234, 3)), "1.23");
    }
}
