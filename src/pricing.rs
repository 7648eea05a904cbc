// Line item arithmetic and money formatting.

use crate::model::LineItem;

/// Price of a single row: unit price times quantity.
pub fn extended_price(item: &LineItem) -> u64 {
    item.unit_price.saturating_mul(u64::from(item.quantity_units))
}

pub fn total_amount(items: &[LineItem]) -> u64 {
    items
        .iter()
        .fold(0u64, |sum, item| sum.saturating_add(extended_price(item)))
}

/// Totals for the current item set, recomputed on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBreakdown {
    /// `(item id, extended price)` in item order
    pub extended: Vec<(String, u64)>,
    pub total_amount: u64,
}

pub fn price_items(items: &[LineItem]) -> PriceBreakdown {
    PriceBreakdown {
        extended: items
            .iter()
            .map(|item| (item.id.clone(), extended_price(item)))
            .collect(),
        total_amount: total_amount(items),
    }
}

// ============================================================================
// Input Coercion
// ============================================================================

/// Quantity text from the form; anything unusable becomes 1.
pub fn coerce_quantity(raw: &str) -> u32 {
    coerce_quantity_value(raw.trim().parse::<f64>().unwrap_or(f64::NAN))
}

pub fn coerce_quantity_value(value: f64) -> u32 {
    if value.is_finite() && value >= 1.0 {
        value.round().min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Price text from the form; anything unusable becomes 0.
pub fn coerce_price(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    coerce_price_value(cleaned.parse::<f64>().unwrap_or(f64::NAN))
}

pub fn coerce_price_value(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u64::MAX as f64) as u64
    } else {
        0
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Groups digits in threes: `29999` -> `"29,999"`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
