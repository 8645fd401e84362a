//! Price sanity and BOM quantity checks

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetplan_core::{ComputedQuantities, ValidationResult};

/// Unit prices outside this band are suspicious but not rejected.
pub const MIN_SANE_PRICE: f64 = 1.0;
pub const MAX_SANE_PRICE: f64 = 500.0;

pub fn validate_price(value: f64) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if !value.is_finite() {
        result.error(format!("PRICE/price must be a finite number, got {}", value));
    } else if value < 0.0 {
        result.error(format!("PRICE/negative price {}", value));
    } else if !(MIN_SANE_PRICE..=MAX_SANE_PRICE).contains(&value) {
        result.warn(format!(
            "PRICE/price {} outside the usual band [{}, {}]",
            value, MIN_SANE_PRICE, MAX_SANE_PRICE
        ));
    }
    result
}

/// One quoted line: a name and its (untrusted) quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl BomLine {
    pub fn new(name: impl Into<String>, quantity: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            quantity: Some(quantity.into()),
        }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
        }
    }
}

/// Fails on missing, non-numeric or non-positive quantities. Warns on
/// fractional ones: quantities are ceiling-rounded upstream, so a fraction
/// here means the rounding was skipped somewhere.
pub fn validate_bom_quantities(items: &[BomLine]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    for item in items {
        let quantity = match &item.quantity {
            None | Some(Value::Null) => {
                result.error(format!("BOM/'{}' has no quantity", item.name));
                continue;
            }
            Some(value) => value,
        };
        let Some(q) = quantity.as_f64() else {
            result.error(format!(
                "BOM/'{}' quantity is not numeric: {}",
                item.name, quantity
            ));
            continue;
        };
        if !q.is_finite() || q <= 0.0 {
            result.error(format!("BOM/'{}' quantity must be > 0, got {}", item.name, q));
        } else if q.fract().abs() > 1e-9 {
            result.warn(format!(
                "BOM/'{}' quantity {} is not an integer; expected a rounded-up value",
                item.name, q
            ));
        }
    }
    result.detail("lines_checked", items.len());
    result
}

/// Check the planner's `computed` block: counts follow the quantity law,
/// area must be a non-negative number.
pub fn validate_computed(computed: &ComputedQuantities) -> ValidationResult {
    let lines = [
        BomLine::new("panels_needed", computed.panels_needed),
        BomLine::new("supports", computed.supports),
        BomLine::new("fixing_points", computed.fixing_points),
    ];
    let mut result = validate_bom_quantities(&lines);
    if !computed.area_m2.is_finite() || computed.area_m2 < 0.0 {
        result.error(format!(
            "BOM/area_m2 must be a non-negative number, got {}",
            computed.area_m2
        ));
    }
    result
}
