//! Domain checks on a proposed plan
//!
//! Only jobs whose payload describes a panel section (`family`,
//! `thickness_mm`, `length_m`, `width_m`, optionally `span_m` and
//! `safety_margin`) are checked. For those, `plan.computed` goes through the
//! BOM quantity law, the span and dimension validators run, and the
//! planner's panel count is compared with the catalog's. A plain data entry
//! job (customer name, dates) carries no quantities to check.

use serde::Deserialize;
use serde_json::Value;
use sheetplan_core::{Job, ValidationResult, WritePlan};
use sheetplan_validators::{bom, catalog, validate_computed, validate_dimensions, validate_span};

#[derive(Debug, Clone, Deserialize)]
struct PanelGeometry {
    family: String,
    thickness_mm: u32,
    length_m: f64,
    width_m: f64,
    #[serde(default)]
    span_m: Option<f64>,
    #[serde(default)]
    safety_margin: f64,
}

impl PanelGeometry {
    /// `Ok(None)` when the payload says nothing about panels.
    fn from_payload(payload: &Value) -> Result<Option<Self>, String> {
        if payload.get("family").is_none() {
            return Ok(None);
        }
        serde_json::from_value(payload.clone())
            .map(Some)
            .map_err(|e| format!("DOMAIN/payload panel geometry is incomplete: {}", e))
    }
}

pub fn check_plan(job: &Job, plan: &WritePlan) -> ValidationResult {
    let geometry = match PanelGeometry::from_payload(&job.payload) {
        Ok(Some(geometry)) => geometry,
        Ok(None) => return ValidationResult::ok(),
        Err(message) => {
            let mut result = ValidationResult::ok();
            result.error(message);
            return result;
        }
    };

    let mut result = validate_computed(&plan.computed);
    result = result.merge(validate_dimensions(geometry.length_m, geometry.width_m));
    if let Some(span_m) = geometry.span_m {
        result = result.merge(validate_span(
            &geometry.family,
            geometry.thickness_mm,
            span_m,
            geometry.safety_margin,
        ));
    }

    if let Some(useful_width) = catalog::useful_width(&geometry.family) {
        let expected = bom::panels_needed(geometry.width_m, useful_width);
        if (plan.computed.panels_needed - expected as f64).abs() > 1e-9 {
            result.warn(format!(
                "DOMAIN/plan quotes {} panels, {} needs {} for {} m",
                plan.computed.panels_needed, geometry.family, expected, geometry.width_m
            ));
        }
    }

    result
}
