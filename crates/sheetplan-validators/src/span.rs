//! Span (autoportancia) and dimension checks

use crate::catalog;
use serde_json::json;
use sheetplan_core::ValidationResult;

pub const MIN_LENGTH_M: f64 = 0.5;
pub const MAX_LENGTH_M: f64 = 14.0;
pub const MIN_WIDTH_M: f64 = 0.1;
pub const MAX_WIDTH_M: f64 = 100.0;

/// Check that `span_m` can be bridged by `family` at `thickness_mm`.
///
/// Fails when the pair is unknown or the span exceeds the nominal maximum.
/// Warns when the span is within the nominal maximum but beyond the
/// margin-adjusted one. A failing span lists the same-family thicknesses
/// whose margin-adjusted span covers the request.
pub fn validate_span(
    family: &str,
    thickness_mm: u32,
    span_m: f64,
    safety_margin: f64,
) -> ValidationResult {
    let mut result = ValidationResult::ok();

    let Some(panel) = catalog::family(family) else {
        result.error(format!(
            "SPAN/unknown panel family '{}' (known: {})",
            family,
            catalog::family_names().join(", ")
        ));
        return result;
    };
    let Some(nominal) = panel.max_span(thickness_mm) else {
        result.error(format!(
            "SPAN/{} has no {} mm panel (available: {:?})",
            panel.name,
            thickness_mm,
            panel.thicknesses()
        ));
        return result;
    };
    if !(0.0..1.0).contains(&safety_margin) {
        result.error(format!(
            "SPAN/safety margin {} must be in [0, 1)",
            safety_margin
        ));
        return result;
    }
    if !span_m.is_finite() || span_m <= 0.0 {
        result.error(format!("SPAN/span must be a positive number, got {}", span_m));
        return result;
    }

    let max_safe = nominal * (1.0 - safety_margin);
    result
        .detail("family", panel.name.clone())
        .detail("thickness_mm", thickness_mm)
        .detail("span_m", span_m)
        .detail("nominal_span_m", nominal)
        .detail("max_safe_span_m", round3(max_safe))
        .detail("utilization", round3(span_m / nominal));

    if span_m > nominal {
        result.error(format!(
            "SPAN/span {} m exceeds the {} m maximum for {} {} mm",
            span_m, nominal, panel.name, thickness_mm
        ));

        let alternatives: Vec<_> = panel
            .spans
            .iter()
            .filter(|(_, max)| *max * (1.0 - safety_margin) >= span_m)
            .map(|(t, max)| json!({"thickness_mm": t, "max_span_m": max}))
            .collect();

        if alternatives.is_empty() {
            result.warn(format!(
                "SPAN/no {} thickness covers {} m; intermediate supports are required",
                panel.name, span_m
            ));
        } else {
            let names: Vec<String> = alternatives
                .iter()
                .map(|a| format!("{} mm", a["thickness_mm"]))
                .collect();
            result.warn(format!("SPAN/consider {}", names.join(", ")));
            result.detail("alternatives", alternatives);
        }
    } else if span_m > max_safe {
        result.warn(format!(
            "SPAN/span {} m is beyond the safe limit {:.3} m ({}% margin) for {} {} mm",
            span_m,
            max_safe,
            safety_margin * 100.0,
            panel.name,
            thickness_mm
        ));
    }

    result
}

/// Check length and width against the supported envelope.
pub fn validate_dimensions(length_m: f64, width_m: f64) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if !length_m.is_finite() || !(MIN_LENGTH_M..=MAX_LENGTH_M).contains(&length_m) {
        result.error(format!(
            "DIMENSIONS/length {} m outside [{}, {}]",
            length_m, MIN_LENGTH_M, MAX_LENGTH_M
        ));
    }
    if !width_m.is_finite() || !(MIN_WIDTH_M..=MAX_WIDTH_M).contains(&width_m) {
        result.error(format!(
            "DIMENSIONS/width {} m outside [{}, {}]",
            width_m, MIN_WIDTH_M, MAX_WIDTH_M
        ));
    }
    if result.valid {
        result.detail("area_m2", round3(length_m * width_m));
    }
    result
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_at_nominal_limit_is_valid() {
        let result = validate_span("ISODEC_EPS", 100, 5.5, 0.0);
        assert!(result.valid, "{}", result);
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_span_over_nominal_fails_with_alternatives() {
        let result = validate_span("ISODEC_EPS", 100, 5.51, 0.0);
        assert!(!result.valid);
        let alternatives = result.details["alternatives"].as_array().unwrap();
        let thicknesses: Vec<u64> = alternatives
            .iter()
            .map(|a| a["thickness_mm"].as_u64().unwrap())
            .collect();
        assert_eq!(thicknesses, vec![150, 200, 250]);
    }

    #[test]
    fn test_span_inside_margin_band_warns() {
        // max safe = 5.5 * 0.85 = 4.675
        let result = validate_span("ISODEC_EPS", 100, 5.0, 0.15);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.details["max_safe_span_m"], json!(4.675));
    }

    #[test]
    fn test_alternatives_respect_margin() {
        // 7.5 * 0.85 = 6.375 < 7.0, so 150 mm does not qualify
        let result = validate_span("ISODEC_EPS", 100, 7.0, 0.15);
        let alternatives = result.details["alternatives"].as_array().unwrap();
        assert_eq!(alternatives[0]["thickness_mm"], json!(200));
    }

    #[test]
    fn test_no_alternative_requires_supports() {
        let result = validate_span("ISOROOF_3G", 30, 6.0, 0.0);
        assert!(!result.valid);
        assert!(result.details.get("alternatives").is_none());
        assert!(result.warnings[0].contains("intermediate supports"));
    }

    #[test]
    fn test_unknown_family_and_thickness() {
        assert!(!validate_span("NOPE", 100, 1.0, 0.0).valid);
        let result = validate_span("ISODEC_EPS", 120, 1.0, 0.0);
        assert!(!result.valid);
        assert!(result.errors[0].contains("120"));
    }

    #[test]
    fn test_bad_margin_and_span() {
        assert!(!validate_span("ISODEC_EPS", 100, 1.0, 1.0).valid);
        assert!(!validate_span("ISODEC_EPS", 100, -1.0, 0.0).valid);
        assert!(!validate_span("ISODEC_EPS", 100, f64::NAN, 0.0).valid);
    }

    #[test]
    fn test_dimensions_bounds() {
        assert!(validate_dimensions(0.5, 0.1).valid);
        assert!(validate_dimensions(14.0, 100.0).valid);
        assert!(!validate_dimensions(0.49, 1.0).valid);
        assert!(!validate_dimensions(14.01, 1.0).valid);
        let both = validate_dimensions(20.0, 0.0);
        assert_eq!(both.errors.len(), 2);
    }

    #[test]
    fn test_dimensions_area_detail() {
        let result = validate_dimensions(12.0, 6.0);
        assert_eq!(result.details["area_m2"], json!(72.0));
    }
}
