//! Bill-of-materials arithmetic
//!
//! All quantities are integers rounded up. A fractional panel or bolt is
//! never quoted.

use crate::{catalog, span};
use serde::{Deserialize, Serialize};
use sheetplan_core::ValidationResult;

/// Rounding noise tolerated above an integer, in units of the value's ULP.
const CEIL_NOISE_ULPS: f64 = 16.0;

/// Ceiling for quantities; non-positive or non-finite input yields 0.
///
/// A value within `16 * f64::EPSILON * |x|` above an integer counts as that
/// integer (`5.6 / 1.12` is 5 panels, not 6). Anything further above,
/// however small, rounds up.
pub fn ceil_qty(x: f64) -> u64 {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    let noise = x * f64::EPSILON * CEIL_NOISE_ULPS;
    (x - noise).ceil().max(0.0) as u64
}

pub fn panels_needed(width_m: f64, useful_width_m: f64) -> u64 {
    if useful_width_m <= 0.0 {
        return 0;
    }
    ceil_qty(width_m / useful_width_m)
}

/// Support lines along the length, never fewer than two.
pub fn supports(length_m: f64, span_m: f64) -> u64 {
    if span_m <= 0.0 {
        return 2;
    }
    ceil_qty(length_m / span_m + 1.0).max(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    Roof,
    Wall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    Metal,
    Wood,
    Concrete,
}

pub fn fixing_points(panels: u64, supports: u64, length_m: f64, usage: Usage) -> u64 {
    let mut points = (panels * supports * 2) as f64;
    if usage == Usage::Roof {
        points += length_m * 2.0 / 2.5;
    }
    ceil_qty(points)
}

pub fn rods(fixing_points: u64) -> u64 {
    fixing_points.div_ceil(4)
}

pub fn nuts(fixing_points: u64, structure: Structure) -> u64 {
    match structure {
        Structure::Metal => fixing_points * 2,
        Structure::Wood | Structure::Concrete => fixing_points,
    }
}

/// One roof or wall section to quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomInput {
    pub family: String,
    pub thickness_mm: u32,
    pub length_m: f64,
    pub width_m: f64,
    pub usage: Usage,
    pub structure: Structure,
    #[serde(default)]
    pub safety_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bom {
    pub panels: u64,
    pub supports: u64,
    pub fixing_points: u64,
    pub rods: u64,
    pub nuts: u64,
    pub area_m2: f64,
    /// Support spacing used for the support count
    pub span_m: f64,
}

impl Bom {
    /// Quantities as `(name, quantity)` lines for [`crate::validate_bom_quantities`].
    pub fn lines(&self) -> Vec<crate::BomLine> {
        [
            ("panels", self.panels),
            ("supports", self.supports),
            ("fixing_points", self.fixing_points),
            ("rods", self.rods),
            ("nuts", self.nuts),
        ]
        .into_iter()
        .map(|(name, qty)| crate::BomLine::new(name, qty))
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BomOutcome {
    /// Present only when validation passed
    pub bom: Option<Bom>,
    pub validation: ValidationResult,
}

/// Validate the section and derive its quantities.
///
/// Supports are spaced at the margin-adjusted maximum span of the chosen
/// panel, so a section longer than one span gets intermediate supports.
pub fn compute_bom(input: &BomInput) -> BomOutcome {
    let mut validation = span::validate_dimensions(input.length_m, input.width_m);

    let Some(panel) = catalog::family(&input.family) else {
        validation.error(format!("BOM/unknown panel family '{}'", input.family));
        return BomOutcome { bom: None, validation };
    };
    let Some(nominal) = panel.max_span(input.thickness_mm) else {
        validation.error(format!(
            "BOM/{} has no {} mm panel",
            panel.name, input.thickness_mm
        ));
        return BomOutcome { bom: None, validation };
    };
    if !(0.0..1.0).contains(&input.safety_margin) {
        validation.error(format!(
            "BOM/safety margin {} must be in [0, 1)",
            input.safety_margin
        ));
    }
    if !validation.valid {
        return BomOutcome { bom: None, validation };
    }

    let span_m = nominal * (1.0 - input.safety_margin);
    let panels = panels_needed(input.width_m, panel.useful_width_m);
    let supports = supports(input.length_m, span_m);
    let fixing_points = fixing_points(panels, supports, input.length_m, input.usage);

    let bom = Bom {
        panels,
        supports,
        fixing_points,
        rods: rods(fixing_points),
        nuts: nuts(fixing_points, input.structure),
        area_m2: input.length_m * input.width_m,
        span_m,
    };

    validation = validation.merge(crate::validate_bom_quantities(&bom.lines()));
    validation
        .detail("panels_needed", bom.panels)
        .detail("supports", bom.supports)
        .detail("fixing_points", bom.fixing_points);

    BomOutcome {
        bom: Some(bom),
        validation,
    }
}
