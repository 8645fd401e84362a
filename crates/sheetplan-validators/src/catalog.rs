//! Panel knowledge table
//!
//! Family → thickness → maximum unsupported span, and family → useful width.
//! Values are the manufacturer's nominal figures in metres.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One panel family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelFamily {
    /// Catalog name (ex: "ISODEC_EPS")
    pub name: String,
    /// Width each panel covers once overlapped, in metres
    pub useful_width_m: f64,
    /// Thickness (mm) → nominal maximum span (m)
    pub spans: BTreeMap<u32, f64>,
}

impl PanelFamily {
    fn new(name: &str, useful_width_m: f64, spans: &[(u32, f64)]) -> Self {
        Self {
            name: name.to_string(),
            useful_width_m,
            spans: spans.iter().copied().collect(),
        }
    }

    pub fn max_span(&self, thickness_mm: u32) -> Option<f64> {
        self.spans.get(&thickness_mm).copied()
    }

    pub fn thicknesses(&self) -> Vec<u32> {
        self.spans.keys().copied().collect()
    }
}

static CATALOG: Lazy<BTreeMap<String, PanelFamily>> = Lazy::new(|| {
    [
        PanelFamily::new(
            "ISODEC_EPS",
            1.12,
            &[(100, 5.5), (150, 7.5), (200, 9.1), (250, 10.4)],
        ),
        PanelFamily::new("ISODEC_PIR", 1.12, &[(50, 3.5), (80, 5.5), (120, 7.6)]),
        PanelFamily::new("ISOROOF_3G", 1.0, &[(30, 2.8), (50, 3.3), (80, 4.0)]),
        PanelFamily::new(
            "ISOPANEL_EPS",
            1.14,
            &[(50, 3.0), (100, 5.5), (150, 7.5), (200, 9.1), (250, 10.4)],
        ),
        PanelFamily::new("ISOWALL_PIR", 1.1, &[(50, 3.5), (80, 5.5), (100, 6.5)]),
    ]
    .into_iter()
    .map(|family| (family.name.clone(), family))
    .collect()
});

/// Look up a family by name, case-insensitively.
pub fn family(name: &str) -> Option<&'static PanelFamily> {
    CATALOG.get(&name.trim().to_ascii_uppercase())
}

pub fn family_names() -> Vec<&'static str> {
    CATALOG.keys().map(String::as_str).collect()
}

pub fn useful_width(name: &str) -> Option<f64> {
    family(name).map(|f| f.useful_width_m)
}
