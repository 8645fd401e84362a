//! Sheetplan Validators: Domain checks for panel quotations
//!
//! Span and dimension limits per panel family, bill-of-materials
//! arithmetic, and price/quantity sanity. Every check returns a
//! [`ValidationResult`](sheetplan_core::ValidationResult); none of them
//! talk to the network.
//!
//! # Example
//!
//! ```
//! use sheetplan_validators::validate_span;
//!
//! let result = validate_span("ISODEC_EPS", 100, 5.5, 0.0);
//! assert!(result.valid);
//! ```

pub mod bom;
pub mod catalog;
pub mod price;
pub mod span;

pub use bom::{compute_bom, Bom, BomInput, BomOutcome, Structure, Usage};
pub use catalog::PanelFamily;
pub use price::{validate_bom_quantities, validate_computed, validate_price, BomLine};
pub use span::{validate_dimensions, validate_span};
