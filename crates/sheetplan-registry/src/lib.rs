//! Sheetplan Registry: Templates by id
pub mod template_registry;

pub use template_registry::{RegistryError, TemplateRegistry};
