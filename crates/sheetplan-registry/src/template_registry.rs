//! Template Registry
//!
//! Loaded once at startup from a directory of `*.json` files, one
//! [`Template`] per file, and read-only afterwards.

use sheetplan_core::{ErrorKind, Template};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("TEMPLATE/cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TEMPLATE/{path} is not a valid template: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("TEMPLATE/template '{template_id}' is invalid: {detail}")]
    Invalid { template_id: String, detail: String },

    #[error("TEMPLATE/duplicate template id '{0}'")]
    Duplicate(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Arc<Template>>,
}

impl TemplateRegistry {
    pub fn from_templates(
        templates: impl IntoIterator<Item = Template>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for template in templates {
            registry.insert(template)?;
        }
        Ok(registry)
    }

    /// Load every `*.json` file in `dir`, in file-name order.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let dir = dir.as_ref();
        let io = |source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io)? {
            let path = entry.map_err(io)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut registry = Self::default();
        for path in paths {
            let template = Self::load_file(&path)?;
            tracing::debug!(template_id = %template.template_id, path = %path.display(), "template loaded");
            registry.insert(template)?;
        }
        tracing::info!(dir = %dir.display(), templates = registry.len(), "template registry ready");
        Ok(registry)
    }

    fn load_file(path: &Path) -> Result<Template, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| RegistryError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    fn insert(&mut self, template: Template) -> Result<(), RegistryError> {
        validate(&template)?;
        if self.templates.contains_key(&template.template_id) {
            return Err(RegistryError::Duplicate(template.template_id));
        }
        self.templates
            .insert(template.template_id.clone(), Arc::new(template));
        Ok(())
    }

    pub fn get(&self, template_id: &str) -> Option<Arc<Template>> {
        self.templates.get(template_id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn validate(template: &Template) -> Result<(), RegistryError> {
    let invalid = |detail: &str| RegistryError::Invalid {
        template_id: template.template_id.clone(),
        detail: detail.to_string(),
    };
    if template.template_id.trim().is_empty() {
        return Err(invalid("empty template_id"));
    }
    if template.sheet_name.trim().is_empty() {
        return Err(invalid("empty sheet_name"));
    }
    if template.writes_allowlist.is_empty() {
        return Err(invalid("writes_allowlist is empty"));
    }
    if template.writes_allowlist.iter().any(|a| a.trim().is_empty()) {
        return Err(invalid("writes_allowlist contains an empty address"));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = template.writes_allowlist.iter().find(|a| !seen.insert(a.as_str())) {
        return Err(RegistryError::Invalid {
            template_id: template.template_id.clone(),
            detail: format!("writes_allowlist lists '{}' twice", dup),
        });
    }
    Ok(())
}
