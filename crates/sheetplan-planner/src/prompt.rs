//! Prompt rendering
//!
//! Handlebars templates compiled once per renderer. Values are not HTML
//! escaped: the output goes to a model, not a browser.

use crate::PlannerError;
use handlebars::Handlebars;
use serde_json::{json, Value};
use sheetplan_core::{Job, Template, ValueRange, SHEETPLAN_VERSION};

const SYSTEM_TEMPLATE: &str = include_str!("../prompts/system.hbs");
const USER_TEMPLATE: &str = include_str!("../prompts/user.hbs");

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, PlannerError> {
        Self::with_templates(SYSTEM_TEMPLATE, USER_TEMPLATE)
    }

    /// Custom system/user templates; they see the same data as the defaults.
    pub fn with_templates(system: &str, user: &str) -> Result<Self, PlannerError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string("system", system)
            .map_err(|e| PlannerError::Prompt(e.to_string()))?;
        handlebars
            .register_template_string("user", user)
            .map_err(|e| PlannerError::Prompt(e.to_string()))?;
        Ok(Self { handlebars })
    }

    pub fn render(
        &self,
        job: &Job,
        template: &Template,
        snapshot: &[ValueRange],
    ) -> Result<RenderedPrompt, PlannerError> {
        let data = prompt_data(job, template, snapshot);
        let render = |name: &str| {
            self.handlebars
                .render(name, &data)
                .map_err(|e| PlannerError::Prompt(e.to_string()))
        };
        Ok(RenderedPrompt {
            system: render("system")?,
            user: render("user")?,
        })
    }
}

fn prompt_data(job: &Job, template: &Template, snapshot: &[ValueRange]) -> Value {
    let snapshot_text = if snapshot.is_empty() {
        "(nothing read)".to_string()
    } else {
        snapshot
            .iter()
            .map(|r| format!("{} = {}", r.range, Value::from(r.values.clone())))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let payload = serde_json::to_string_pretty(&job.payload).unwrap_or_else(|_| "{}".to_string());

    json!({
        "job_id": job.job_id,
        "version": SHEETPLAN_VERSION,
        "template_id": template.template_id,
        "sheet_name": template.sheet_name,
        "description": template.description,
        "allowlist": template.writes_allowlist,
        "hints": template.hints,
        "snapshot": snapshot_text,
        "payload": payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn template() -> Template {
        Template {
            template_id: "cotizacion_isodec".to_string(),
            sheet_name: "EPS_100".to_string(),
            writes_allowlist: vec!["EPS_100!B7".to_string(), "EPS_100!C7".to_string()],
            read_ranges: vec!["EPS_100!F3".to_string()],
            hints: BTreeMap::from([("cliente".to_string(), "EPS_100!B7".to_string())]),
            description: None,
        }
    }

    fn job() -> Job {
        Job {
            job_id: "J1".to_string(),
            template_id: "cotizacion_isodec".to_string(),
            spreadsheet_id: "s1".to_string(),
            payload: json!({"cliente": "Obras & Co <SA>", "largo": 12}),
            dry_run: true,
        }
    }

    #[test]
    fn test_render_lists_allowlist_and_job() {
        let renderer = PromptRenderer::new().unwrap();
        let snapshot = vec![ValueRange {
            range: "EPS_100!F3".to_string(),
            values: vec![vec![json!("2024-05-01")]],
        }];
        let prompt = renderer.render(&job(), &template(), &snapshot).unwrap();

        assert!(prompt.system.contains("  - EPS_100!B7"));
        assert!(prompt.system.contains("  - EPS_100!C7"));
        assert!(prompt.system.contains("\"J1\""));
        assert!(prompt.user.contains("- cliente: EPS_100!B7"));
        assert!(prompt.user.contains("EPS_100!F3 = [[\"2024-05-01\"]]"));
    }

    #[test]
    fn test_payload_is_not_html_escaped() {
        let renderer = PromptRenderer::new().unwrap();
        let prompt = renderer.render(&job(), &template(), &[]).unwrap();
        assert!(prompt.user.contains("Obras & Co <SA>"));
        assert!(prompt.user.contains("(nothing read)"));
    }

    #[test]
    fn test_bad_template_is_rejected() {
        let err = PromptRenderer::with_templates("{{#each}}", "ok").err().unwrap();
        assert!(err.to_string().starts_with("PROMPT/"));
    }
}
