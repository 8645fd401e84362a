//! Write-Plan Planner
//!
//! Turns (template, snapshot, payload) into a [`WritePlan`]. Never touches
//! the spreadsheet. Any failure is fatal for the attempt: there is no
//! partial plan.

use crate::{parse_plan, LlmClient, PlannerError, PromptRenderer};
use async_trait::async_trait;
use sheetplan_core::{AuditEvent, Job, Severity, SharedAudit, Template, ValueRange, WritePlan};
use std::sync::Arc;
use std::time::Instant;

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        job: &Job,
        template: &Template,
        snapshot: &[ValueRange],
    ) -> Result<WritePlan, PlannerError>;
}

pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    prompts: PromptRenderer,
    audit: SharedAudit,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, audit: SharedAudit) -> Result<Self, PlannerError> {
        Ok(Self {
            llm,
            prompts: PromptRenderer::new()?,
            audit,
        })
    }

    pub fn with_prompts(mut self, prompts: PromptRenderer) -> Self {
        self.prompts = prompts;
        self
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(
        &self,
        job: &Job,
        template: &Template,
        snapshot: &[ValueRange],
    ) -> Result<WritePlan, PlannerError> {
        let prompt = self.prompts.render(job, template, snapshot)?;
        let start = Instant::now();
        let response = self.llm.chat_json(&prompt.system, &prompt.user).await;

        let (result, prompt_tokens, completion_tokens) = match response {
            Ok(r) => (
                parse_plan(&r.content, &job.job_id),
                r.prompt_tokens,
                r.completion_tokens,
            ),
            Err(err) => (Err(err), None, None),
        };

        let mut event = AuditEvent::new("planner.plan")
            .with_job(&job.job_id)
            .with_template(&template.template_id)
            .with_spreadsheet(&job.spreadsheet_id)
            .with_data("provider", self.llm.provider_name())
            .with_data("model", self.llm.model_name())
            .with_data("prompt_tokens", prompt_tokens)
            .with_data("completion_tokens", completion_tokens)
            .since(start);

        match &result {
            Ok(plan) => {
                tracing::debug!(
                    job_id = %job.job_id,
                    writes = plan.writes.len(),
                    latency_ms = event.elapsed_ms,
                    "plan received"
                );
                event = event
                    .with_data("outcome", "ok")
                    .with_data("writes", plan.writes.len());
            }
            Err(err) => {
                tracing::warn!(job_id = %job.job_id, error = %err, "planning failed");
                event = event
                    .with_severity(Severity::Error)
                    .with_data("outcome", "error")
                    .with_data("error", err.to_string());
            }
        }
        self.audit.emit(event);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CannedLlmClient;
    use serde_json::json;
    use sheetplan_core::MemoryAuditSink;

    fn template() -> Template {
        Template {
            template_id: "cotizacion_isodec".to_string(),
            sheet_name: "EPS_100".to_string(),
            writes_allowlist: vec!["EPS_100!B7".to_string()],
            read_ranges: vec![],
            hints: Default::default(),
            description: None,
        }
    }

    fn job() -> Job {
        Job {
            job_id: "J1".to_string(),
            template_id: "cotizacion_isodec".to_string(),
            spreadsheet_id: "s1".to_string(),
            payload: json!({"cliente": "ACME"}),
            dry_run: false,
        }
    }

    fn reply() -> String {
        json!({
            "job_id": "J1",
            "version": "1.0.0",
            "writes": [{"range": "EPS_100!B7", "values": [["ACME"]]}],
            "computed": {"panels_needed": 1, "supports": 2, "area_m2": 1.0, "fixing_points": 4},
            "notes": ""
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_plan_records_usage() {
        let llm = Arc::new(CannedLlmClient::new());
        llm.reply_with_usage(reply(), 300, 80);
        let audit = Arc::new(MemoryAuditSink::new());
        let planner = LlmPlanner::new(llm.clone(), audit.clone()).unwrap();

        let plan = planner.plan(&job(), &template(), &[]).await.unwrap();
        assert_eq!(plan.writes[0].range, "EPS_100!B7");
        assert_eq!(llm.call_count(), 1);
        assert!(llm.calls()[0].1.contains("ACME"));

        let events = audit.entries();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "planner.plan");
        assert_eq!(events[0].data["model"], json!("canned"));
        assert_eq!(events[0].data["prompt_tokens"], json!(300));
        assert_eq!(events[0].data["outcome"], json!("ok"));
    }

    #[tokio::test]
    async fn test_llm_failure_is_fatal() {
        let llm = Arc::new(CannedLlmClient::new());
        llm.fail(PlannerError::Status {
            status: 500,
            body: "boom".to_string(),
        });
        let audit = Arc::new(MemoryAuditSink::new());
        let planner = LlmPlanner::new(llm, audit.clone()).unwrap();

        let err = planner.plan(&job(), &template(), &[]).await.unwrap_err();
        assert!(matches!(err, PlannerError::Status { status: 500, .. }));
        assert_eq!(audit.entries()[0].severity, Severity::Error);
        assert_eq!(audit.entries()[0].data["prompt_tokens"], json!(null));
    }

    #[tokio::test]
    async fn test_garbage_reply_is_schema_error() {
        let llm = Arc::new(CannedLlmClient::new().with_reply("{\"job_id\": \"J1\"}"));
        let planner = LlmPlanner::new(llm, Arc::new(MemoryAuditSink::new())).unwrap();
        let err = planner.plan(&job(), &template(), &[]).await.unwrap_err();
        assert!(matches!(err, PlannerError::Schema(_)));
    }
}
