//! Sheetplan Planner: AI write plans
//!
//! Renders a prompt from the template context, asks an [`LlmClient`] for a
//! JSON reply and parses it strictly into a
//! [`WritePlan`](sheetplan_core::WritePlan).
//!
//! # Flow
//!
//! ```text
//! Job + Template + snapshot → prompt → LLM → schema check → WritePlan
//! ```

#[cfg(any(test, feature = "test-support"))]
mod canned;
mod error;
mod llm;
mod planner;
mod prompt;
mod schema;

#[cfg(any(test, feature = "test-support"))]
pub use canned::CannedLlmClient;
pub use error::PlannerError;
pub use llm::{LlmClient, LlmResponse, OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use planner::{LlmPlanner, Planner};
pub use prompt::{PromptRenderer, RenderedPrompt};
pub use schema::{parse_plan, strip_code_fence};
