//! Binary entrypoint for the sheetplan API server.
//!
//! Configuration comes from the environment; see `Settings`.

use anyhow::Context;
use sheetplan_api::{build_router, AppState, Metrics};
use sheetplan_core::{SharedAudit, TracingAuditSink};
use sheetplan_engine::{LedgerBackend, LogFormat, Orchestrator, QueueProcessor, Settings};
use sheetplan_ledger::{JobLedger, MemoryJobLedger};
use sheetplan_planner::{LlmPlanner, OpenAiClient};
use sheetplan_registry::TemplateRegistry;
use sheetplan_sheets::{GoogleSheetsApi, SnapshotCache, SpreadsheetClient};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    init_tracing(settings.log_format);

    let state = build_state(&settings).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(settings.addr)
        .await
        .with_context(|| format!("failed to bind to {}", settings.addr))?;
    tracing::info!(addr = %settings.addr, "sheetplan API listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sheetplan=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let audit: SharedAudit = Arc::new(TracingAuditSink);

    let templates = TemplateRegistry::load_dir(&settings.template_dir)
        .with_context(|| format!("loading templates from {}", settings.template_dir.display()))?;
    tracing::info!(count = templates.len(), ids = ?templates.ids(), "templates loaded");

    let api = GoogleSheetsApi::with_base_url(
        settings.sheets.base_url.clone(),
        settings.sheets.token.expose(),
    )?;
    let sheets = SpreadsheetClient::new(Arc::new(api), audit.clone())
        .with_cache(SnapshotCache::new(
            settings.sheets.cache_ttl,
            settings.sheets.cache_max_entries,
        ))
        .with_retry(settings.sheets.retry.clone());

    let llm = OpenAiClient::new(settings.llm.api_key.expose(), settings.llm.model.clone())?
        .with_base_url(settings.llm.base_url.clone());
    let planner = LlmPlanner::new(Arc::new(llm), audit.clone())?;

    let ledger = build_ledger(&settings.ledger).await?;
    tracing::info!(backend = ledger.backend_name(), "idempotency ledger ready");

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(templates),
        Arc::new(sheets),
        Arc::new(planner),
        ledger,
        audit.clone(),
    ));

    let mut state = AppState::new(orchestrator.clone(), settings.api_key.expose(), Metrics::new()?)
        .with_request_timeout(settings.request_timeout);
    if let Some(queue) = &settings.queue {
        tracing::info!(spreadsheet_id = %queue.spreadsheet_id, range = %queue.range, "queue endpoint enabled");
        state = state.with_queue(Arc::new(
            QueueProcessor::new(orchestrator, queue.spreadsheet_id.clone(), audit)
                .with_range(queue.range.clone()),
        ));
    }
    Ok(state)
}

async fn build_ledger(backend: &LedgerBackend) -> anyhow::Result<Arc<dyn JobLedger>> {
    match backend {
        LedgerBackend::Memory => Ok(Arc::new(MemoryJobLedger::new())),
        #[cfg(feature = "postgres")]
        LedgerBackend::Postgres { database_url } => {
            let ledger = sheetplan_ledger::PgJobLedger::connect(database_url.expose()).await?;
            ledger.migrate().await?;
            Ok(Arc::new(ledger))
        }
        #[cfg(not(feature = "postgres"))]
        LedgerBackend::Postgres { .. } => anyhow::bail!(
            "CONFIG/SHEETPLAN_IDEMPOTENCY_BACKEND=postgres needs a build with the `postgres` feature"
        ),
    }
}
