//! Router-level tests driven with `oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sheetplan_api::{build_router, AppState, Metrics};
use sheetplan_core::{MemoryAuditSink, SharedAudit, Template};
use sheetplan_engine::{Orchestrator, QueueProcessor};
use sheetplan_ledger::MemoryJobLedger;
use sheetplan_planner::{CannedLlmClient, LlmPlanner};
use sheetplan_registry::TemplateRegistry;
use sheetplan_sheets::{MemorySheetsApi, RecordingSleeper, SpreadsheetClient};
use std::sync::Arc;
use tower::ServiceExt;

const KEY: &str = "test-key";

struct TestApp {
    router: axum::Router,
    api: Arc<MemorySheetsApi>,
    llm: Arc<CannedLlmClient>,
}

fn app(with_queue: bool) -> TestApp {
    let api = Arc::new(MemorySheetsApi::new());
    let llm = Arc::new(CannedLlmClient::new());
    let audit: SharedAudit = Arc::new(MemoryAuditSink::new());

    let template = Template {
        template_id: "cotizacion_isodec_eps".to_string(),
        sheet_name: "EPS_100".to_string(),
        writes_allowlist: vec!["EPS_100!B6".to_string()],
        read_ranges: vec!["EPS_100!B6".to_string()],
        hints: Default::default(),
        description: None,
    };
    let sheets = SpreadsheetClient::new(api.clone(), audit.clone())
        .with_sleeper(Arc::new(RecordingSleeper::new()));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(TemplateRegistry::from_templates([template]).unwrap()),
        Arc::new(sheets),
        Arc::new(LlmPlanner::new(llm.clone(), audit.clone()).unwrap()),
        Arc::new(MemoryJobLedger::new()),
        audit.clone(),
    ));

    let mut state = AppState::new(orchestrator.clone(), KEY, Metrics::new().unwrap());
    if with_queue {
        state = state.with_queue(Arc::new(QueueProcessor::new(orchestrator, "control", audit)));
    }
    TestApp {
        router: build_router(state),
        api,
        llm,
    }
}

fn post(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn job(job_id: &str, dry_run: bool) -> Value {
    json!({
        "job_id": job_id,
        "template_id": "cotizacion_isodec_eps",
        "spreadsheet_id": "sheet-1",
        "payload": {"cliente": "Test"},
        "dry_run": dry_run
    })
}

fn plan(job_id: &str, range: &str) -> String {
    json!({
        "job_id": job_id,
        "version": "1.0.0",
        "writes": [{"range": range, "values": [["Test"]]}],
        "computed": {"panels_needed": 1, "supports": 2, "area_m2": 1.0, "fixing_points": 4},
        "notes": "filled"
    })
    .to_string()
}

#[tokio::test]
async fn test_healthz_needs_no_key() {
    let t = app(false);
    let (status, body) = send_json(&t.router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn test_fill_requires_api_key() {
    let t = app(false);

    let (missing, body) = send_json(&t.router, post("/v1/fill", None, job("J1", true))).await;
    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], json!("AUTH"));

    let (wrong, _) = send(&t.router, post("/v1/fill", Some("nope"), job("J1", true))).await;
    assert_eq!(wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(t.llm.call_count(), 0);
}

#[tokio::test]
async fn test_fill_dry_run_returns_plan() {
    let t = app(false);
    t.llm.reply(plan("J2", "EPS_100!B6"));

    let (status, body) = send_json(&t.router, post("/v1/fill", Some(KEY), job("J2", true))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job_id"], json!("J2"));
    assert_eq!(body["status"], json!("DONE"));
    assert_eq!(body["applied"], json!(false));
    assert_eq!(body["writes_count"], json!(1));
    assert_eq!(body["write_plan"]["writes"][0]["range"], json!("EPS_100!B6"));
    assert!(body.get("replayed").is_none());
    assert_eq!(t.api.update_count(), 0);
}

#[tokio::test]
async fn test_fill_rejection_is_422_with_range() {
    let t = app(false);
    t.llm.reply(plan("J3", "EPS_100!F3"));

    let (status, body) = send_json(&t.router, post("/v1/fill", Some(KEY), job("J3", true))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["job_id"], json!("J3"));
    assert_eq!(body["status"], json!("ERROR"));
    assert_eq!(body["applied"], json!(false));
    assert_eq!(body["rejected_range"], json!("EPS_100!F3"));
    assert!(!body["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_replay_and_conflict_statuses() {
    let t = app(false);
    t.llm.reply(plan("J4", "EPS_100!B6"));

    let (first, _) = send(&t.router, post("/v1/fill", Some(KEY), job("J4", false))).await;
    let (second, body) = send_json(&t.router, post("/v1/fill", Some(KEY), job("J4", false))).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body["applied"], json!(false));
    assert!(body["notes"].as_str().unwrap().contains("idempotent replay"));

    t.llm.reply("{}");
    let (_, _) = send(&t.router, post("/v1/fill", Some(KEY), job("J5", false))).await;
    let (conflict, body) = send_json(&t.router, post("/v1/fill", Some(KEY), job("J5", false))).await;
    assert_eq!(conflict, StatusCode::CONFLICT);
    assert_eq!(body["kind"], json!("CONFLICT"));
}

#[tokio::test]
async fn test_malformed_request_body_is_422() {
    let t = app(false);
    let (status, body) = send_json(
        &t.router,
        post("/v1/fill", Some(KEY), json!({"job_id": "J6"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"][0].as_str().unwrap().starts_with("REQUEST/"));
}

#[tokio::test]
async fn test_queue_limit_bounds() {
    let t = app(true);
    for limit in [0, 101] {
        let (status, _) = send(
            &t.router,
            post("/v1/queue/process", Some(KEY), json!({"limit": limit})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "limit {}", limit);
    }

    let (status, body) = send_json(
        &t.router,
        post("/v1/queue/process", Some(KEY), json!({"limit": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"processed": 0, "succeeded": 0, "failed": 0}));
}

#[tokio::test]
async fn test_queue_disabled_without_control_sheet() {
    let t = app(false);
    let (status, _) = send(
        &t.router,
        post("/v1/queue/process", Some(KEY), json!({"limit": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_count_fill_outcomes() {
    let t = app(false);
    t.llm.reply(plan("J7", "EPS_100!B6"));
    send(&t.router, post("/v1/fill", Some(KEY), job("J7", true))).await;

    let (status, bytes) = send(&t.router, get("/metrics")).await;
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("sheetplan_fill_total{outcome=\"dry_run\"} 1"));
}
