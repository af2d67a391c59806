//! REST endpoints for previewing and dispatching campaigns.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::campaign::resolver::{distinct_recipient_count, preview};
use crate::campaign::{AgentDefinition, Table, TableInput};
use crate::dispatch::{CampaignRun, Campaigns, DispatchRequest, DispatchSummary};
use crate::error::{DispatchError, TableError, ValidationIssue};
use crate::transport::SenderInput;

/// Build the Axum router for the campaign API.
pub fn campaign_routes(campaigns: Campaigns) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/campaigns/preview", post(preview_campaign))
        .route("/api/campaigns/send", post(send_campaign))
        .route("/api/campaigns/run", post(run_campaign))
        .layer(CorsLayer::permissive())
        .with_state(campaigns)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(campaigns): State<Campaigns>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "mailcast",
        "dryRun": campaigns.is_dry_run(),
    }))
}

// ── Preview ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanRequest {
    table: TableInput,
    #[serde(default)]
    agents: Vec<AgentDefinition>,
    email_column: String,
    #[serde(default)]
    name_column: Option<String>,
    #[serde(default)]
    from: Option<SenderInput>,
}

impl PlanRequest {
    /// Parse the body, build the table and check the configured columns exist.
    fn parse(body: &[u8]) -> Result<CampaignRun, (StatusCode, Json<Value>)> {
        let PlanRequest {
            table,
            agents,
            email_column,
            name_column,
            from,
        } = serde_json::from_slice::<PlanRequest>(body)
            .map_err(|e| malformed(vec![ValidationIssue::new("body", e.to_string())]))?;
        let table = Table::try_from(table).map_err(table_error)?;

        let email_column = email_column.trim().to_string();
        let name_column = name_column
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let mut issues = Vec::new();
        if email_column.is_empty() {
            issues.push(ValidationIssue::new("emailColumn", "Email column is required"));
        } else if !table.has_column(&email_column) {
            issues.push(ValidationIssue::new(
                "emailColumn",
                format!("Column \"{email_column}\" is not in the table"),
            ));
        }
        if let Some(name_column) = name_column.as_deref()
            && !table.has_column(name_column)
        {
            issues.push(ValidationIssue::new(
                "nameColumn",
                format!("Column \"{name_column}\" is not in the table"),
            ));
        }
        if !issues.is_empty() {
            return Err(malformed(issues));
        }

        Ok(CampaignRun {
            table,
            agents,
            email_column,
            name_column,
            from,
        })
    }
}

async fn preview_campaign(body: Bytes) -> impl IntoResponse {
    let run = match PlanRequest::parse(&body) {
        Ok(run) => run,
        Err(response) => return response,
    };

    let agents = preview(
        &run.agents,
        &run.table,
        &run.email_column,
        run.name_column.as_deref(),
    );
    let total_messages: usize = agents.iter().map(|a| a.recipients.len()).sum();
    let distinct = distinct_recipient_count(&run.agents, &run.table, &run.email_column);

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "agents": agents,
            "distinctRecipients": distinct,
            "totalMessages": total_messages,
        })),
    )
}

// ── Dispatch ────────────────────────────────────────────────────────────

async fn send_campaign(State(campaigns): State<Campaigns>, body: Bytes) -> impl IntoResponse {
    let request = match serde_json::from_slice::<Value>(&body)
        .map_err(|e| DispatchError::MalformedRequest {
            issues: vec![ValidationIssue::new("body", e.to_string())],
        })
        .and_then(DispatchRequest::from_json)
    {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    outcome_response(campaigns.send(request).await)
}

async fn run_campaign(State(campaigns): State<Campaigns>, body: Bytes) -> impl IntoResponse {
    match PlanRequest::parse(&body) {
        Ok(run) => outcome_response(campaigns.run(run).await),
        Err(response) => response,
    }
}

fn outcome_response(
    result: Result<DispatchSummary, DispatchError>,
) -> (StatusCode, Json<Value>) {
    match result {
        Ok(summary) => {
            info!(total = summary.total, dry_run = summary.dry_run, "Campaign dispatched");
            (
                StatusCode::OK,
                Json(json!({
                    "ok": true,
                    "message": summary.message(),
                    "summary": summary,
                })),
            )
        }
        Err(e) => error_response(e),
    }
}

/// One consolidated message per failure kind.
fn error_response(err: DispatchError) -> (StatusCode, Json<Value>) {
    warn!(error = %err, "Campaign request rejected");
    match err {
        DispatchError::MalformedRequest { issues } => malformed(issues),
        DispatchError::MissingSenderIdentity { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"ok": false, "message": err.to_string()})),
        ),
        DispatchError::SendFailure { .. } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"ok": false, "message": err.to_string()})),
        ),
        DispatchError::EmptyRecipientSet => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"ok": false, "message": err.to_string()})),
        ),
    }
}

fn malformed(issues: Vec<ValidationIssue>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "ok": false,
            "message": format!("Invalid campaign request ({} issue(s))", issues.len()),
            "issues": issues,
        })),
    )
}

fn table_error(err: TableError) -> (StatusCode, Json<Value>) {
    malformed(vec![ValidationIssue::new("table", err.to_string())])
}
