//! HTTP surface for the generation engine.
//!
//! Exposes the four boundary operations as JSON endpoints for the board UI,
//! and runs the scheduled sweep on a fixed interval while serving.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::clock::Clock;
use crate::config::{Config, EngineConfig};
use crate::db::Database;
use crate::error::{EngineError, ErrorCode};
use crate::types::RuleScope;

/// Server state shared across handlers.
#[derive(Clone)]
pub struct EngineServer {
    db: Database,
    engine_config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl EngineServer {
    pub fn new(db: Database, engine_config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            engine_config,
            clock,
        }
    }
}

/// JSON error body mirroring [`EngineError`].
struct ApiError(EngineError);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(EngineError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            ErrorCode::InvalidDate | ErrorCode::InvalidRange => StatusCode::BAD_REQUEST,
            ErrorCode::NoAssignableOwner => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::TemplateNotFound
            | ErrorCode::EventNotFound
            | ErrorCode::InstanceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(self.0)).into_response()
    }
}

/// Request body for the range-driven generators.
#[derive(Debug, Deserialize)]
struct RangeRequest {
    start_date: String,
    end_date: String,
    /// Resolved caller scope; `None` means all rules.
    assignee_id: Option<String>,
}

impl RangeRequest {
    fn scope(&self) -> RuleScope {
        RuleScope {
            assignee_id: self.assignee_id.clone(),
        }
    }
}

/// Request body for per-event anchor generation.
#[derive(Debug, Default, Deserialize)]
struct AnchorRequest {
    actor_id: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn generate_daily(
    State(state): State<EngineServer>,
    Json(req): Json<RangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.db.generate_daily_instances(
        &req.scope(),
        &req.start_date,
        &req.end_date,
        &state.engine_config,
    )?;
    Ok(Json(result))
}

async fn generate_weekly(
    State(state): State<EngineServer>,
    Json(req): Json<RangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.db.generate_weekly_instances(
        &req.scope(),
        &req.start_date,
        &req.end_date,
        &state.engine_config,
    )?;
    Ok(Json(result))
}

async fn ensure_event_tasks(
    State(state): State<EngineServer>,
    Path(event_id): Path<String>,
    Json(req): Json<AnchorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result =
        state
            .db
            .ensure_anchor_tasks(state.clock.as_ref(), &event_id, req.actor_id.as_deref())?;
    Ok(Json(result))
}

async fn sweep(State(state): State<EngineServer>) -> Result<impl IntoResponse, ApiError> {
    let result = state.db.sweep_due_events(state.clock.as_ref())?;
    Ok(Json(result))
}

/// Build the API router.
pub fn router(state: EngineServer) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/generate/daily", post(generate_daily))
        .route("/api/generate/weekly", post(generate_weekly))
        .route("/api/events/{event_id}/tasks", post(ensure_event_tasks))
        .route("/api/sweep", post(sweep))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fixed-interval sweep loop. A failing tick is logged and retried on the
/// next tick; idempotence makes the retry safe.
pub async fn run_sweep_scheduler(db: Database, clock: Arc<dyn Clock>, interval_seconds: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick fires immediately; run one sweep at startup, then
    // settle into the schedule.
    loop {
        interval.tick().await;
        match db.sweep_due_events(clock.as_ref()) {
            Ok(outcome) => info!(
                today = %outcome.today,
                scanned = outcome.scanned,
                created = outcome.created,
                patched = outcome.patched,
                "scheduled sweep completed"
            ),
            Err(err) => error!(error = %err, "scheduled sweep failed; will retry next tick"),
        }
    }
}

/// Serve the HTTP API and the sweep scheduler until shutdown.
pub async fn run(config: &Config, db: Database, clock: Arc<dyn Clock>) -> anyhow::Result<()> {
    let state = EngineServer::new(db.clone(), config.engine.clone(), Arc::clone(&clock));
    let app = router(state);

    tokio::spawn(run_sweep_scheduler(
        db,
        clock,
        config.server.sweep_interval_seconds,
    ));

    let addr = format!("127.0.0.1:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "opsboard engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}
