use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;

use aurora_core::DeliveryError;

use crate::handlers::*;
use crate::ledger::{Ledger, LedgerAgent};

pub struct App {
    pub agent: Arc<LedgerAgent>,
    pub ledger: Ledger,
}

pub type AppState = Arc<App>;

pub async fn run(
    host: &str,
    port: u16,
    max_inflight: usize,
    agent: Arc<LedgerAgent>,
    ledger: Ledger,
) -> std::io::Result<()> {
    let state: AppState = Arc::new(App { agent, ledger });

    let app = Router::new()
        // Health is always open (no auth)
        .route("/health", get(health))
        // Protected routes
        .route("/receivers", get(list_receivers))
        .route("/balances", get(balances))
        .route("/deliver/{*route}", post(deliver))
        .layer(middleware::from_fn(auth_middleware))
        .layer(GlobalConcurrencyLimitLayer::new(max_inflight))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", host, port);

    if std::env::var("AURORA_API_KEY").is_ok() {
        tracing::info!("🔐 API key authentication enabled");
    } else {
        tracing::warn!("⚠️  No AURORA_API_KEY set — server is open (dev mode)");
    }

    tracing::info!(max_inflight, "🌅 Aurora agent host starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

// ─── Auth Middleware ────────────────────────────────────────────────────────

async fn auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // If no API key is configured, allow all requests (dev mode)
    let expected_key = match std::env::var("AURORA_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => return Ok(next.run(request).await),
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if token == expected_key {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("🚫 Unauthorized request to {}", request.uri().path());
        Err(StatusCode::UNAUTHORIZED)
    }
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let agent = &state.agent;
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        agent: agent.name().to_string(),
        receivers: agent.receivers().len(),
        lock_entries: agent.locks().len(),
        tracked_sequences: agent.tracked_sequences(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn list_receivers(State(state): State<AppState>) -> Json<ApiResponse<ReceiversResponse>> {
    let receivers = state
        .agent
        .receivers()
        .into_iter()
        .map(|(route, priority)| ReceiverInfo { route, priority })
        .collect();
    Json(ApiResponse::ok(ReceiversResponse {
        receivers,
        dna: state.agent.dna(),
    }))
}

async fn balances(State(state): State<AppState>) -> Json<ApiResponse<BTreeMap<String, i64>>> {
    Json(ApiResponse::ok(state.ledger.balances()))
}

async fn deliver(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<ApiResponse<DeliverResponse>>) {
    match state.agent.deliver(&route, payload).await {
        Ok(outcome) => {
            let response = DeliverResponse::new(route, outcome);
            tracing::debug!(route = %response.route, outcome = response.outcome, "Payload delivered");
            (StatusCode::OK, Json(ApiResponse::ok(response)))
        }
        Err(e) => {
            let status = delivery_status(&e);
            if status.is_server_error() {
                tracing::error!(route = %route, error = %e, "Handler failed");
            } else {
                tracing::warn!(route = %route, error = %e, "Delivery rejected");
            }
            (status, Json(ApiResponse::err(e.to_string())))
        }
    }
}

fn delivery_status(error: &DeliveryError) -> StatusCode {
    match error {
        DeliveryError::NoReceiver(_) => StatusCode::NOT_FOUND,
        DeliveryError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DeliveryError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
