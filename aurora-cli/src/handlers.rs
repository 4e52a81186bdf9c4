use aurora_core::{DeliveryError, DnaRecord, Outcome, Priority};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Request Types ──────────────────────────────────────────────────────────

/// One line of a replay stream.
#[derive(Deserialize)]
pub struct ReplayLine {
    pub route: String,
    #[serde(default)]
    pub payload: Value,
}

impl ReplayLine {
    pub fn validate(&self) -> Result<(), String> {
        if self.route.trim().is_empty() {
            return Err("route is required".to_string());
        }
        Ok(())
    }
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent: String,
    pub receivers: usize,
    pub lock_entries: usize,
    pub tracked_sequences: usize,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReceiverInfo {
    pub route: String,
    pub priority: Priority,
}

#[derive(Serialize)]
pub struct ReceiversResponse {
    pub receivers: Vec<ReceiverInfo>,
    pub dna: Vec<DnaRecord>,
}

#[derive(Serialize)]
pub struct DeliverResponse {
    pub route: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl DeliverResponse {
    pub fn new(route: String, outcome: Outcome<Value>) -> Self {
        match outcome {
            Outcome::Handled(result) => Self {
                route,
                outcome: "handled",
                result: Some(result),
            },
            Outcome::Stale => Self {
                route,
                outcome: "stale",
                result: None,
            },
        }
    }
}

/// Result of one replayed line, printed in input order.
#[derive(Serialize)]
pub struct ReplayResult {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplayResult {
    pub fn delivered(
        line: usize,
        route: String,
        delivery: Result<Outcome<Value>, DeliveryError>,
    ) -> Self {
        match delivery {
            Ok(outcome) => {
                let response = DeliverResponse::new(route, outcome);
                Self {
                    line,
                    route: Some(response.route),
                    outcome: response.outcome,
                    result: response.result,
                    error: None,
                }
            }
            Err(e) => Self {
                line,
                route: Some(route),
                outcome: "error",
                result: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn invalid(line: usize, error: impl Into<String>) -> Self {
        Self {
            line,
            route: None,
            outcome: "invalid",
            result: None,
            error: Some(error.into()),
        }
    }
}
