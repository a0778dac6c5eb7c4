//! # HTTP Route Handlers
//!
//! `POST /normalize` runs the column-pruning pass over one plan:
//!
//! 1. **Intern**: validate the plan tree and load it into a fresh memo.
//! 2. **Normalize**: rewrite to fixpoint with the shared rule catalog.
//! 3. **Extract**: materialize the normalized tree for the response.
//!
//! ## Error Handling
//!
//! - 400 Bad Request: the plan is malformed (wrong child count, ragged Values rows,
//!   columns read that no input produces)
//! - 500 Internal Server Error: normalization failed (a rule was caught cycling)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use colprune_core::memo::{Memo, PlanNode};
use colprune_core::rule::RuleTag;
use colprune_core::{NormalizeConfig, Normalizer};

use crate::state::AppState;

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /rules: the catalog in match order.
pub async fn list_rules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rules: Vec<RuleInfo> = state
        .rule_registry
        .rules()
        .map(|r| RuleInfo {
            name: r.name().to_string(),
            tags: r.tags().to_vec(),
        })
        .collect();

    Json(RulesResponse { rules })
}

#[derive(Serialize)]
pub struct RulesResponse {
    pub rules: Vec<RuleInfo>,
}

#[derive(Serialize)]
pub struct RuleInfo {
    pub name: String,
    pub tags: Vec<RuleTag>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub plan: PlanNode,
    /// Replaces the server's configured defaults for this request.
    #[serde(default)]
    pub config: Option<NormalizeConfig>,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub plan: PlanNode,
    /// Rule applications performed.
    pub iterations: usize,
    /// Indented rendering of the normalized plan.
    pub explain: String,
}

/// POST /normalize
pub async fn normalize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NormalizeRequest>,
) -> Result<Json<NormalizeResponse>, (StatusCode, String)> {
    run_normalization(&state, request).map(Json)
}

fn run_normalization(
    state: &AppState,
    request: NormalizeRequest,
) -> Result<NormalizeResponse, (StatusCode, String)> {
    let mut memo = Memo::new();
    let root = memo
        .insert_plan(&request.plan)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid plan: {}", e)))?;

    let config = request
        .config
        .unwrap_or_else(|| state.config.normalize.clone());
    let mut normalizer = Normalizer::new(memo, state.rule_registry.clone(), config)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let result = normalizer.normalize(root).map_err(|e| {
        warn!("Normalization failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Normalization failed: {}", e),
        )
    })?;

    let plan = normalizer.memo.extract_plan(result);
    Ok(NormalizeResponse {
        explain: plan.display(0),
        plan,
        iterations: normalizer.iterations(),
    })
}
