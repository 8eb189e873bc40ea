//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument};

use crate::error::QGenError;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

/// Engine error rendered as a JSON body with a matching status.
pub struct ApiError(pub QGenError);

impl From<QGenError> for ApiError {
  fn from(e: QGenError) -> Self { Self(e) }
}

pub fn status_for(e: &QGenError) -> StatusCode {
  match e {
    QGenError::NoCompatibleContext { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    QGenError::MissingOptions { .. } | QGenError::InvalidVariable { .. } | QGenError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (status_for(&self.0), Json(ErrorOut { error: self.0.to_string() })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(skills = ?body.target_skills, n = body.number_of_questions))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = do_generate(&state, body)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(sets = body.sets))]
pub async fn http_post_generate_batch(
  State(state): State<Arc<AppState>>,
  Json(body): Json<BatchIn>,
) -> Result<impl IntoResponse, ApiError> {
  let outs = do_generate_batch(&state, body)?;
  Ok(Json(outs))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(catalog_overview(&state))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_contexts(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LookupQuery>,
) -> impl IntoResponse {
  let contexts = contexts_for(&state, &q);
  info!(target: "catalog", skills = ?q.skills, category = ?q.category, found = contexts.len(), "HTTP contexts lookup");
  Json(contexts)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_goals(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LookupQuery>,
) -> impl IntoResponse {
  Json(GoalsOut { goal_ids: goals_for(&state, &q) })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_templates(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TemplatesQuery>,
) -> impl IntoResponse {
  let templates = templates_for(&state, &q);
  info!(target: "catalog", context = ?q.context, goal = ?q.goal, found = templates.len(), "HTTP templates lookup");
  Json(templates)
}
