//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/generate", post(http::http_post_generate))
        .route("/api/v1/generate/batch", post(http::http_post_generate_batch))
        .route("/api/v1/catalog", get(http::http_get_catalog))
        .route("/api/v1/contexts", get(http::http_get_contexts))
        .route("/api/v1/goals", get(http::http_get_goals))
        .route("/api/v1/templates", get(http::http_get_templates))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::seeds::builtin_catalog;

    fn app() -> Router {
        build_router(Arc::new(AppState::from_parts(builtin_catalog(), Settings::default())))
    }

    async fn call(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = call(get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn generate_returns_linked_questions() {
        let body = serde_json::json!({
            "targetSkills": ["numeros-porcentajes", "numeros-decimales", "algebra-proporcionalidad"],
            "numberOfQuestions": 3,
            "level": "1 Medio",
            "subject": "matematicas",
            "seed": 42
        });
        let (status, out) = call(post_json("/api/v1/generate", body)).await;
        assert_eq!(status, StatusCode::OK);
        let questions = out["questions"].as_array().expect("questions");
        assert_eq!(questions.len(), 3);
        assert!(questions[0]["buildsOn"].is_null());
        assert_eq!(questions[1]["buildsOn"], questions[0]["id"]);
        assert_eq!(out["problem"]["generatedBy"], "qgen-v1");
        assert_eq!(out["seed"], 42);
    }

    #[tokio::test]
    async fn unknown_skills_are_unprocessable() {
        let body = serde_json::json!({ "targetSkills": ["astrofisica"], "numberOfQuestions": 1 });
        let (status, out) = call(post_json("/api/v1/generate", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(out["error"].as_str().unwrap_or_default().contains("astrofisica"));
    }

    #[tokio::test]
    async fn empty_skills_are_bad_request() {
        let body = serde_json::json!({ "targetSkills": [], "numberOfQuestions": 1 });
        let (status, _) = call(post_json("/api/v1/generate", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_generation() {
        let body = serde_json::json!({
            "targetSkills": ["numeros-porcentajes"],
            "numberOfQuestions": 1,
            "seed": 5,
            "sets": 3
        });
        let (status, out) = call(post_json("/api/v1/generate/batch", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out.as_array().map(|a| a.len()), Some(3));
    }

    #[tokio::test]
    async fn catalog_lookups() {
        let (status, summary) = call(get_req("/api/v1/catalog")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(summary["contexts"].as_u64().unwrap_or(0) > 0);
        assert_eq!(summary["issues"].as_array().map(|a| a.len()), Some(0));

        let (_, contexts) = call(get_req("/api/v1/contexts?skills=numeros-porcentajes")).await;
        let ids: Vec<&str> = contexts
            .as_array()
            .expect("contexts")
            .iter()
            .filter_map(|c| c["id"].as_str())
            .collect();
        assert!(ids.contains(&"tienda-ropa"));

        let (_, goals) = call(get_req("/api/v1/goals?skills=numeros-porcentajes")).await;
        assert!(goals["goalIds"].as_array().map(|a| !a.is_empty()).unwrap_or(false));

        let (_, templates) = call(get_req("/api/v1/templates?context=tienda-ropa&skills=numeros-porcentajes")).await;
        assert!(templates.as_array().map(|a| !a.is_empty()).unwrap_or(false));
    }
}
