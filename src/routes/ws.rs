//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "qgen_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "qgen_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = handle_text(&txt, &state);
        if let Err(e) = socket.send(Message::Text(reply)).await {
          error!(target: "qgen_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "qgen_backend", "WebSocket disconnected");
}

/// Parse, dispatch, serialize.
pub(crate) fn handle_text(txt: &str, state: &AppState) -> String {
  let reply_msg = match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "qgen_backend", "WS received: {:?}", &incoming);
      handle_client_ws(incoming, state)
    }
    Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
  };

  serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  })
}

fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Generate(input) => match do_generate(state, input) {
      Ok(output) => {
        info!(target: "qgen_backend", problem = %output.problem.id, "WS generate served");
        ServerWsMessage::Generated { output }
      }
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::GenerateBatch(input) => match do_generate_batch(state, input) {
      Ok(outputs) => ServerWsMessage::GeneratedBatch { outputs },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::Catalog => ServerWsMessage::Catalog { catalog: catalog_overview(state) },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Settings;
  use crate::seeds::builtin_catalog;

  fn state() -> AppState {
    AppState::from_parts(builtin_catalog(), Settings::default())
  }

  fn reply(raw: &str) -> serde_json::Value {
    serde_json::from_str(&handle_text(raw, &state())).expect("reply json")
  }

  #[test]
  fn ping_pong() {
    assert_eq!(reply(r#"{"type":"ping"}"#)["type"], "pong");
  }

  #[test]
  fn generate_over_ws() {
    let v = reply(r#"{"type":"generate","targetSkills":["numeros-porcentajes"],"numberOfQuestions":1,"seed":3}"#);
    assert_eq!(v["type"], "generated");
    assert_eq!(v["output"]["questions"].as_array().map(|a| a.len()), Some(1));
  }

  #[test]
  fn generate_batch_over_ws() {
    let v = reply(r#"{"type":"generate_batch","targetSkills":["numeros-porcentajes"],"numberOfQuestions":1,"seed":9,"sets":2}"#);
    assert_eq!(v["type"], "generated_batch");
    let outputs = v["outputs"].as_array().expect("outputs");
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0]["seed"], 9);
    assert_eq!(outputs[1]["seed"], 10);
    assert_ne!(outputs[0]["problem"]["id"], outputs[1]["problem"]["id"]);

    let v = reply(r#"{"type":"generate_batch","targetSkills":["numeros-porcentajes"],"numberOfQuestions":1,"sets":0}"#);
    assert_eq!(v["type"], "error");
  }

  #[test]
  fn engine_errors_become_error_messages() {
    let v = reply(r#"{"type":"generate","targetSkills":["no-such-skill"],"numberOfQuestions":1}"#);
    assert_eq!(v["type"], "error");
    let v = reply("not json");
    assert_eq!(v["type"], "error");
  }

  #[test]
  fn catalog_summary_over_ws() {
    let v = reply(r#"{"type":"catalog"}"#);
    assert_eq!(v["type"], "catalog");
    assert!(v["catalog"]["templates"].as_u64().unwrap_or(0) > 0);
  }
}
