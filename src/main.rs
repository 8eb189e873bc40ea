//! QGen · Progressive Question Generation Backend
//!
//! - Axum HTTP + WebSocket API
//! - Catalog of contexts, goals, skill mappings and templates (built-in + TOML)
//! - Deterministic, seedable value sampling
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   QGEN_CATALOG_PATH  : path to TOML catalog (engine settings, topics, catalog entries)
//!   QGEN_SELECTION     : "first" (default) or "seeded" tie-break among candidates
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod seeds;
mod catalog;
mod generator;
mod answers;
mod qgen;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Catalog + engine are immutable after this point.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "qgen_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
