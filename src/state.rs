//! Application state: the loaded catalog, the generation engine and settings.
//!
//! The catalog is immutable after startup, so it is shared behind an `Arc`
//! with no lock. Every request builds its own value generator inside `QGen`.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::config::{load_from_env, Settings};
use crate::qgen::QGen;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub qgen: Arc<QGen>,
    pub settings: Settings,
}

impl AppState {
    /// Build state from env: load catalog file (or built-ins), validate, wire the engine.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let (catalog, settings) = load_from_env();
        Self::from_parts(catalog, settings)
    }

    pub fn from_parts(catalog: Catalog, settings: Settings) -> Self {
        let summary = catalog.summary();
        info!(
            target: "catalog",
            contexts = summary.contexts,
            goals = summary.goals,
            mappings = summary.mappings,
            templates = summary.templates,
            skills = summary.skills,
            "Startup catalog inventory"
        );

        let issues = catalog.validate();
        if !issues.is_empty() {
            warn!(target: "catalog", count = issues.len(), "Catalog has dangling references");
        }

        let catalog = Arc::new(catalog);
        let qgen = QGen::new(catalog.clone())
            .with_topics(settings.topics.clone())
            .with_selection(settings.selection)
            .with_max_attempts(settings.engine.max_constraint_attempts);

        info!(
            target: "qgen_backend",
            selection = ?settings.selection,
            max_attempts = settings.engine.max_constraint_attempts,
            "Generation engine ready"
        );

        Self { catalog, qgen: Arc::new(qgen), settings }
    }
}
