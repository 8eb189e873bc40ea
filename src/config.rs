//! Loading the catalog and engine settings from TOML.
//!
//! `QGEN_CATALOG_PATH` points at a file with this shape:
//!
//! ```toml
//! [engine]
//! max_constraint_attempts = 100
//! default_level = "1-medio"
//! default_subject = "matematicas"
//! include_builtin = true
//!
//! [topics]
//! matematicas = "Números y operaciones"
//!
//! [[contexts]]
//! id = "tienda-ropa"
//! category = "comercio"
//! description = "..."
//! compatible_skills = ["numeros-porcentajes"]
//!
//! [[templates]]
//! id = "porcentaje-descuento-simple"
//! # ...
//! [[templates.variables]]
//! name = "descuento"
//! type = "integer"
//! min = 5
//! max = 50
//! step = 5
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::domain::{Context, Goal, GoalSkillMapping, Template};
use crate::error::CatalogError;
use crate::generator::DEFAULT_MAX_ATTEMPTS;
use crate::qgen::SelectionPolicy;
use crate::seeds::{builtin_parts, default_topics};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CatalogFile {
  #[serde(default)]
  pub engine: EngineSettings,
  #[serde(default)]
  pub topics: BTreeMap<String, String>,
  #[serde(default)]
  pub contexts: Vec<Context>,
  #[serde(default)]
  pub goals: Vec<Goal>,
  #[serde(default)]
  pub goal_skill_mappings: Vec<GoalSkillMapping>,
  #[serde(default)]
  pub templates: Vec<Template>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EngineSettings {
  #[serde(default = "default_attempts")]
  pub max_constraint_attempts: usize,
  #[serde(default = "default_level")]
  pub default_level: String,
  #[serde(default = "default_subject")]
  pub default_subject: String,
  #[serde(default = "default_true")]
  pub include_builtin: bool,
}

fn default_attempts() -> usize { DEFAULT_MAX_ATTEMPTS }
fn default_level() -> String { "1-medio".into() }
fn default_subject() -> String { "matematicas".into() }
fn default_true() -> bool { true }

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      max_constraint_attempts: default_attempts(),
      default_level: default_level(),
      default_subject: default_subject(),
      include_builtin: true,
    }
  }
}

/// Everything the service needs at startup.
#[derive(Clone, Debug, Default)]
pub struct Settings {
  pub engine: EngineSettings,
  pub topics: BTreeMap<String, String>,
  pub selection: SelectionPolicy,
}

pub fn parse_catalog_file(src: &str) -> Result<CatalogFile, CatalogError> {
  Ok(toml::from_str::<CatalogFile>(src)?)
}

pub fn read_catalog_file(path: &str) -> Result<CatalogFile, CatalogError> {
  let src = std::fs::read_to_string(path).map_err(|source| CatalogError::Io { path: path.to_string(), source })?;
  parse_catalog_file(&src)
}

/// Merge file entries with the built-in tables. File entries come first so
/// they win on id clashes; built-ins are skipped when `include_builtin = false`.
pub fn build_catalog(file: &CatalogFile) -> Catalog {
  let mut contexts = file.contexts.clone();
  let mut goals = file.goals.clone();
  let mut mappings = file.goal_skill_mappings.clone();
  let mut templates = file.templates.clone();

  if file.engine.include_builtin {
    let (c, g, m, t) = builtin_parts();
    contexts.extend(c);
    goals.extend(g);
    mappings.extend(m);
    templates.extend(t);
  }

  Catalog::new(contexts, goals, mappings, templates)
}

/// Built-in topics overlaid with the file's `[topics]` table.
pub fn build_topics(file: &CatalogFile) -> BTreeMap<String, String> {
  let mut topics = default_topics();
  topics.extend(file.topics.clone());
  topics
}

/// Load catalog + settings from the environment. Any IO/parse error is logged
/// and the built-in catalog is used instead.
pub fn load_from_env() -> (Catalog, Settings) {
  let file = match std::env::var("QGEN_CATALOG_PATH").ok() {
    Some(path) => match read_catalog_file(&path) {
      Ok(f) => {
        info!(target: "catalog", %path, contexts = f.contexts.len(), templates = f.templates.len(), "Loaded catalog file (TOML)");
        f
      }
      Err(e) => {
        error!(target: "catalog", %path, error = %e, "Failed to load catalog file; using built-in catalog");
        CatalogFile::default()
      }
    },
    None => {
      info!(target: "catalog", "QGEN_CATALOG_PATH not set; using built-in catalog");
      CatalogFile::default()
    }
  };

  let selection = std::env::var("QGEN_SELECTION")
    .ok()
    .map(|s| SelectionPolicy::parse(&s))
    .unwrap_or_default();

  let catalog = build_catalog(&file);
  let settings = Settings {
    topics: build_topics(&file),
    engine: file.engine,
    selection,
  };
  (catalog, settings)
}
