//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Turning client DTOs into engine requests (defaults + validation)
//!   - Single and batch generation
//!   - Catalog lookups (contexts, goals, templates, summary)

use tracing::{info, instrument, warn};

use crate::domain::{Context, Skill, Template};
use crate::error::QGenError;
use crate::protocol::{BatchIn, CatalogOut, GenerateIn, LookupQuery, TemplatesQuery};
use crate::qgen::{GenerationOutput, GenerationRequest};
use crate::state::AppState;

/// Upper bound for `sets` in one batch call.
pub const MAX_BATCH_SETS: usize = 50;

/// Parses `"a, b,,c"` into `["a", "b", "c"]`, keeping order.
pub fn split_skills(raw: Option<&str>) -> Vec<Skill> {
  raw.unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

/// Apply config defaults and reject requests that can never produce questions.
pub fn to_request(state: &AppState, input: GenerateIn) -> Result<GenerationRequest, QGenError> {
  let target_skills: Vec<Skill> = input
    .target_skills
    .into_iter()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect();
  if target_skills.is_empty() {
    return Err(QGenError::InvalidRequest("targetSkills must not be empty".into()));
  }
  if input.number_of_questions == 0 {
    return Err(QGenError::InvalidRequest("numberOfQuestions must be at least 1".into()));
  }

  let engine = &state.settings.engine;
  Ok(GenerationRequest {
    target_skills,
    number_of_questions: input.number_of_questions,
    level: input.level.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| engine.default_level.clone()),
    subject: input.subject.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| engine.default_subject.clone()),
    seed: input.seed,
  })
}

#[instrument(level = "info", skip(state, input), fields(skills = ?input.target_skills, n = input.number_of_questions))]
pub fn do_generate(state: &AppState, input: GenerateIn) -> Result<GenerationOutput, QGenError> {
  let req = to_request(state, input)?;
  match state.qgen.generate(&req) {
    Ok(out) => {
      info!(
        target: "qgen_backend",
        problem = %out.problem.id,
        questions = out.questions.len(),
        warnings = out.warnings.len(),
        seed = out.seed,
        complete = out.is_complete(),
        "Generation served"
      );
      Ok(out)
    }
    Err(e) => {
      warn!(target: "qgen_backend", error = %e, "Generation failed");
      Err(e)
    }
  }
}

#[instrument(level = "info", skip(state, input), fields(sets = input.sets))]
pub fn do_generate_batch(state: &AppState, input: BatchIn) -> Result<Vec<GenerationOutput>, QGenError> {
  if input.sets == 0 || input.sets > MAX_BATCH_SETS {
    return Err(QGenError::InvalidRequest(format!("sets must be between 1 and {MAX_BATCH_SETS}")));
  }
  let sets = input.sets;
  let req = to_request(state, input.request)?;
  let outs = state.qgen.generate_multiple_question_sets(&req, sets)?;
  info!(target: "qgen_backend", sets, "Batch generation served");
  Ok(outs)
}

pub fn catalog_overview(state: &AppState) -> CatalogOut {
  CatalogOut { summary: state.catalog.summary(), issues: state.catalog.validate() }
}

/// Contexts hosting every skill, optionally narrowed to one category.
/// No skills means every context.
pub fn contexts_for(state: &AppState, q: &LookupQuery) -> Vec<Context> {
  let skills = split_skills(q.skills.as_deref());
  let found = match q.category.as_deref() {
    Some(category) => state
      .catalog
      .contexts_by_category(category)
      .into_iter()
      .filter(|c| c.supports_all(&skills))
      .collect(),
    None => state.catalog.find_all_supporting_skills(&skills),
  };
  found.into_iter().cloned().collect()
}

/// Compatible goal ids for the skills. With only `cognitiveLevel`, every goal at that level.
pub fn goals_for(state: &AppState, q: &LookupQuery) -> Vec<String> {
  let skills = split_skills(q.skills.as_deref());
  let by_level = q.cognitive_level.as_deref().map(|level| {
    state
      .catalog
      .goals_by_cognitive_level(level)
      .into_iter()
      .map(|g| g.id.clone())
      .collect::<Vec<_>>()
  });
  match (skills.is_empty(), by_level) {
    (true, Some(level_ids)) => level_ids,
    (_, Some(level_ids)) => state
      .catalog
      .find_compatible_goals(&skills)
      .into_iter()
      .filter(|id| level_ids.contains(id))
      .collect(),
    (_, None) => state.catalog.find_compatible_goals(&skills),
  }
}

/// With a context: templates usable there for the skills, filtered by the goals
/// those skills unlock. Without one: every template of `goal`, or all templates.
pub fn templates_for(state: &AppState, q: &TemplatesQuery) -> Vec<Template> {
  let skills = split_skills(q.skills.as_deref());
  let found = match (q.context.as_deref(), q.goal.as_deref()) {
    (Some(context_id), goal) => {
      let goals = match goal {
        Some(g) => vec![g.to_string()],
        None => state.catalog.find_compatible_goals(&skills),
      };
      state.catalog.find_compatible_templates(context_id, &goals, &skills)
    }
    (None, Some(goal)) => state.catalog.templates_by_goal(goal),
    (None, None) => state.catalog.templates().iter().collect(),
  };
  found.into_iter().cloned().collect()
}
