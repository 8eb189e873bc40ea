//! Read-only catalog of contexts, goals, goal-skill mappings and templates.
//!
//! Built once at startup and shared behind `Arc<Catalog>`. All lookups are
//! pure filters; an empty result means "no match", never an error.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::{Context, Goal, GoalSkillMapping, Skill, Template};
use crate::util::placeholders;

#[derive(Clone, Debug, Default)]
pub struct Catalog {
  contexts: Vec<Context>,
  goals: Vec<Goal>,
  mappings: Vec<GoalSkillMapping>,
  templates: Vec<Template>,
  context_idx: HashMap<String, usize>,
  goal_idx: HashMap<String, usize>,
  template_idx: HashMap<String, usize>,
}

/// Dangling reference found while validating the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogIssue {
  UnknownGoal { owner: String, goal_id: String },
  UnknownContext { template_id: String, context_id: String },
  UnknownConstraintVariable { template_id: String, variable: String },
  UndefinedPlaceholder { template_id: String, placeholder: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
  pub contexts: usize,
  pub goals: usize,
  pub mappings: usize,
  pub templates: usize,
  pub skills: usize,
}

impl Catalog {
  /// Builds the catalog. Later duplicates of an id are dropped so the first
  /// definition wins.
  pub fn new(
    contexts: Vec<Context>,
    goals: Vec<Goal>,
    mappings: Vec<GoalSkillMapping>,
    templates: Vec<Template>,
  ) -> Self {
    let mut cat = Catalog::default();
    for c in contexts {
      if cat.context_idx.contains_key(&c.id) {
        warn!(target: "catalog", id = %c.id, "Duplicate context id ignored");
        continue;
      }
      cat.context_idx.insert(c.id.clone(), cat.contexts.len());
      cat.contexts.push(c);
    }
    for g in goals {
      if cat.goal_idx.contains_key(&g.id) {
        warn!(target: "catalog", id = %g.id, "Duplicate goal id ignored");
        continue;
      }
      cat.goal_idx.insert(g.id.clone(), cat.goals.len());
      cat.goals.push(g);
    }
    cat.mappings = mappings;
    for t in templates {
      if cat.template_idx.contains_key(&t.id) {
        warn!(target: "catalog", id = %t.id, "Duplicate template id ignored");
        continue;
      }
      cat.template_idx.insert(t.id.clone(), cat.templates.len());
      cat.templates.push(t);
    }
    cat
  }

  pub fn contexts(&self) -> &[Context] { &self.contexts }
  pub fn goals(&self) -> &[Goal] { &self.goals }
  pub fn mappings(&self) -> &[GoalSkillMapping] { &self.mappings }
  pub fn templates(&self) -> &[Template] { &self.templates }

  pub fn context(&self, id: &str) -> Option<&Context> {
    self.context_idx.get(id).map(|&i| &self.contexts[i])
  }

  pub fn goal(&self, id: &str) -> Option<&Goal> {
    self.goal_idx.get(id).map(|&i| &self.goals[i])
  }

  #[allow(dead_code)]
  pub fn template(&self, id: &str) -> Option<&Template> {
    self.template_idx.get(id).map(|&i| &self.templates[i])
  }

  /// Contexts able to host every skill in `skills`, in catalog order.
  pub fn find_all_supporting_skills(&self, skills: &[Skill]) -> Vec<&Context> {
    self.contexts.iter().filter(|c| c.supports_all(skills)).collect()
  }

  /// Contexts able to host at least one of `skills`, in catalog order.
  pub fn find_supporting_any_skill(&self, skills: &[Skill]) -> Vec<&Context> {
    self.contexts.iter().filter(|c| c.supports_any(skills)).collect()
  }

  /// Deduplicated goal ids of every mapping satisfied by `skills`.
  pub fn find_compatible_goals(&self, skills: &[Skill]) -> Vec<String> {
    let mut seen = HashSet::new();
    self.mappings
      .iter()
      .filter(|m| m.is_satisfied_by(skills))
      .filter(|m| seen.insert(m.goal_id.as_str()))
      .map(|m| m.goal_id.clone())
      .collect()
  }

  /// Templates hosted by `context_id`, bound to one of `goal_ids`, and sharing
  /// at least one required skill with `skills`.
  pub fn find_compatible_templates(&self, context_id: &str, goal_ids: &[String], skills: &[Skill]) -> Vec<&Template> {
    self.templates
      .iter()
      .filter(|t| t.compatible_contexts.contains(context_id))
      .filter(|t| skills.iter().any(|s| t.required_skills.contains(s)))
      .filter(|t| goal_ids.iter().any(|g| *g == t.goal_id))
      .collect()
  }

  pub fn goals_by_cognitive_level(&self, level: &str) -> Vec<&Goal> {
    self.goals.iter().filter(|g| g.cognitive_level.eq_ignore_ascii_case(level)).collect()
  }

  pub fn contexts_by_category(&self, category: &str) -> Vec<&Context> {
    self.contexts.iter().filter(|c| c.category.eq_ignore_ascii_case(category)).collect()
  }

  pub fn templates_by_goal(&self, goal_id: &str) -> Vec<&Template> {
    self.templates.iter().filter(|t| t.goal_id == goal_id).collect()
  }

  /// Every skill some context can host.
  pub fn skills(&self) -> BTreeSet<&str> {
    self.contexts
      .iter()
      .flat_map(|c| c.compatible_skills.iter().map(String::as_str))
      .collect()
  }

  pub fn summary(&self) -> CatalogSummary {
    CatalogSummary {
      contexts: self.contexts.len(),
      goals: self.goals.len(),
      mappings: self.mappings.len(),
      templates: self.templates.len(),
      skills: self.skills().len(),
    }
  }

  /// Reports dangling references. Never fatal: a template pointing at an
  /// unknown context simply never matches.
  #[instrument(level = "info", skip(self))]
  pub fn validate(&self) -> Vec<CatalogIssue> {
    let mut issues = Vec::new();
    for m in &self.mappings {
      if self.goal(&m.goal_id).is_none() {
        issues.push(CatalogIssue::UnknownGoal { owner: "mapping".into(), goal_id: m.goal_id.clone() });
      }
    }
    for t in &self.templates {
      if self.goal(&t.goal_id).is_none() {
        issues.push(CatalogIssue::UnknownGoal { owner: t.id.clone(), goal_id: t.goal_id.clone() });
      }
      for ctx in &t.compatible_contexts {
        if self.context(ctx).is_none() {
          issues.push(CatalogIssue::UnknownContext { template_id: t.id.clone(), context_id: ctx.clone() });
        }
      }
      let declared: HashSet<&str> = t.variables.iter().map(|v| v.name.as_str()).collect();
      for c in &t.constraints {
        if !declared.contains(c.variable.as_str()) {
          issues.push(CatalogIssue::UnknownConstraintVariable {
            template_id: t.id.clone(),
            variable: c.variable.clone(),
          });
        }
      }
      let texts = std::iter::once(t.template_text.as_str()).chain(t.template_latex.as_deref());
      let mut reported = HashSet::new();
      for name in texts.flat_map(placeholders) {
        if !declared.contains(name.as_str()) && reported.insert(name.clone()) {
          issues.push(CatalogIssue::UndefinedPlaceholder { template_id: t.id.clone(), placeholder: name });
        }
      }
    }
    for issue in &issues {
      warn!(target: "catalog", ?issue, "Catalog issue");
    }
    let s = self.summary();
    info!(target: "catalog", contexts = s.contexts, goals = s.goals, mappings = s.mappings, templates = s.templates, issues = issues.len(), "Catalog validated");
    issues
  }
}
