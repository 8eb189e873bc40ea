//! Answer-option generation.
//!
//! Correct answers are not computed from sampled values yet: the default
//! generator emits four placeholder options with the first marked correct.
//! Real generators plug in per template id or per goal id through `AnswerRegistry`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{SampledValue, Skill, Template};

/// Everything an answer generator may look at for one question.
pub struct AnswerContext<'a> {
  pub template: &'a Template,
  pub values: &'a BTreeMap<String, SampledValue>,
  pub skills: &'a [Skill],
  pub question: &'a str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnswerSet {
  pub options: Vec<String>,
  pub options_latex: Option<Vec<String>>,
  pub correct_answer: usize,
  pub explanation: String,
  pub explanation_latex: Option<String>,
}

pub trait AnswerGenerator: Send + Sync {
  fn answers(&self, ctx: &AnswerContext<'_>) -> AnswerSet;
}

/// Fixed four-option stub.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderAnswers;

impl AnswerGenerator for PlaceholderAnswers {
  fn answers(&self, _ctx: &AnswerContext<'_>) -> AnswerSet {
    AnswerSet {
      options: ["Opción A", "Opción B", "Opción C", "Opción D"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
      options_latex: None,
      correct_answer: 0,
      explanation: "Explicación de la respuesta correcta basada en los datos de la situación.".into(),
      explanation_latex: None,
    }
  }
}

/// Resolves the generator for a template: template id first, then goal id, then the fallback.
#[derive(Clone)]
pub struct AnswerRegistry {
  by_template: HashMap<String, Arc<dyn AnswerGenerator>>,
  by_goal: HashMap<String, Arc<dyn AnswerGenerator>>,
  fallback: Arc<dyn AnswerGenerator>,
}

impl Default for AnswerRegistry {
  fn default() -> Self {
    Self {
      by_template: HashMap::new(),
      by_goal: HashMap::new(),
      fallback: Arc::new(PlaceholderAnswers),
    }
  }
}

impl AnswerRegistry {
  #[allow(dead_code)]
  pub fn bind_template(&mut self, template_id: impl Into<String>, gen: Arc<dyn AnswerGenerator>) {
    self.by_template.insert(template_id.into(), gen);
  }

  #[allow(dead_code)]
  pub fn bind_goal(&mut self, goal_id: impl Into<String>, gen: Arc<dyn AnswerGenerator>) {
    self.by_goal.insert(goal_id.into(), gen);
  }

  pub fn resolve(&self, template: &Template) -> &Arc<dyn AnswerGenerator> {
    self.by_template
      .get(&template.id)
      .or_else(|| self.by_goal.get(&template.goal_id))
      .unwrap_or(&self.fallback)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Fixed(&'static str);

  impl AnswerGenerator for Fixed {
    fn answers(&self, _ctx: &AnswerContext<'_>) -> AnswerSet {
      AnswerSet {
        options: vec![self.0.to_string()],
        options_latex: None,
        correct_answer: 0,
        explanation: String::new(),
        explanation_latex: None,
      }
    }
  }

  fn template(id: &str, goal: &str) -> Template {
    Template {
      id: id.into(),
      name: id.into(),
      template_text: String::new(),
      template_latex: None,
      goal_id: goal.into(),
      required_skills: Default::default(),
      compatible_contexts: Default::default(),
      variables: vec![],
      constraints: vec![],
      difficulty_level: 1,
    }
  }

  fn run(reg: &AnswerRegistry, t: &Template) -> AnswerSet {
    let values = BTreeMap::new();
    let ctx = AnswerContext { template: t, values: &values, skills: &[], question: "" };
    reg.resolve(t).answers(&ctx)
  }

  #[test]
  fn placeholder_is_default() {
    let reg = AnswerRegistry::default();
    let set = run(&reg, &template("t", "g"));
    assert_eq!(set.options.len(), 4);
    assert_eq!(set.options[0], "Opción A");
    assert_eq!(set.correct_answer, 0);
  }

  #[test]
  fn template_binding_wins_over_goal_binding() {
    let mut reg = AnswerRegistry::default();
    reg.bind_goal("g", Arc::new(Fixed("goal")));
    reg.bind_template("t", Arc::new(Fixed("template")));
    assert_eq!(run(&reg, &template("t", "g")).options, vec!["template".to_string()]);
    assert_eq!(run(&reg, &template("other", "g")).options, vec!["goal".to_string()]);
  }
}
