//! Progressive question generation.
//!
//! Flow for one `generate` call:
//! 1) Pick a context hosting all target skills (else any of them, else fail).
//! 2) Build the skill progression: prefixes of the caller's list, shortest first.
//! 3) For each prefix resolve goals, then templates, sample values and render.
//!    Steps without a goal or template are skipped and reported as warnings.
//! 4) Mint the problem and situation ids and rewrite the question chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::answers::{AnswerContext, AnswerRegistry};
use crate::catalog::Catalog;
use crate::domain::{Context, Difficulty, Problem, ProgressiveQuestion, Situation, Skill};
use crate::error::QGenError;
use crate::generator::{time_seed, ValueGenerator, DEFAULT_MAX_ATTEMPTS};
use crate::util::{fill_template, slug, trunc_for_log};

/// Provenance tag stored on every problem.
pub const GENERATED_BY: &str = "qgen-v1";
const DEFAULT_TOPIC: &str = "General";
const SITUATION_ORDER: u32 = 1;

/// Tie-break among equally compatible contexts/templates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
  /// First candidate in catalog order.
  #[default]
  FirstMatch,
  /// Uniform pick driven by the generation seed.
  Seeded,
}

impl SelectionPolicy {
  pub fn parse(s: &str) -> Self {
    match s.trim().to_lowercase().as_str() {
      "seeded" | "random" => SelectionPolicy::Seeded,
      _ => SelectionPolicy::FirstMatch,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
  /// Order encodes pedagogical dependency: prerequisites first.
  pub target_skills: Vec<Skill>,
  pub number_of_questions: usize,
  pub level: String,
  pub subject: String,
  #[serde(default)]
  pub seed: Option<u64>,
}

/// Non-fatal degradation observed while generating.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationWarning {
  PartialContextMatch { context_id: String, unsupported_skills: Vec<Skill> },
  NoCompatibleGoals { step: usize, skills: Vec<Skill> },
  NoCompatibleTemplates { step: usize, skills: Vec<Skill>, goal_ids: Vec<String> },
  ConstraintsUnsatisfied { step: usize, template_id: String, attempts: usize },
  /// The answer generator pointed past its own options; the index was clamped to the last option.
  AnswerIndexOutOfRange { step: usize, template_id: String, correct_answer: usize, options: usize },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
  pub problem: Problem,
  pub situation: Situation,
  pub questions: Vec<ProgressiveQuestion>,
  pub warnings: Vec<GenerationWarning>,
  pub seed: u64,
  /// `min(number_of_questions, target_skills.len())`.
  pub expected_questions: usize,
}

impl GenerationOutput {
  /// True when every expected question was emitted and nothing degraded.
  pub fn is_complete(&self) -> bool {
    self.warnings.is_empty() && self.questions.len() == self.expected_questions
  }
}

pub struct QGen {
  catalog: Arc<Catalog>,
  answers: AnswerRegistry,
  topics: BTreeMap<String, String>,
  selection: SelectionPolicy,
  max_attempts: usize,
}

impl QGen {
  pub fn new(catalog: Arc<Catalog>) -> Self {
    Self {
      catalog,
      answers: AnswerRegistry::default(),
      topics: BTreeMap::new(),
      selection: SelectionPolicy::FirstMatch,
      max_attempts: DEFAULT_MAX_ATTEMPTS,
    }
  }

  #[allow(dead_code)]
  pub fn with_answers(mut self, answers: AnswerRegistry) -> Self {
    self.answers = answers;
    self
  }

  pub fn with_topics(mut self, topics: BTreeMap<String, String>) -> Self {
    self.topics = topics;
    self
  }

  pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
    self.selection = selection;
    self
  }

  pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
    self.max_attempts = max_attempts;
    self
  }

  pub fn topic_for(&self, subject: &str) -> String {
    self.topics
      .get(subject)
      .or_else(|| self.topics.get(&slug(subject)))
      .cloned()
      .unwrap_or_else(|| DEFAULT_TOPIC.to_string())
  }

  /// Generate one problem with its situation and question chain.
  pub fn generate(&self, req: &GenerationRequest) -> Result<GenerationOutput, QGenError> {
    self.generate_at(req, Utc::now())
  }

  /// Same as `generate` with an explicit clock, so replays are byte-identical.
  pub fn generate_at(&self, req: &GenerationRequest, now: DateTime<Utc>) -> Result<GenerationOutput, QGenError> {
    let seed = req.seed.unwrap_or_else(time_seed);
    self.generate_inner(req, seed, now, None)
  }

  /// `sets` independent outputs seeded `base, base + 1, ...`.
  #[instrument(level = "info", skip(self, req), fields(skills = ?req.target_skills))]
  pub fn generate_multiple_question_sets(
    &self,
    req: &GenerationRequest,
    sets: usize,
  ) -> Result<Vec<GenerationOutput>, QGenError> {
    let base = req.seed.unwrap_or_else(time_seed);
    let now = Utc::now();
    (0..sets)
      .map(|k| self.generate_inner(req, base.wrapping_add(k as u64), now, Some(k + 1)))
      .collect()
  }

  #[instrument(level = "info", skip(self, req, now), fields(skills = ?req.target_skills, n = req.number_of_questions))]
  fn generate_inner(
    &self,
    req: &GenerationRequest,
    seed: u64,
    now: DateTime<Utc>,
    ordinal: Option<usize>,
  ) -> Result<GenerationOutput, QGenError> {
    let skills = &req.target_skills;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut warnings = Vec::new();

    let context = self.select_context(skills, &mut rng, &mut warnings)?;
    debug!(target: "qgen", context = %context.id, "Context selected");

    let progression: Vec<&[Skill]> = (1..=skills.len()).map(|n| &skills[..n]).collect();
    let expected = req.number_of_questions.min(progression.len());

    let mut values = ValueGenerator::new(seed).with_max_attempts(self.max_attempts);
    let mut questions: Vec<ProgressiveQuestion> = Vec::with_capacity(expected);
    let mut previous_id: Option<String> = None;

    for (i, current) in progression.iter().take(expected).enumerate() {
      let current: &[Skill] = current;

      let goal_ids = self.catalog.find_compatible_goals(current);
      if goal_ids.is_empty() {
        warn!(target: "qgen", step = i, skills = ?current, "No compatible goals; skipping step");
        warnings.push(GenerationWarning::NoCompatibleGoals { step: i, skills: current.to_vec() });
        continue;
      }

      let templates = self.catalog.find_compatible_templates(&context.id, &goal_ids, current);
      let Some(template) = self.pick(&templates, &mut rng) else {
        warn!(target: "qgen", step = i, skills = ?current, goals = ?goal_ids, "No compatible templates; skipping step");
        warnings.push(GenerationWarning::NoCompatibleTemplates { step: i, skills: current.to_vec(), goal_ids });
        continue;
      };

      let sample = values.generate_values_with_constraints(&template.variables, &template.constraints)?;
      if !sample.satisfied {
        warnings.push(GenerationWarning::ConstraintsUnsatisfied {
          step: i,
          template_id: template.id.clone(),
          attempts: sample.attempts,
        });
      }

      let question = fill_template(&template.template_text, &sample.values);
      let question_latex = template.template_latex.as_deref().map(|l| fill_template(l, &sample.values));

      let mut answers = self.answers.resolve(template).answers(&AnswerContext {
        template,
        values: &sample.values,
        skills: current,
        question: &question,
      });
      if answers.correct_answer >= answers.options.len() {
        warn!(
          target: "qgen",
          step = i,
          template = %template.id,
          correct_answer = answers.correct_answer,
          options = answers.options.len(),
          "Answer index out of range; clamping"
        );
        warnings.push(GenerationWarning::AnswerIndexOutOfRange {
          step: i,
          template_id: template.id.clone(),
          correct_answer: answers.correct_answer,
          options: answers.options.len(),
        });
        answers.correct_answer = answers.options.len().saturating_sub(1);
      }

      let temp_id = format!("tmp-{}", Uuid::new_v4());
      debug!(
        target: "qgen",
        step = i,
        template = %template.id,
        attempts = sample.attempts,
        question = %trunc_for_log(&question, 80),
        "Question drafted"
      );

      questions.push(ProgressiveQuestion {
        id: temp_id.clone(),
        situation_id: String::new(),
        template_id: template.id.clone(),
        goal_id: template.goal_id.clone(),
        question_index: questions.len() + 1,
        question,
        question_latex,
        options: answers.options,
        options_latex: answers.options_latex,
        correct_answer: answers.correct_answer,
        explanation: answers.explanation,
        explanation_latex: answers.explanation_latex,
        difficulty: difficulty_for(current.len(), i),
        skills_tested: current.to_vec(),
        builds_on: previous_id.replace(temp_id),
        variable_values: sample.values,
        created_at: now,
      });
    }

    let problem = Problem {
      id: mint_problem_id(&req.level, &req.subject, now, ordinal),
      level: req.level.clone(),
      subject: req.subject.clone(),
      topic: self.topic_for(&req.subject),
      skill_ids: skills.clone(),
      context_id: context.id.clone(),
      generated_by: GENERATED_BY.to_string(),
      created_at: now,
      updated_at: now,
    };

    let situation_id = format!("{}-s{}", problem.id, SITUATION_ORDER);
    link_questions(&situation_id, &mut questions);

    let situation = Situation {
      id: situation_id,
      problem_id: problem.id.clone(),
      context_id: context.id.clone(),
      context_text: context.description.clone(),
      situation_order: SITUATION_ORDER,
      created_at: now,
      questions: questions.clone(),
    };

    info!(
      target: "qgen",
      problem = %problem.id,
      context = %context.id,
      emitted = questions.len(),
      expected,
      warnings = warnings.len(),
      "Generation finished"
    );

    Ok(GenerationOutput { problem, situation, questions, warnings, seed, expected_questions: expected })
  }

  fn select_context(
    &self,
    skills: &[Skill],
    rng: &mut StdRng,
    warnings: &mut Vec<GenerationWarning>,
  ) -> Result<&Context, QGenError> {
    let full = self.catalog.find_all_supporting_skills(skills);
    if let Some(ctx) = self.pick(&full, rng) {
      return Ok(ctx);
    }

    let partial = self.catalog.find_supporting_any_skill(skills);
    match self.pick(&partial, rng) {
      Some(ctx) => {
        let unsupported: Vec<Skill> = skills
          .iter()
          .filter(|s| !ctx.compatible_skills.contains(*s))
          .cloned()
          .collect();
        warn!(target: "qgen", context = %ctx.id, unsupported = ?unsupported, "No context hosts every skill; using partial match");
        warnings.push(GenerationWarning::PartialContextMatch { context_id: ctx.id.clone(), unsupported_skills: unsupported });
        Ok(ctx)
      }
      None => Err(QGenError::NoCompatibleContext { skills: skills.to_vec() }),
    }
  }

  fn pick<'a, T>(&self, candidates: &[&'a T], rng: &mut StdRng) -> Option<&'a T> {
    match self.selection {
      SelectionPolicy::FirstMatch => candidates.first().copied(),
      SelectionPolicy::Seeded => candidates.choose(rng).copied(),
    }
  }
}

/// One skill on the first step is easy; up to two skills within the first two
/// steps is medium; everything else is hard.
pub fn difficulty_for(num_skills: usize, step: usize) -> Difficulty {
  if num_skills == 1 && step == 0 {
    Difficulty::Easy
  } else if num_skills <= 2 && step <= 1 {
    Difficulty::Medium
  } else {
    Difficulty::Hard
  }
}

/// `{level}-{subject}-{millis}`, with `-{ordinal}` for batch members.
pub fn mint_problem_id(level: &str, subject: &str, now: DateTime<Utc>, ordinal: Option<usize>) -> String {
  let base = format!("{}-{}-{}", slug(level), slug(subject), now.timestamp_millis());
  match ordinal {
    Some(k) => format!("{base}-{k}"),
    None => base,
  }
}

/// Rewrites ids to `{situation_id}-n{position}` and re-links `builds_on`
/// to the preceding emitted question.
pub fn link_questions(situation_id: &str, questions: &mut [ProgressiveQuestion]) {
  for (idx, q) in questions.iter_mut().enumerate() {
    let position = idx + 1;
    q.id = format!("{situation_id}-n{position}");
    q.situation_id = situation_id.to_string();
    q.question_index = position;
    q.builds_on = (position > 1).then(|| format!("{situation_id}-n{}", position - 1));
  }
}
