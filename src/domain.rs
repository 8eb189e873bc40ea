//! Domain models: catalog records (contexts, goals, mappings, templates) and the
//! generated records (problem, situation, progressive questions).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Skills are opaque curriculum codes such as `"numeros-porcentajes"`.
pub type Skill = String;

/// A reusable scenario able to host a set of skills.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Context {
  pub id: String,
  pub category: String,
  /// Narrative copied verbatim into the situation text.
  pub description: String,
  #[serde(default)]
  pub compatible_skills: BTreeSet<Skill>,
}

impl Context {
  pub fn supports_all(&self, skills: &[Skill]) -> bool {
    skills.iter().all(|s| self.compatible_skills.contains(s))
  }

  pub fn supports_any(&self, skills: &[Skill]) -> bool {
    skills.iter().any(|s| self.compatible_skills.contains(s))
  }
}

/// A pedagogical intent ("compute a percentage", "compare fractions", ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Goal {
  pub id: String,
  pub cognitive_level: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub metadata: BTreeMap<String, String>,
}

/// Rule stating which skill subsets justify using a goal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct GoalSkillMapping {
  pub goal_id: String,
  #[serde(default)]
  pub skill_combination: Vec<Skill>,
  #[serde(default)]
  pub min_skills: usize,
  #[serde(default)]
  pub max_skills: Option<usize>,
}

impl GoalSkillMapping {
  /// `skills` may be a superset of the combination; the count bounds are inclusive.
  pub fn is_satisfied_by(&self, skills: &[Skill]) -> bool {
    let n = skills.len();
    if n < self.min_skills {
      return false;
    }
    if let Some(max) = self.max_skills {
      if n > max {
        return false;
      }
    }
    self.skill_combination.iter().all(|s| skills.contains(s))
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
  Integer,
  Decimal,
  Fraction,
  Categorical,
}

/// A placeholder of a template. Numeric kinds use `min`/`max`/`step`,
/// categorical kinds use `options`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct VariableDefinition {
  pub name: String,
  #[serde(rename = "type")]
  pub var_type: VariableType,
  #[serde(default)] pub min: Option<f64>,
  #[serde(default)] pub max: Option<f64>,
  #[serde(default)] pub step: Option<f64>,
  #[serde(default)] pub unit: Option<String>,
  #[serde(default)] pub options: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintCondition {
  Equals,
  NotEquals,
  GreaterThan,
  LessThan,
  DivisibleBy,
  Prime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateConstraint {
  pub variable: String,
  pub condition: ConstraintCondition,
  #[serde(default)]
  pub value: Option<SampledValue>,
}

/// A parameterized question bound to one goal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Template {
  pub id: String,
  pub name: String,
  pub template_text: String,
  #[serde(default)]
  pub template_latex: Option<String>,
  pub goal_id: String,
  #[serde(default)]
  pub required_skills: BTreeSet<Skill>,
  #[serde(default)]
  pub compatible_contexts: BTreeSet<String>,
  #[serde(default)]
  pub variables: Vec<VariableDefinition>,
  #[serde(default)]
  pub constraints: Vec<TemplateConstraint>,
  #[serde(default = "default_difficulty_level")]
  pub difficulty_level: u8,
}

fn default_difficulty_level() -> u8 { 1 }

/// A concrete value produced for a template variable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampledValue {
  Integer(i64),
  Decimal(f64),
  Fraction { numerator: i64, denominator: i64 },
  Text(String),
}

impl SampledValue {
  /// Numeric view used by ordering and divisibility checks.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      SampledValue::Integer(i) => Some(*i as f64),
      SampledValue::Decimal(d) => Some(*d),
      SampledValue::Fraction { numerator, denominator } if *denominator != 0 => {
        Some(*numerator as f64 / *denominator as f64)
      }
      _ => None,
    }
  }

  /// Identity comparison: numbers by value, fractions by both terms, text by string.
  pub fn same_as(&self, other: &SampledValue) -> bool {
    match (self, other) {
      (
        SampledValue::Fraction { numerator: n1, denominator: d1 },
        SampledValue::Fraction { numerator: n2, denominator: d2 },
      ) => n1 == n2 && d1 == d2,
      (SampledValue::Fraction { .. }, _) | (_, SampledValue::Fraction { .. }) => false,
      (SampledValue::Text(a), SampledValue::Text(b)) => a == b,
      (SampledValue::Text(_), _) | (_, SampledValue::Text(_)) => false,
      (a, b) => a.as_f64() == b.as_f64(),
    }
  }
}

impl fmt::Display for SampledValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SampledValue::Integer(i) => write!(f, "{i}"),
      SampledValue::Decimal(d) => write!(f, "{d}"),
      SampledValue::Fraction { numerator, denominator } => write!(f, "{numerator}/{denominator}"),
      SampledValue::Text(s) => f.write_str(s),
    }
  }
}

/// Difficulty assigned to a generated question from its position in the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

/// Root record of one generation session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
  pub id: String,
  pub level: String,
  pub subject: String,
  pub topic: String,
  pub skill_ids: Vec<Skill>,
  pub context_id: String,
  pub generated_by: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Rendered scenario instance hosting the question chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Situation {
  pub id: String,
  pub problem_id: String,
  pub context_id: String,
  pub context_text: String,
  pub situation_order: u32,
  pub created_at: DateTime<Utc>,
  pub questions: Vec<ProgressiveQuestion>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveQuestion {
  pub id: String,
  pub situation_id: String,
  pub template_id: String,
  pub goal_id: String,
  /// 1-based position inside the situation.
  pub question_index: usize,
  pub question: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub question_latex: Option<String>,
  pub options: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options_latex: Option<Vec<String>>,
  pub correct_answer: usize,
  pub explanation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation_latex: Option<String>,
  pub difficulty: Difficulty,
  pub skills_tested: Vec<Skill>,
  #[serde(default)]
  pub builds_on: Option<String>,
  #[serde(default)]
  pub variable_values: BTreeMap<String, SampledValue>,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mapping(combo: &[&str], min: usize, max: Option<usize>) -> GoalSkillMapping {
    GoalSkillMapping {
      goal_id: "g".into(),
      skill_combination: combo.iter().map(|s| s.to_string()).collect(),
      min_skills: min,
      max_skills: max,
    }
  }

  fn skills(list: &[&str]) -> Vec<Skill> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn mapping_accepts_supersets_within_bounds() {
    let m = mapping(&["a"], 1, Some(2));
    assert!(m.is_satisfied_by(&skills(&["a"])));
    assert!(m.is_satisfied_by(&skills(&["a", "b"])));
    assert!(!m.is_satisfied_by(&skills(&["a", "b", "c"])));
    assert!(!m.is_satisfied_by(&skills(&["b"])));
  }

  #[test]
  fn mapping_without_max_only_checks_lower_bound() {
    let m = mapping(&["a", "b"], 2, None);
    assert!(!m.is_satisfied_by(&skills(&["a"])));
    assert!(m.is_satisfied_by(&skills(&["b", "x", "a", "y"])));
  }

  #[test]
  fn values_render_like_plain_strings() {
    assert_eq!(SampledValue::Integer(25).to_string(), "25");
    assert_eq!(SampledValue::Decimal(12.5).to_string(), "12.5");
    assert_eq!(SampledValue::Decimal(12.0).to_string(), "12");
    assert_eq!(SampledValue::Fraction { numerator: 3, denominator: 4 }.to_string(), "3/4");
    assert_eq!(SampledValue::Text("kg".into()).to_string(), "kg");
  }

  #[test]
  fn identity_compares_numbers_by_value() {
    assert!(SampledValue::Integer(5).same_as(&SampledValue::Decimal(5.0)));
    assert!(!SampledValue::Integer(5).same_as(&SampledValue::Text("5".into())));
    let half = SampledValue::Fraction { numerator: 1, denominator: 2 };
    assert!(half.same_as(&SampledValue::Fraction { numerator: 1, denominator: 2 }));
    assert!(!half.same_as(&SampledValue::Fraction { numerator: 2, denominator: 4 }));
  }

  #[test]
  fn template_parses_from_toml() {
    let src = r#"
      id = "t1"
      name = "Descuento"
      template_text = "Precio {{precio}} con {{descuento}}%"
      goal_id = "calcular-porcentaje"
      required_skills = ["numeros-porcentajes"]
      compatible_contexts = ["tienda"]

      [[variables]]
      name = "descuento"
      type = "integer"
      min = 5
      max = 50
      step = 5

      [[constraints]]
      variable = "descuento"
      condition = "divisible-by"
      value = 5
    "#;
    let t: Template = toml::from_str(src).expect("template");
    assert_eq!(t.variables[0].var_type, VariableType::Integer);
    assert_eq!(t.constraints[0].condition, ConstraintCondition::DivisibleBy);
    assert!(matches!(t.constraints[0].value, Some(SampledValue::Integer(5))));
    assert_eq!(t.difficulty_level, 1);
  }
}
