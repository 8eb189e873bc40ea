//! Deterministic value sampling for template variables.
//!
//! The generator is a tiny linear-congruential sequence:
//!   seed' = (seed * 9301 + 49297) mod 233280,  draw = seed' / 233280
//!
//! It is NOT a source of real randomness. The only guarantee is that two
//! generators built with the same seed produce the same values.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument, warn};

use crate::domain::{
  ConstraintCondition, SampledValue, TemplateConstraint, VariableDefinition, VariableType,
};
use crate::error::QGenError;

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233280;

/// Default retry budget for constrained sampling.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Curated "nice" fractions.
const FRACTIONS: &[(i64, i64)] = &[
  (1, 2), (1, 3), (2, 3), (1, 4), (3, 4),
  (1, 5), (2, 5), (3, 5), (4, 5), (1, 6),
  (5, 6), (1, 8), (3, 8), (5, 8), (7, 8),
];

/// Result of a constrained sampling run.
#[derive(Clone, Debug)]
pub struct ConstrainedSample {
  pub values: BTreeMap<String, SampledValue>,
  /// Number of full re-samplings performed.
  pub attempts: usize,
  /// False when the budget ran out and `values` is an unconstrained sample.
  pub satisfied: bool,
}

#[derive(Debug)]
pub struct ValueGenerator {
  seed: u64,
  max_attempts: usize,
  previous: HashMap<String, SampledValue>,
}

impl ValueGenerator {
  pub fn new(seed: u64) -> Self {
    Self {
      seed: seed % LCG_MODULUS,
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      previous: HashMap::new(),
    }
  }

  pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
    self.max_attempts = max_attempts.max(1);
    self
  }

  #[allow(dead_code)]
  /// Reinitialize for deterministic replay.
  pub fn reset(&mut self, seed: u64) {
    self.seed = seed % LCG_MODULUS;
    self.previous.clear();
  }

  /// Next draw in `[0, 1)`.
  pub fn next_f64(&mut self) -> f64 {
    self.seed = (self.seed * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
    self.seed as f64 / LCG_MODULUS as f64
  }

  /// Uniform index in `0..len` (len must be > 0).
  fn pick(&mut self, len: usize) -> usize {
    let idx = (self.next_f64() * len as f64).floor() as usize;
    idx.min(len - 1)
  }

  #[allow(dead_code)]
  /// Last value sampled for `name`, if any.
  pub fn previous_value(&self, name: &str) -> Option<&SampledValue> {
    self.previous.get(name)
  }

  #[allow(dead_code)]
  pub fn previous_values(&self) -> &HashMap<String, SampledValue> {
    &self.previous
  }

  pub fn generate_value(&mut self, var: &VariableDefinition) -> Result<SampledValue, QGenError> {
    let value = match var.var_type {
      VariableType::Integer => {
        let (min, max) = numeric_bounds(var)?;
        let (min, max) = (min.ceil(), max.floor());
        if min > max {
          return Err(invalid(var, "range holds no integer"));
        }
        if min < i64::MIN as f64 || max > i64::MAX as f64 {
          return Err(invalid(var, "range does not fit in a 64-bit integer"));
        }
        // Span math in i128: `max - min` overflows i64 for wide ranges.
        let min = min as i64 as i128;
        let span = max as i64 as i128 - min;
        let offset = match var.step.filter(|s| *s >= 5.0) {
          Some(step) => {
            if step.fract() != 0.0 {
              return Err(invalid(var, "integer step must be a whole number"));
            }
            let step = step as i128;
            let steps = span / step;
            let index = ((self.next_f64() * (steps + 1) as f64).floor() as i128).min(steps);
            index * step
          }
          None => ((self.next_f64() * (span + 1) as f64).floor() as i128).min(span),
        };
        let value = i64::try_from(min + offset)
          .map_err(|_| invalid(var, "sampled value does not fit in a 64-bit integer"))?;
        SampledValue::Integer(value)
      }
      VariableType::Decimal => {
        let (min, max) = numeric_bounds(var)?;
        match var.step.filter(|s| *s >= 1.0) {
          Some(step) => {
            let steps = ((max - min) / step).floor();
            let index = (self.next_f64() * (steps + 1.0)).floor().min(steps);
            SampledValue::Decimal(round2(min + index * step))
          }
          None => SampledValue::Decimal(round2(min + self.next_f64() * (max - min))),
        }
      }
      VariableType::Fraction => {
        let (numerator, denominator) = FRACTIONS[self.pick(FRACTIONS.len())];
        SampledValue::Fraction { numerator, denominator }
      }
      VariableType::Categorical => {
        let options = var
          .options
          .as_ref()
          .filter(|o| !o.is_empty())
          .ok_or_else(|| QGenError::MissingOptions { variable: var.name.clone() })?;
        SampledValue::Text(options[self.pick(options.len())].clone())
      }
    };
    Ok(value)
  }

  /// One unconstrained sample of every variable.
  pub fn generate_values(
    &mut self,
    variables: &[VariableDefinition],
  ) -> Result<BTreeMap<String, SampledValue>, QGenError> {
    let mut out = BTreeMap::new();
    for var in variables {
      let v = self.generate_value(var)?;
      out.insert(var.name.clone(), v);
    }
    for (k, v) in &out {
      self.previous.insert(k.clone(), v.clone());
    }
    Ok(out)
  }

  /// Re-samples every variable until all constraints hold or the budget runs out.
  /// On exhaustion a fresh unconstrained sample is returned with `satisfied = false`.
  #[instrument(level = "debug", skip_all, fields(vars = variables.len(), constraints = constraints.len()))]
  pub fn generate_values_with_constraints(
    &mut self,
    variables: &[VariableDefinition],
    constraints: &[TemplateConstraint],
  ) -> Result<ConstrainedSample, QGenError> {
    if constraints.is_empty() {
      let values = self.generate_values(variables)?;
      return Ok(ConstrainedSample { values, attempts: 1, satisfied: true });
    }

    for attempt in 1..=self.max_attempts {
      let values = self.generate_values(variables)?;
      if constraints.iter().all(|c| check_constraint(c, &values)) {
        debug!(target: "qgen", attempt, "Constraints satisfied");
        return Ok(ConstrainedSample { values, attempts: attempt, satisfied: true });
      }
    }

    warn!(target: "qgen", max_attempts = self.max_attempts, "Could not satisfy constraints; using unconstrained values");
    let values = self.generate_values(variables)?;
    Ok(ConstrainedSample { values, attempts: self.max_attempts, satisfied: false })
  }
}

/// Wall-clock seed in milliseconds.
pub fn time_seed() -> u64 {
  chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// True when `values` satisfies `constraint`. Unknown variables never satisfy.
pub fn check_constraint(constraint: &TemplateConstraint, values: &BTreeMap<String, SampledValue>) -> bool {
  let Some(value) = values.get(&constraint.variable) else {
    return false;
  };
  let operand = constraint.value.as_ref();
  match constraint.condition {
    ConstraintCondition::Equals => operand.map_or(false, |o| value.same_as(o)),
    ConstraintCondition::NotEquals => operand.map_or(true, |o| !value.same_as(o)),
    ConstraintCondition::GreaterThan => compare(value, operand, |a, b| a > b),
    ConstraintCondition::LessThan => compare(value, operand, |a, b| a < b),
    ConstraintCondition::DivisibleBy => match (value.as_f64(), operand.and_then(SampledValue::as_f64)) {
      (Some(v), Some(k)) if k != 0.0 => v % k == 0.0,
      _ => false,
    },
    ConstraintCondition::Prime => match value {
      SampledValue::Integer(n) => is_prime(*n),
      _ => false,
    },
  }
}

fn compare(value: &SampledValue, operand: Option<&SampledValue>, op: impl Fn(f64, f64) -> bool) -> bool {
  match (value.as_f64(), operand.and_then(SampledValue::as_f64)) {
    (Some(a), Some(b)) => op(a, b),
    _ => false,
  }
}

/// Trial division up to √n, skipping multiples of 2 and 3.
pub fn is_prime(n: i64) -> bool {
  if n <= 1 {
    return false;
  }
  if n <= 3 {
    return true;
  }
  if n % 2 == 0 || n % 3 == 0 {
    return false;
  }
  let mut i = 5;
  while i * i <= n {
    if n % i == 0 || n % (i + 2) == 0 {
      return false;
    }
    i += 6;
  }
  true
}

fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

fn numeric_bounds(var: &VariableDefinition) -> Result<(f64, f64), QGenError> {
  let min = var.min.ok_or_else(|| invalid(var, "missing min"))?;
  let max = var.max.ok_or_else(|| invalid(var, "missing max"))?;
  if min > max {
    return Err(invalid(var, "min is greater than max"));
  }
  Ok((min, max))
}

fn invalid(var: &VariableDefinition, reason: &str) -> QGenError {
  QGenError::InvalidVariable { variable: var.name.clone(), reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn int_var(name: &str, min: f64, max: f64, step: Option<f64>) -> VariableDefinition {
    VariableDefinition {
      name: name.into(),
      var_type: VariableType::Integer,
      min: Some(min),
      max: Some(max),
      step,
      unit: None,
      options: None,
    }
  }

  fn constraint(var: &str, condition: ConstraintCondition, value: Option<SampledValue>) -> TemplateConstraint {
    TemplateConstraint { variable: var.into(), condition, value }
  }

  #[test]
  fn lcg_matches_reference_sequence() {
    let mut g = ValueGenerator::new(1);
    // (1 * 9301 + 49297) % 233280 = 58598
    assert_eq!(g.next_f64(), 58598.0 / 233280.0);
    // (58598 * 9301 + 49297) % 233280
    let expected = ((58598u64 * 9301 + 49297) % 233280) as f64 / 233280.0;
    assert_eq!(g.next_f64(), expected);
  }

  #[test]
  fn large_seeds_reduce_to_the_same_sequence() {
    let mut a = ValueGenerator::new(233280 * 7 + 42);
    let mut b = ValueGenerator::new(42);
    for _ in 0..10 {
      assert_eq!(a.next_f64(), b.next_f64());
    }
  }

  #[test]
  fn same_seed_same_values() {
    let vars = vec![
      int_var("a", 1.0, 100.0, None),
      int_var("b", 100.0, 1000.0, Some(50.0)),
      VariableDefinition { var_type: VariableType::Fraction, ..int_var("f", 0.0, 0.0, None) },
    ];
    let mut g1 = ValueGenerator::new(1234);
    let mut g2 = ValueGenerator::new(1234);
    for _ in 0..20 {
      let v1 = g1.generate_values(&vars).expect("values");
      let v2 = g2.generate_values(&vars).expect("values");
      assert_eq!(format!("{v1:?}"), format!("{v2:?}"));
    }
  }

  #[test]
  fn reset_replays_the_sequence() {
    let var = int_var("x", 0.0, 1000.0, None);
    let mut g = ValueGenerator::new(99);
    let first: Vec<String> = (0..5).map(|_| g.generate_value(&var).expect("v").to_string()).collect();
    g.reset(99);
    let again: Vec<String> = (0..5).map(|_| g.generate_value(&var).expect("v").to_string()).collect();
    assert_eq!(first, again);
  }

  #[test]
  fn integers_stay_in_range_and_on_step() {
    let mut g = ValueGenerator::new(7);
    let plain = int_var("p", 3.0, 9.0, None);
    let stepped = int_var("s", 100.0, 1000.0, Some(50.0));
    for _ in 0..500 {
      match g.generate_value(&plain).expect("p") {
        SampledValue::Integer(v) => assert!((3..=9).contains(&v)),
        other => panic!("unexpected {other:?}"),
      }
      match g.generate_value(&stepped).expect("s") {
        SampledValue::Integer(v) => {
          assert!((100..=1000).contains(&v));
          assert_eq!((v - 100) % 50, 0);
        }
        other => panic!("unexpected {other:?}"),
      }
    }
  }

  #[test]
  fn decimals_are_rounded_to_cents() {
    let mut g = ValueGenerator::new(3);
    let var = VariableDefinition {
      var_type: VariableType::Decimal,
      ..int_var("d", 1.0, 2.0, Some(0.1))
    };
    for _ in 0..200 {
      let v = g.generate_value(&var).expect("d").as_f64().expect("numeric");
      assert!((1.0..=2.0).contains(&v));
      assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-6);
    }
  }

  #[test]
  fn fractions_come_from_curated_list() {
    let mut g = ValueGenerator::new(11);
    let var = VariableDefinition { var_type: VariableType::Fraction, ..int_var("f", 0.0, 0.0, None) };
    for _ in 0..100 {
      match g.generate_value(&var).expect("f") {
        SampledValue::Fraction { numerator, denominator } => {
          assert!(FRACTIONS.contains(&(numerator, denominator)))
        }
        other => panic!("unexpected {other:?}"),
      }
    }
  }

  #[test]
  fn categorical_without_options_is_an_error() {
    let mut g = ValueGenerator::new(1);
    let var = VariableDefinition {
      name: "producto".into(),
      var_type: VariableType::Categorical,
      min: None,
      max: None,
      step: None,
      unit: None,
      options: None,
    };
    assert!(matches!(g.generate_value(&var), Err(QGenError::MissingOptions { .. })));
  }

  #[test]
  fn missing_bounds_are_invalid() {
    let mut g = ValueGenerator::new(1);
    let var = VariableDefinition { max: None, ..int_var("x", 0.0, 1.0, None) };
    assert!(matches!(g.generate_value(&var), Err(QGenError::InvalidVariable { .. })));
  }

  #[test]
  fn out_of_range_integer_bounds_are_invalid() {
    let mut g = ValueGenerator::new(1);
    let var = int_var("x", -1.0e19, 1.0e19, None);
    assert!(matches!(g.generate_value(&var), Err(QGenError::InvalidVariable { .. })));
    let stepped = int_var("x", -1.0e19, 1.0e19, Some(10.0));
    assert!(matches!(g.generate_value(&stepped), Err(QGenError::InvalidVariable { .. })));
  }

  #[test]
  fn widest_integer_range_samples_without_overflow() {
    let mut g = ValueGenerator::new(17);
    let lo = -9.0e18;
    let hi = 9.0e18;
    for step in [None, Some(1000.0)] {
      let var = int_var("x", lo, hi, step);
      for _ in 0..100 {
        match g.generate_value(&var).expect("wide") {
          SampledValue::Integer(v) => assert!((lo as i64..=hi as i64).contains(&v)),
          other => panic!("unexpected {other:?}"),
        }
      }
    }
  }

  #[test]
  fn fractional_integer_step_is_invalid() {
    let mut g = ValueGenerator::new(1);
    let var = int_var("x", 0.0, 100.0, Some(7.5));
    assert!(matches!(g.generate_value(&var), Err(QGenError::InvalidVariable { .. })));
    // Steps below 5 are not applied, so their fraction is irrelevant.
    assert!(g.generate_value(&int_var("y", 0.0, 100.0, Some(2.5))).is_ok());
  }

  #[test]
  fn divisible_by_constraint_is_satisfied() {
    let vars = vec![int_var("n", 1.0, 60.0, None)];
    let cons = vec![constraint("n", ConstraintCondition::DivisibleBy, Some(SampledValue::Integer(4)))];
    for seed in 0..50 {
      let mut g = ValueGenerator::new(seed);
      let sample = g.generate_values_with_constraints(&vars, &cons).expect("sample");
      assert!(sample.satisfied, "seed {seed} failed");
      match sample.values["n"] {
        SampledValue::Integer(n) => assert_eq!(n % 4, 0),
        ref other => panic!("unexpected {other:?}"),
      }
    }
  }

  #[test]
  fn impossible_constraints_fall_back() {
    let vars = vec![int_var("n", 1.0, 10.0, None)];
    let cons = vec![constraint("n", ConstraintCondition::GreaterThan, Some(SampledValue::Integer(100)))];
    let mut g = ValueGenerator::new(5).with_max_attempts(10);
    let sample = g.generate_values_with_constraints(&vars, &cons).expect("sample");
    assert!(!sample.satisfied);
    assert_eq!(sample.attempts, 10);
    assert!(sample.values.contains_key("n"));
  }

  #[test]
  fn constraint_checks() {
    let mut values = BTreeMap::new();
    values.insert("n".to_string(), SampledValue::Integer(13));
    values.insert("t".to_string(), SampledValue::Text("kg".into()));
    let check = |c: TemplateConstraint| check_constraint(&c, &values);

    assert!(check(constraint("n", ConstraintCondition::Prime, None)));
    assert!(check(constraint("n", ConstraintCondition::Equals, Some(SampledValue::Integer(13)))));
    assert!(check(constraint("n", ConstraintCondition::NotEquals, Some(SampledValue::Integer(12)))));
    assert!(check(constraint("n", ConstraintCondition::LessThan, Some(SampledValue::Decimal(13.5)))));
    assert!(!check(constraint("n", ConstraintCondition::DivisibleBy, Some(SampledValue::Integer(0)))));
    assert!(!check(constraint("t", ConstraintCondition::GreaterThan, Some(SampledValue::Integer(1)))));
    assert!(check(constraint("t", ConstraintCondition::Equals, Some(SampledValue::Text("kg".into())))));
    assert!(!check(constraint("missing", ConstraintCondition::NotEquals, None)));
  }

  #[test]
  fn primality() {
    let primes: Vec<i64> = (0..40).filter(|n| is_prime(*n)).collect();
    assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37]);
    assert!(!is_prime(25));
    assert!(!is_prime(49));
    assert!(is_prime(7919));
  }

  #[test]
  fn previous_values_track_last_sample() {
    let mut g = ValueGenerator::new(8);
    let vars = vec![int_var("x", 0.0, 10.0, None)];
    let values = g.generate_values(&vars).expect("values");
    assert!(g.previous_value("x").expect("x").same_as(&values["x"]));
    g.reset(8);
    assert!(g.previous_values().is_empty());
  }
}
