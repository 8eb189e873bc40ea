//! Small utility helpers used across modules.

use std::collections::BTreeMap;

use crate::domain::SampledValue;

/// Replaces every `{{name}}` occurrence with the rendered value. Names are
/// trimmed, so `{{ name }}` resolves the same as `{{name}}`.
/// Placeholders without a value are left untouched.
pub fn fill_template(tpl: &str, values: &BTreeMap<String, SampledValue>) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some((start, name, end)) = next_placeholder(rest) {
    out.push_str(&rest[..start]);
    match values.get(name) {
      Some(v) => out.push_str(&v.to_string()),
      None => out.push_str(&rest[start..end]),
    }
    rest = &rest[end..];
  }
  out.push_str(rest);
  out
}

/// Names of the `{{...}}` placeholders still present in `text`, in order of appearance.
pub fn placeholders(text: &str) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  let mut rest = text;
  while let Some((_, name, end)) = next_placeholder(rest) {
    if !out.iter().any(|n| n == name) {
      out.push(name.to_string());
    }
    rest = &rest[end..];
  }
  out
}

/// `(start, trimmed name, end)` of the first `{{...}}` in `text`; `end` is past the closing braces.
fn next_placeholder(text: &str) -> Option<(usize, &str, usize)> {
  let start = text.find("{{")?;
  let inner = start + 2;
  let close = text[inner..].find("}}")?;
  Some((start, text[inner..inner + close].trim(), inner + close + 2))
}

/// Lowercase, dash-separated form used when minting ids from free text.
pub fn slug(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut last_dash = true;
  for ch in s.trim().chars().flat_map(|c| c.to_lowercase()) {
    if ch.is_alphanumeric() {
      out.push(ch);
      last_dash = false;
    } else if !last_dash {
      out.push('-');
      last_dash = true;
    }
  }
  while out.ends_with('-') {
    out.pop();
  }
  out
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
