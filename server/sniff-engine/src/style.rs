//! Coding-style measurements of one commit, and how far they drift from the
//! author's retained history.
//!
//! The baseline keeps windowed running stats of each dimension, updated on
//! fold and undone on eviction like the commit-size stats.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::fingerprint;
use crate::stats::{self, RunningStats};
use crate::types::CommitRecord;

static NAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]{2,}\b").expect("valid regex"));
static CAMEL_HUMP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z][A-Z]").expect("valid regex"));
static FUNCTION_START: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^(?:(?:pub(?:\([a-z]+\))? )?(?:async )?fn |(?:async )?def |(?:async )?function |func |const \w+ = (?:async )?\(|class )",
  )
  .expect("valid regex")
});

/// Line-length spread the author must normally show before uniformity counts.
const MIN_BASELINE_SPREAD: f64 = 4.0;
/// Lines needed before line-length uniformity is judged.
const MIN_REGULARITY_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStyle {
  SnakeCase,
  CamelCase,
  Mixed,
}

impl std::fmt::Display for NamingStyle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::SnakeCase => "snake_case",
      Self::CamelCase => "camelCase",
      Self::Mixed => "mixed",
    })
  }
}

impl NamingStyle {
  /// Dominant convention: one style must outnumber the other by 1.5x.
  pub fn detect(text: &str) -> Self {
    let (mut snake, mut camel) = (0usize, 0usize);
    for m in NAME.find_iter(text) {
      let name = m.as_str();
      if name.contains('_') && name.chars().any(char::is_lowercase) && !name.chars().any(char::is_uppercase) {
        snake += 1;
      }
      if CAMEL_HUMP.is_match(name) {
        camel += 1;
      }
    }
    if snake as f64 > camel as f64 * 1.5 {
      Self::SnakeCase
    } else if camel as f64 > snake as f64 * 1.5 {
      Self::CamelCase
    } else {
      Self::Mixed
    }
  }
}

fn is_comment(trimmed: &str) -> bool {
  fingerprint::line_comment_start(trimmed) == Some(0)
    || ["/*", "*/", "* ", "<!--"].iter().any(|p| trimmed.starts_with(p))
    || trimmed == "*"
}

/// Lines per function opened in the fragment, each running until the next opener.
pub fn function_lengths(lines: &[&str]) -> Vec<usize> {
  let mut lengths = Vec::new();
  let mut current: Option<usize> = None;
  for line in lines {
    if FUNCTION_START.is_match(line.trim()) {
      lengths.extend(current.replace(1));
    } else if let Some(n) = current.as_mut() {
      *n += 1;
    }
  }
  lengths.extend(current);
  lengths
}

/// Style of the added lines of one commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleMetrics {
  /// Non-blank added lines.
  pub code_lines: usize,
  pub comment_ratio: f64,
  pub line_length_stddev: f64,
  pub naming: NamingStyle,
  /// `None` when the commit opens no function.
  pub function_length: Option<f64>,
}

impl StyleMetrics {
  pub fn measure(commit: &CommitRecord) -> Self {
    let lines: Vec<&str> = commit.added_lines().filter(|l| !l.trim().is_empty()).collect();
    let comments = lines.iter().filter(|l| is_comment(l.trim())).count();
    let lengths: Vec<f64> = lines.iter().map(|l| l.chars().count() as f64).collect();
    let functions: Vec<f64> = function_lengths(&lines).into_iter().map(|n| n as f64).collect();
    Self {
      code_lines: lines.len(),
      comment_ratio: if lines.is_empty() {
        0.0
      } else {
        comments as f64 / lines.len() as f64
      },
      line_length_stddev: stats::stddev(&lengths),
      naming: NamingStyle::detect(&lines.join("\n")),
      function_length: (!functions.is_empty()).then(|| stats::mean(&functions)),
    }
  }
}

/// Windowed style history of one author. Mirrors exactly the profile's window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleBaseline {
  comment_ratio: RunningStats,
  line_length_stddev: RunningStats,
  function_length: RunningStats,
  snake_case: usize,
  camel_case: usize,
  mixed: usize,
}

impl StyleBaseline {
  fn naming_slot(&mut self, naming: NamingStyle) -> &mut usize {
    match naming {
      NamingStyle::SnakeCase => &mut self.snake_case,
      NamingStyle::CamelCase => &mut self.camel_case,
      NamingStyle::Mixed => &mut self.mixed,
    }
  }

  pub fn push(&mut self, m: &StyleMetrics) {
    self.comment_ratio.push(m.comment_ratio);
    self.line_length_stddev.push(m.line_length_stddev);
    if let Some(f) = m.function_length {
      self.function_length.push(f);
    }
    *self.naming_slot(m.naming) += 1;
  }

  /// Undo a `push(m)` for an evicted commit.
  pub fn remove(&mut self, m: &StyleMetrics) {
    self.comment_ratio.remove(m.comment_ratio);
    self.line_length_stddev.remove(m.line_length_stddev);
    if let Some(f) = m.function_length {
      self.function_length.remove(f);
    }
    let slot = self.naming_slot(m.naming);
    *slot = slot.saturating_sub(1);
  }

  pub fn observations(&self) -> u64 {
    self.comment_ratio.count()
  }

  pub fn comment_ratio(&self) -> f64 {
    self.comment_ratio.mean()
  }

  pub fn line_length_stddev(&self) -> f64 {
    self.line_length_stddev.mean()
  }

  pub fn function_length(&self) -> Option<f64> {
    (self.function_length.count() > 0).then(|| self.function_length.mean())
  }

  /// The strictly most frequent convention, `Mixed` on a tie.
  pub fn dominant_naming(&self) -> NamingStyle {
    let counts = [
      (NamingStyle::SnakeCase, self.snake_case),
      (NamingStyle::CamelCase, self.camel_case),
      (NamingStyle::Mixed, self.mixed),
    ];
    let top = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let mut leaders = counts.iter().filter(|(_, n)| *n == top);
    match (leaders.next(), leaders.next()) {
      (Some((style, _)), None) if top > 0 => *style,
      _ => NamingStyle::Mixed,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDeviation {
  /// In [0, 1].
  pub score: f64,
  pub reasons: Vec<String>,
}

/// One-sided drift of `current` away from the author's baseline. Needs two prior commits.
pub fn deviation(baseline: &StyleBaseline, current: &StyleMetrics, config: &Config) -> StyleDeviation {
  let mut out = StyleDeviation::default();
  if baseline.observations() < 2 {
    return out;
  }
  let lines = current.code_lines;

  let spike = current.comment_ratio - baseline.comment_ratio();
  if spike > config.style_comment_spike && lines > config.style_min_lines {
    out.score += 0.25;
    out.reasons.push(format!(
      "Comment density spike (+{:.0}% above author baseline)",
      spike * 100.0
    ));
  }

  let usual_spread = baseline.line_length_stddev();
  if usual_spread > MIN_BASELINE_SPREAD
    && current.line_length_stddev < usual_spread * 0.5
    && lines > MIN_REGULARITY_LINES
  {
    out.score += 0.3;
    out.reasons.push(format!(
      "Abnormally regular line lengths (stddev {:.1} vs author baseline {:.1})",
      current.line_length_stddev, usual_spread
    ));
  }

  let usual_naming = baseline.dominant_naming();
  if current.naming != NamingStyle::Mixed
    && usual_naming != NamingStyle::Mixed
    && current.naming != usual_naming
    && lines > config.style_min_lines
  {
    out.score += 0.2;
    out.reasons.push(format!("Naming style shift ({} to {})", usual_naming, current.naming));
  }

  if let (Some(usual), Some(now)) = (baseline.function_length(), current.function_length) {
    let ratio = now / usual;
    if usual > 0.0 && ratio > config.style_function_ratio {
      out.score += 0.25;
      out.reasons.push(format!(
        "Functions {:.1}x longer than author historical average",
        ratio
      ));
    }
  }

  out.score = out.score.min(1.0);
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engines::fixtures::*;
  use crate::types::Language;

  fn measure(lines: Vec<String>) -> StyleMetrics {
    StyleMetrics::measure(&commit_with("c1", ts(10, 0), "msg", Language::Rust, lines))
  }

  fn snake_lines(n: usize) -> Vec<String> {
    (0..n)
      .map(|i| format!("let total_{} = read_value({}){};", i, i, " ".repeat(i % 9)))
      .collect()
  }

  fn baseline_of(commits: &[StyleMetrics]) -> StyleBaseline {
    let mut b = StyleBaseline::default();
    for m in commits {
      b.push(m);
    }
    b
  }

  #[test]
  fn naming_style_needs_a_clear_majority() {
    assert_eq!(NamingStyle::detect("let user_id = load_user(raw_id);"), NamingStyle::SnakeCase);
    assert_eq!(NamingStyle::detect("const userId = loadUser(rawId);"), NamingStyle::CamelCase);
    assert_eq!(NamingStyle::detect("let user_id = loadUser(x);"), NamingStyle::Mixed);
    assert_eq!(NamingStyle::detect("x = 1"), NamingStyle::Mixed);
  }

  #[test]
  fn measures_comments_and_functions() {
    let m = measure(vec![
      "// helpers".into(),
      "fn first() {".into(),
      "  one();".into(),
      "}".into(),
      "".into(),
      "pub fn second() {".into(),
      "  two();".into(),
      "  three();".into(),
      "}".into(),
    ]);
    assert_eq!(m.code_lines, 8);
    assert!((m.comment_ratio - 1.0 / 8.0).abs() < 1e-9);
    assert_eq!(m.function_length, Some(3.5));
  }

  #[test]
  fn baseline_tracks_removals() {
    let a = measure(snake_lines(20));
    let b = measure(vec!["const userId = loadUser(rawId);".into(); 20]);
    let mut base = baseline_of(&[a.clone(), a.clone(), b.clone()]);
    assert_eq!(base.dominant_naming(), NamingStyle::SnakeCase);
    base.remove(&a);
    assert_eq!(base.observations(), 2);
    assert_eq!(base.dominant_naming(), NamingStyle::Mixed);
  }

  #[test]
  fn one_prior_commit_never_deviates() {
    let config = Config::default();
    let base = baseline_of(&[measure(snake_lines(20))]);
    let heavy: Vec<String> = (0..20).map(|i| format!("// note {}", i)).collect();
    assert_eq!(deviation(&base, &measure(heavy), &config).score, 0.0);
  }

  #[test]
  fn comment_spike_and_naming_shift_add_up() {
    let config = Config::default();
    let base = baseline_of(&[measure(snake_lines(20)), measure(snake_lines(24))]);
    let mut lines: Vec<String> = (0..10).map(|i| format!("// Step {} of the loader", i)).collect();
    lines.extend((0..10).map(|i| format!("const itemCount{} = loadItems(sourceId);", i)));
    let d = deviation(&base, &measure(lines), &config);
    assert!((d.score - 0.45).abs() < 1e-9);
    assert!(d.reasons[0].contains("Comment density spike"));
    assert!(d.reasons[1].contains("snake_case to camelCase"));
  }

  #[test]
  fn uniform_lines_against_ragged_history() {
    let config = Config::default();
    let ragged = |n: usize| -> Vec<String> {
      (0..n)
        .map(|i| format!("let v_{} = f({});{}", i, i, " ".repeat((i * 7) % 23)))
        .collect()
    };
    let base = baseline_of(&[measure(ragged(30)), measure(ragged(30))]);
    assert!(base.line_length_stddev() > MIN_BASELINE_SPREAD);
    let uniform: Vec<String> = (0..30).map(|i| format!("let v_{:02} = f(1);", i)).collect();
    let d = deviation(&base, &measure(uniform), &config);
    assert!(d.reasons.iter().any(|r| r.contains("regular line lengths")));
  }

  #[test]
  fn small_commits_skip_line_gated_rules() {
    let config = Config::default();
    let base = baseline_of(&[measure(snake_lines(20)), measure(snake_lines(20))]);
    let lines: Vec<String> = (0..6).map(|i| format!("// itemCount{}", i)).collect();
    assert_eq!(deviation(&base, &measure(lines), &config).score, 0.0);
  }

  #[test]
  fn longer_functions_than_usual() {
    let config = Config::default();
    let short = || -> Vec<String> { vec!["def a():".into(), "    return 1".into()] };
    let base = baseline_of(&[measure(short()), measure(short())]);
    let mut long = vec!["def b():".to_string()];
    long.extend((0..5).map(|i| format!("    step_{}()", i)));
    let d = deviation(&base, &measure(long), &config);
    assert!((d.score - 0.25).abs() < 1e-9);
    assert!(d.reasons[0].contains("3.0x longer"));
  }
}
