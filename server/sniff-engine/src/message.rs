//! Deterministic commit-message heuristics. No model involved, so they run
//! even when no inference service is wired in.

use std::sync::LazyLock;

use regex::Regex;

static CONVENTIONAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^(feat|fix|chore|refactor|style|docs|test|build|ci|perf|revert)(\([a-z\-]+\))?!?:\s")
    .expect("valid regex")
});

/// Boilerplate openers; only telling in long messages or large diffs.
const TEMPLATE_PHRASES: &[&str] = &[
  "this commit introduces",
  "the following changes were made",
  "this pr adds",
  "this pull request",
  "as part of this change",
  "this change implements",
  "to ensure",
  "in order to",
  "the purpose of this",
];

const INFORMAL_MARKERS: &[&str] = &[
  "dont", "cant", "wont", "gonna", "lol", "tbh", "imo", "nvm", "btw", "!!!", "???", "hmm", "oops",
  "wtf", "asap",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageAssessment {
  /// In [0, 1].
  pub score: f64,
  pub reasons: Vec<String>,
}

/// Informal markers, plus one for a message that starts lowercase.
fn informal_traces(message: &str) -> usize {
  let lower = message.to_lowercase();
  let markers = lower.split_whitespace().filter(|w| INFORMAL_MARKERS.contains(w)).count();
  let lowercase_start = message.chars().next().is_some_and(char::is_lowercase);
  markers + usize::from(lowercase_start)
}

/// Score a commit message against the size of its diff.
pub fn assess(message: &str, diff_lines: u32) -> MessageAssessment {
  let mut out = MessageAssessment::default();
  let text = message.trim();
  if text.chars().count() < 2 {
    return out;
  }
  let words = text.split_whitespace().count();
  let lower = text.to_lowercase();
  let title = text.lines().next().unwrap_or("");

  if CONVENTIONAL_PREFIX.is_match(text) {
    out.score += 0.5;
    out.reasons.push("Conventional commit format".to_string());
  }

  let polished = title.chars().next().is_some_and(char::is_uppercase)
    && title.ends_with('.')
    && informal_traces(text) == 0;
  if polished && words > 4 {
    out.score += 0.25;
    out.reasons.push("Overly polished message with no informal traces".to_string());
  }

  if words <= 2 {
    out.score += 0.3;
    out.reasons.push(format!("Extremely terse message ({} words)", words));
  }

  if diff_lines > 50 || words > 20 {
    if let Some(phrase) = TEMPLATE_PHRASES.iter().find(|p| lower.contains(*p)) {
      out.score += 0.4;
      out.reasons.push(format!("Template phrasing in message: '{}'", phrase));
    }
  }

  if words > 50 && diff_lines > 0 && diff_lines < 10 {
    out.score += 0.35;
    out.reasons.push(format!(
      "Long message ({} words) for a tiny diff ({} lines)",
      words, diff_lines
    ));
  }
  if words < 5 && diff_lines > 100 {
    out.score += 0.3;
    out.reasons.push(format!(
      "Tiny message ({} words) for a large diff ({} lines)",
      words, diff_lines
    ));
  }

  if text.matches("\n- ").count() >= 2 || text.matches("\n* ").count() >= 2 {
    out.score += 0.2;
    out.reasons.push("Markdown bullet list in message".to_string());
  }

  out.score = out.score.min(1.0);
  out
}
