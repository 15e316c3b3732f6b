//! Message/diff semantic alignment, as reported by the consumed embedding scorer.
//!
//! People write messages from intent; generated messages summarize the code
//! they sit on. Unusually tight alignment is the signal.

use super::EngineInput;
use crate::config::Config;
use crate::error::SignalUnavailable;
use crate::fingerprint;
use crate::types::{CommitRecord, EngineId, EngineScore};

/// Identifier tokens sent to the embedding scorer.
const SUMMARY_TOKENS: usize = 200;

/// Identifier-only rendering of the added code, capped for the embedding model.
pub fn diff_summary(commit: &CommitRecord) -> String {
  fingerprint::tokens(&commit.added_text())
    .into_iter()
    .take(SUMMARY_TOKENS)
    .collect::<Vec<_>>()
    .join(" ")
}

pub fn eligible(commit: &CommitRecord, config: &Config) -> bool {
  commit.message().split_whitespace().count() >= config.semantic_min_words
    && fingerprint::tokens(&commit.added_text()).len() >= config.semantic_min_tokens
}

pub fn normalize(similarity: f64, config: &Config) -> f64 {
  if similarity > config.semantic_ceiling {
    0.8
  } else if similarity > config.semantic_moderate {
    0.5
  } else if similarity > config.semantic_low {
    0.25
  } else {
    0.0
  }
}

pub fn score(input: &EngineInput<'_>) -> Result<EngineScore, SignalUnavailable> {
  let config = input.config;
  if !eligible(input.commit, config) {
    return Err(SignalUnavailable::new(
      EngineId::Semantic,
      "too short for semantic analysis",
    ));
  }
  let similarity = input
    .signals
    .similarity
    .clone()
    .map_err(|e| SignalUnavailable::new(EngineId::Semantic, e.to_string()))?;
  if similarity.is_nan() {
    return Err(SignalUnavailable::new(EngineId::Semantic, "similarity is NaN"));
  }
  let similarity = similarity.clamp(0.0, 1.0);

  let normalized = normalize(similarity, config);
  let explanation = if similarity > config.semantic_ceiling {
    format!(
      "Very high semantic coherence (message to code: {:.2}), self-summarization pattern",
      similarity
    )
  } else if similarity > config.semantic_moderate {
    format!("High message-code semantic alignment ({:.2})", similarity)
  } else if normalized > 0.0 {
    format!("Moderate semantic alignment ({:.2})", similarity)
  } else {
    "Natural human-style message-code divergence".to_string()
  };
  Ok(EngineScore::new(
    EngineId::Semantic,
    similarity,
    normalized,
    config.weights.semantic,
    explanation,
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::baseline::AuthorProfile;
  use crate::engines::fixtures::*;
  use crate::engines::InferenceSignals;
  use crate::error::InferenceError;
  use crate::types::Language;

  fn commit() -> CommitRecord {
    commit_with(
      "c1",
      ts(10, 0),
      "Add user validation to the signup handler",
      Language::TypeScript,
      vec![
        "function validateUser(user) {".into(),
        "  if (!user.email) throw new ValidationError('email required');".into(),
        "  return signupHandler(user);".into(),
        "}".into(),
      ],
    )
  }

  fn run(commit: &CommitRecord, similarity: Result<f64, InferenceError>) -> Result<EngineScore, SignalUnavailable> {
    let config = Config::default();
    let profile = AuthorProfile::new("alice", 10);
    let signals = InferenceSignals {
      perplexity: Err(InferenceError::NotConfigured),
      similarity,
    };
    score(&EngineInput {
      commit,
      profile: &profile,
      fingerprint: None,
      signals: &signals,
      config: &config,
    })
  }

  #[test]
  fn high_alignment_scores_high() {
    let s = run(&commit(), Ok(0.72)).unwrap();
    assert!((s.normalized_score - 0.8).abs() < 1e-9);
  }

  #[test]
  fn divergent_message_scores_zero() {
    let s = run(&commit(), Ok(0.1)).unwrap();
    assert_eq!(s.normalized_score, 0.0);
  }

  #[test]
  fn unavailable_service_excluded() {
    assert!(run(&commit(), Err(InferenceError::Unavailable("timeout".into()))).is_err());
  }

  #[test]
  fn summary_is_identifiers_only() {
    let summary = diff_summary(&commit());
    assert!(summary.starts_with("function validateUser user"));
    assert!(!summary.contains('('));
  }

  #[test]
  fn out_of_range_similarity_is_clamped() {
    let s = run(&commit(), Ok(1.7)).unwrap();
    assert_eq!(s.raw_value, 1.0);
  }
}
