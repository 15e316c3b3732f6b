//! Text perplexity of the commit message, as reported by the consumed
//! language-model scorer. This module only owns the threshold policy.

use super::EngineInput;
use crate::config::Config;
use crate::error::SignalUnavailable;
use crate::types::{CommitRecord, EngineId, EngineScore};

pub fn word_count(message: &str) -> usize {
  message.split_whitespace().count()
}

/// Whether the message is long enough to be worth sending to the scorer.
pub fn eligible(commit: &CommitRecord, config: &Config) -> bool {
  word_count(commit.message()) >= config.perplexity_min_words
}

/// Perplexity -> score. Below the ceiling: the high score. Tapers linearly to 0
/// at the moderate ceiling. Lower perplexity never scores lower.
pub fn normalize(perplexity: f64, config: &Config) -> f64 {
  let high = config.perplexity_high_score;
  let low = config.perplexity_ceiling;
  let moderate = config.perplexity_moderate_ceiling;
  if perplexity < low {
    high
  } else if perplexity < moderate {
    high * (moderate - perplexity) / (moderate - low)
  } else {
    0.0
  }
}

pub fn score(input: &EngineInput<'_>) -> Result<EngineScore, SignalUnavailable> {
  let config = input.config;
  if !eligible(input.commit, config) {
    return Err(SignalUnavailable::new(
      EngineId::Perplexity,
      format!(
        "message too short ({} words)",
        word_count(input.commit.message())
      ),
    ));
  }
  let perplexity = input
    .signals
    .perplexity
    .clone()
    .map_err(|e| SignalUnavailable::new(EngineId::Perplexity, e.to_string()))?;
  if !perplexity.is_finite() || perplexity < 0.0 {
    return Err(SignalUnavailable::new(
      EngineId::Perplexity,
      format!("invalid perplexity {}", perplexity),
    ));
  }

  let normalized = normalize(perplexity, config);
  let explanation = if perplexity < config.perplexity_ceiling {
    format!("Very low token perplexity ({:.1}), LLM-like phrasing", perplexity)
  } else if normalized > 0.0 {
    format!("Low-medium perplexity ({:.1}), possibly AI assisted", perplexity)
  } else {
    format!("Natural message perplexity ({:.1})", perplexity)
  };
  Ok(EngineScore::new(
    EngineId::Perplexity,
    perplexity,
    normalized,
    config.weights.perplexity,
    explanation,
  ))
}
