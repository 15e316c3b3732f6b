//! Engine configuration with sane defaults.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::EngineId;

/// Nominal weights of the five weighted engines. Must sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineWeights {
  pub structural: f64,
  pub perplexity: f64,
  pub semantic: f64,
  pub z_score: f64,
  pub sim_hash: f64,
}

impl Default for EngineWeights {
  fn default() -> Self {
    Self {
      structural: 0.40,
      perplexity: 0.15,
      semantic: 0.10,
      z_score: 0.15,
      sim_hash: 0.20,
    }
  }
}

impl EngineWeights {
  pub fn weight_for(&self, engine: EngineId) -> f64 {
    match engine {
      EngineId::Structural => self.structural,
      EngineId::Perplexity => self.perplexity,
      EngineId::Semantic => self.semantic,
      EngineId::ZScore => self.z_score,
      EngineId::SimHash => self.sim_hash,
      EngineId::Velocity => 0.0,
    }
  }

  pub fn total(&self) -> f64 {
    self.structural + self.perplexity + self.semantic + self.z_score + self.sim_hash
  }
}

/// Tunable thresholds for every engine, the aggregator, and escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub weights: EngineWeights,

  /// Unique identifiers / identifier occurrences below this is "repetitive".
  pub lexical_uniqueness_threshold: f64,
  /// Identifier occurrences needed before uniqueness is judged.
  pub min_identifiers: usize,
  /// Comment/docstring lines over total lines above this is suspicious.
  pub comment_density_threshold: f64,
  /// Added lines needed before density and regularity are judged.
  pub min_structural_lines: usize,
  /// Block nesting past this abandons the parse for the token fallback.
  pub max_structural_depth: usize,

  /// Lines per minute above which typing is implausible.
  pub velocity_ceiling_lpm: f64,
  /// Additive boost for implausible velocity.
  pub velocity_boost: f64,
  /// Elapsed time below this is too short to measure velocity.
  pub min_elapsed_seconds: i64,

  pub burst_window_minutes: i64,
  pub burst_min_commits: usize,
  pub burst_min_large: usize,
  pub burst_large_lines: u32,
  /// Additive boost for a commit inside a detected burst.
  pub burst_boost: f64,

  /// Similarity at or above which a prior diff counts as near-identical.
  pub simhash_flag_threshold: f64,
  /// Similarity below which no duplicate score is given.
  pub simhash_min_similarity: f64,

  /// z at or above which the baseline engine saturates.
  pub z_score_ceiling: f64,
  /// Floor applied to the baseline stddev so identical sizes do not divide by zero.
  pub z_score_min_stddev: f64,

  /// Added lines a commit needs before comment and naming drift are judged.
  pub style_min_lines: usize,
  /// Comment-ratio rise over the author's mean that counts as a spike.
  pub style_comment_spike: f64,
  /// Mean function length over the author's mean above this ratio is anomalous.
  pub style_function_ratio: f64,
  /// Multiplier on style drift before it competes with the size z-score.
  pub style_scale: f64,

  /// Additive boost at a message heuristic score of 1.
  pub message_boost: f64,

  /// Perplexity below this maps to `perplexity_high_score`.
  pub perplexity_ceiling: f64,
  /// Perplexity at or above this maps to 0; linear in between.
  pub perplexity_moderate_ceiling: f64,
  pub perplexity_high_score: f64,
  pub perplexity_min_words: usize,

  /// Message/diff similarity above this maps to the top semantic score.
  pub semantic_ceiling: f64,
  pub semantic_moderate: f64,
  pub semantic_low: f64,
  pub semantic_min_words: usize,
  pub semantic_min_tokens: usize,

  /// Lower bound (inclusive) of the borderline band.
  pub borderline_threshold: f64,
  /// Scores strictly above this are LikelyAi.
  pub ai_threshold: f64,
  /// Leaderboard "high confidence" cutoff.
  pub high_confidence_threshold: f64,

  /// Commits retained per author for baseline and duplicate comparison.
  pub window_capacity: usize,

  pub escalation_timeout_ms: u64,
  /// Max chars of added text sent to the arbiter.
  pub diff_summary_max_chars: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      weights: EngineWeights::default(),
      lexical_uniqueness_threshold: 0.30,
      min_identifiers: 20,
      comment_density_threshold: 0.15,
      min_structural_lines: 10,
      max_structural_depth: 256,
      velocity_ceiling_lpm: 50.0,
      velocity_boost: 0.4,
      min_elapsed_seconds: 30,
      burst_window_minutes: 10,
      burst_min_commits: 5,
      burst_min_large: 3,
      burst_large_lines: 20,
      burst_boost: 0.1,
      simhash_flag_threshold: 0.85,
      simhash_min_similarity: 0.80,
      z_score_ceiling: 3.0,
      z_score_min_stddev: 1.0,
      style_min_lines: 15,
      style_comment_spike: 0.10,
      style_function_ratio: 1.8,
      style_scale: 1.0,
      message_boost: 0.1,
      perplexity_ceiling: 30.0,
      perplexity_moderate_ceiling: 120.0,
      perplexity_high_score: 0.9,
      perplexity_min_words: 8,
      semantic_ceiling: 0.60,
      semantic_moderate: 0.45,
      semantic_low: 0.35,
      semantic_min_words: 4,
      semantic_min_tokens: 8,
      borderline_threshold: 0.35,
      ai_threshold: 0.50,
      high_confidence_threshold: 0.7,
      window_capacity: 30,
      escalation_timeout_ms: 3_000,
      diff_summary_max_chars: 4_000,
    }
  }
}

impl Config {
  /// Reject configurations that would break aggregation invariants.
  pub fn validate(&self) -> Result<(), EngineError> {
    let w = &self.weights;
    let weights = [w.structural, w.perplexity, w.semantic, w.z_score, w.sim_hash];
    if weights.iter().any(|v| !v.is_finite() || *v < 0.0) {
      return Err(EngineError::Config("weights must be finite and non-negative".into()));
    }
    if (w.total() - 1.0).abs() > 1e-6 {
      return Err(EngineError::Config(format!(
        "weights must sum to 1, got {:.4}",
        w.total()
      )));
    }
    if self.window_capacity == 0 {
      return Err(EngineError::Config("window_capacity must be at least 1".into()));
    }
    if self.borderline_threshold > self.ai_threshold {
      return Err(EngineError::Config(
        "borderline_threshold must not exceed ai_threshold".into(),
      ));
    }
    if self.simhash_min_similarity > self.simhash_flag_threshold {
      return Err(EngineError::Config(
        "simhash_min_similarity must not exceed simhash_flag_threshold".into(),
      ));
    }
    if self.perplexity_ceiling >= self.perplexity_moderate_ceiling {
      return Err(EngineError::Config(
        "perplexity_ceiling must be below perplexity_moderate_ceiling".into(),
      ));
    }
    if self.max_structural_depth == 0 {
      return Err(EngineError::Config("max_structural_depth must be at least 1".into()));
    }
    if !(0.0..=1.0).contains(&self.style_scale) || self.message_boost < 0.0 {
      return Err(EngineError::Config(
        "style_scale must lie in [0, 1] and message_boost must be non-negative".into(),
      ));
    }
    if self.z_score_ceiling <= 0.0 || self.min_elapsed_seconds <= 0 {
      return Err(EngineError::Config(
        "z_score_ceiling and min_elapsed_seconds must be positive".into(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert!((config.weights.total() - 1.0).abs() < 1e-9);
    assert_eq!(config.weights.weight_for(EngineId::Velocity), 0.0);
  }

  #[test]
  fn weights_must_sum_to_one() {
    let config = Config {
      weights: EngineWeights {
        structural: 0.9,
        ..EngineWeights::default()
      },
      ..Config::default()
    };
    assert!(config.validate().unwrap_err().to_string().contains("sum to 1"));
  }

  #[test]
  fn zero_window_rejected() {
    let config = Config {
      window_capacity: 0,
      ..Config::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn zero_structural_depth_rejected() {
    let config = Config {
      max_structural_depth: 0,
      ..Config::default()
    };
    assert!(config.validate().unwrap_err().to_string().contains("max_structural_depth"));
  }

  #[test]
  fn partial_json_fills_defaults() {
    let config: Config = serde_json::from_str(r#"{"velocity_boost": 0.5}"#).unwrap();
    assert!((config.velocity_boost - 0.5).abs() < f64::EPSILON);
    assert_eq!(config.window_capacity, 30);
  }
}
