//! The six scoring engines and their fixed registry.
//!
//! Every engine is a pure function of one commit, a read-only view of the
//! author's profile (taken *before* this commit is folded), pre-gathered
//! inference readings, and the config. Dispatch is a `match` over `EngineId`.

pub mod perplexity;
pub mod semantic;
pub mod simhash;
pub mod structural;
pub mod velocity;
pub mod z_score;

use crate::baseline::AuthorProfile;
use crate::config::Config;
use crate::error::{InferenceError, SignalUnavailable};
use crate::types::{CommitRecord, DiffFingerprint, EngineId, EngineScore};

pub type EngineResult = Result<EngineScore, SignalUnavailable>;

/// Numbers obtained from the consumed inference services for one commit.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSignals {
  pub perplexity: Result<f64, InferenceError>,
  pub similarity: Result<f64, InferenceError>,
}

impl InferenceSignals {
  pub fn none() -> Self {
    Self {
      perplexity: Err(InferenceError::NotConfigured),
      similarity: Err(InferenceError::NotConfigured),
    }
  }
}

/// Everything an engine may look at.
pub struct EngineInput<'a> {
  pub commit: &'a CommitRecord,
  pub profile: &'a AuthorProfile,
  pub fingerprint: Option<DiffFingerprint>,
  pub signals: &'a InferenceSignals,
  pub config: &'a Config,
}

/// Ordered, closed set of engines run for every commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRegistry {
  engines: Vec<EngineId>,
}

impl Default for EngineRegistry {
  fn default() -> Self {
    Self::standard()
  }
}

impl EngineRegistry {
  /// All six engines in registry order.
  pub fn standard() -> Self {
    Self {
      engines: EngineId::ALL.to_vec(),
    }
  }

  /// A subset, kept in registry order regardless of argument order.
  pub fn only(engines: &[EngineId]) -> Self {
    Self {
      engines: EngineId::ALL
        .iter()
        .copied()
        .filter(|e| engines.contains(e))
        .collect(),
    }
  }

  pub fn engines(&self) -> &[EngineId] {
    &self.engines
  }

  pub fn score_all(&self, input: &EngineInput<'_>) -> Vec<EngineResult> {
    self.engines.iter().map(|e| score(*e, input)).collect()
  }
}

/// Run one engine.
pub fn score(engine: EngineId, input: &EngineInput<'_>) -> EngineResult {
  let result = match engine {
    EngineId::Structural => Ok(structural::score(input)),
    EngineId::Perplexity => perplexity::score(input),
    EngineId::Velocity => Ok(velocity::score(input)),
    EngineId::Semantic => semantic::score(input),
    EngineId::ZScore => Ok(z_score::score(input)),
    EngineId::SimHash => Ok(simhash::score(input)),
  };
  match &result {
    Ok(s) => tracing::debug!(
      commit = input.commit.id(),
      engine = %engine,
      raw = s.raw_value,
      score = s.normalized_score,
      "engine scored"
    ),
    Err(e) => tracing::debug!(
      commit = input.commit.id(),
      engine = %engine,
      reason = %e.reason,
      "engine unavailable"
    ),
  }
  result
}
