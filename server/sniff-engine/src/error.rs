//! Structured error types for the scoring engine.

use thiserror::Error;

use crate::types::EngineId;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("config: {0}")]
  Config(String),

  /// Acquisition failed: nothing to score. Fatal to the whole scan.
  #[error("repository unavailable: {0}")]
  RepositoryUnavailable(String),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn repository_unavailable(msg: impl Into<String>) -> Self {
    Self::RepositoryUnavailable(msg.into())
  }
}

/// One engine could not produce a score for one commit.
///
/// Never propagated past the aggregator: the engine is excluded and its weight
/// redistributed over the engines that did score.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{engine}: signal unavailable: {reason}")]
pub struct SignalUnavailable {
  pub engine: EngineId,
  pub reason: String,
}

impl SignalUnavailable {
  pub fn new(engine: EngineId, reason: impl Into<String>) -> Self {
    Self {
      engine,
      reason: reason.into(),
    }
  }
}

/// Failure of a consumed inference capability (perplexity or embedding scorer).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
  #[error("inference unavailable: {0}")]
  Unavailable(String),

  #[error("inference service not configured")]
  NotConfigured,

  #[error("input not eligible: {0}")]
  Ineligible(String),
}

/// Failure of the external tie-breaker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArbiterError {
  #[error("arbiter timed out after {0} ms")]
  Timeout(u64),

  #[error("arbiter unavailable: {0}")]
  Unavailable(String),
}
