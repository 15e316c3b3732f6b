//! Combine engine results into a Verdict.
//!
//! Weighted engines form a weighted average whose weights are renormalized over
//! the engines that actually scored. Velocity, burst activity and the message
//! heuristics are additive boosts on top. The final score is left unclamped.

use crate::config::Config;
use crate::engines::EngineResult;
use crate::message::MessageAssessment;
use crate::types::{Band, CommitRecord, EngineId, EngineScore, EscalationOutcome, UnavailableSignal, Verdict};

/// Engines scoring at or above this contribute their explanation to the reasons.
const REASON_FLOOR: f64 = 0.25;

/// Map a final score onto a band. Borderline bounds are inclusive on both ends.
pub fn classify(score: f64, config: &Config) -> Band {
  if score > config.ai_threshold {
    Band::LikelyAi
  } else if score >= config.borderline_threshold {
    Band::Borderline
  } else {
    Band::LikelyHuman
  }
}

/// Inputs to the final score that do not come from an engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boosts {
  pub burst: bool,
  pub message: MessageAssessment,
}

impl Boosts {
  pub fn none() -> Self {
    Self::default()
  }
}

pub fn aggregate(
  commit: &CommitRecord,
  results: Vec<EngineResult>,
  boosts: &Boosts,
  config: &Config,
) -> Verdict {
  let mut scored: Vec<EngineScore> = Vec::with_capacity(results.len());
  let mut unavailable = Vec::new();
  for result in results {
    match result {
      Ok(score) => scored.push(score),
      Err(e) => unavailable.push(UnavailableSignal {
        engine: e.engine,
        reason: e.reason,
      }),
    }
  }

  let available_weight: f64 = scored
    .iter()
    .filter(|s| s.engine.is_weighted())
    .map(|s| s.weight)
    .sum();

  let engine_breakdown: Vec<EngineScore> = scored
    .into_iter()
    .map(|s| {
      let effective = if s.engine.is_weighted() && available_weight > 0.0 {
        s.weight / available_weight
      } else {
        0.0
      };
      s.with_effective_weight(effective)
    })
    .collect();

  let weighted_score: f64 = engine_breakdown
    .iter()
    .filter(|s| s.engine.is_weighted())
    .map(EngineScore::contribution)
    .sum();
  let velocity_boost = engine_breakdown
    .iter()
    .find(|s| s.engine == EngineId::Velocity)
    .map_or(0.0, |s| s.normalized_score * config.velocity_boost);
  let burst_boost = if boosts.burst { config.burst_boost } else { 0.0 };
  let message_boost = boosts.message.score * config.message_boost;
  let final_score = weighted_score + velocity_boost + burst_boost + message_boost;

  let mut reasons: Vec<String> = engine_breakdown
    .iter()
    .filter(|s| s.normalized_score >= REASON_FLOOR)
    .map(|s| s.explanation.clone())
    .collect();
  if boosts.message.score >= REASON_FLOOR {
    reasons.extend(boosts.message.reasons.iter().cloned());
  }
  if boosts.burst {
    reasons.push(format!(
      "Burst of large commits within {} minutes",
      config.burst_window_minutes
    ));
  }
  if reasons.is_empty() {
    reasons.push("No strong AI signals detected".to_string());
  }

  Verdict {
    commit_id: commit.id().to_string(),
    author: commit.author().to_string(),
    final_score,
    weighted_score,
    velocity_boost,
    burst_boost,
    message_boost,
    band: classify(final_score, config),
    engine_breakdown,
    unavailable,
    reasons,
    escalation_used: false,
    escalation_verdict: None,
    escalation: EscalationOutcome::NotEscalated,
  }
}
