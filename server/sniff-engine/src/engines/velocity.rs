//! Behavioral velocity: lines added per minute since the author's previous commit.
//!
//! Not averaged. A flagged commit gets `normalized_score = 1` and the aggregator
//! adds `Config::velocity_boost` on top of the weighted score.

use super::EngineInput;
use crate::types::{EngineId, EngineScore};

/// Measured typing speed, if one can be measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Velocity {
  /// First commit by this author in the session.
  NoPrior,
  /// Elapsed time under the floor (or negative, for late commits).
  Indeterminate { elapsed_seconds: i64 },
  Measured { lines_per_minute: f64 },
}

pub fn measure(input: &EngineInput<'_>) -> Velocity {
  let Some(last) = input.profile.last_timestamp() else {
    return Velocity::NoPrior;
  };
  let elapsed_seconds = (input.commit.timestamp() - last).num_seconds();
  if elapsed_seconds < input.config.min_elapsed_seconds {
    return Velocity::Indeterminate { elapsed_seconds };
  }
  let minutes = elapsed_seconds as f64 / 60.0;
  Velocity::Measured {
    lines_per_minute: input.commit.lines_added() as f64 / minutes,
  }
}

pub fn score(input: &EngineInput<'_>) -> EngineScore {
  let ceiling = input.config.velocity_ceiling_lpm;
  match measure(input) {
    Velocity::NoPrior => EngineScore::new(
      EngineId::Velocity,
      0.0,
      0.0,
      0.0,
      "First commit by author; no velocity signal",
    ),
    Velocity::Indeterminate { elapsed_seconds } => EngineScore::new(
      EngineId::Velocity,
      0.0,
      0.0,
      0.0,
      format!("Velocity indeterminate ({}s since previous commit)", elapsed_seconds),
    ),
    Velocity::Measured { lines_per_minute } if lines_per_minute > ceiling => EngineScore::new(
      EngineId::Velocity,
      lines_per_minute,
      1.0,
      0.0,
      format!(
        "Impossible human typing velocity ({:.0} Lines/Minute)",
        lines_per_minute
      ),
    ),
    Velocity::Measured { lines_per_minute } => EngineScore::new(
      EngineId::Velocity,
      lines_per_minute,
      0.0,
      0.0,
      format!("Plausible velocity ({:.1} Lines/Minute)", lines_per_minute),
    ),
  }
}
