//! Author baseline: how unusually *large* this commit is for its author, and
//! how far its coding style drifts from the author's recent commits.
//!
//! The score is the larger of the two. `raw_value` stays the size z.

use super::EngineInput;
use crate::style::{self, StyleMetrics};
use crate::types::{EngineId, EngineScore};

/// One-sided mapping: z <= 0 -> 0, linear up to the ceiling, 1 beyond.
pub fn normalize(z: f64, ceiling: f64) -> f64 {
  if !(z > 0.0) {
    return 0.0;
  }
  (z / ceiling).min(1.0)
}

pub fn score(input: &EngineInput<'_>) -> EngineScore {
  let config = input.config;
  let weight = config.weights.z_score;
  let profile = input.profile;
  let prior = profile.prior_observations();

  let drift = style::deviation(profile.style(), &StyleMetrics::measure(input.commit), config);
  let style_score = (drift.score * config.style_scale).min(1.0);

  let (z, size_score, mut explanation) = match profile.size_stddev() {
    None => (
      0.0,
      0.0,
      format!("Insufficient baseline history ({} prior commits)", prior),
    ),
    Some(stddev) => {
      let mean = profile.size_mean();
      let z = (input.commit.lines_added() as f64 - mean) / stddev.max(config.z_score_min_stddev);
      let normalized = normalize(z, config.z_score_ceiling);
      let explanation = if normalized >= 1.0 {
        format!(
          "Commit size extreme outlier (z={:.1} from author baseline of {:.0} lines)",
          z, mean
        )
      } else if normalized > 0.0 {
        format!("Larger than author baseline (z={:.1})", z)
      } else {
        "Commit size consistent with author baseline".to_string()
      };
      (z, normalized, explanation)
    }
  };
  for reason in &drift.reasons {
    explanation.push_str("; ");
    explanation.push_str(reason);
  }
  EngineScore::new(EngineId::ZScore, z, size_score.max(style_score), weight, explanation)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::baseline::AuthorProfile;
  use crate::config::Config;
  use crate::engines::fixtures::*;
  use crate::engines::InferenceSignals;
  use crate::types::{CommitRecord, Language};

  fn snake_case(id: &str, minute: u32, n: usize) -> CommitRecord {
    let lines = (0..n)
      .map(|i| format!("let total_{} = read_value({});", i, i))
      .collect();
    commit_with(id, ts(10, minute), "update", Language::Rust, lines)
  }

  fn profile_with(sizes: &[usize]) -> AuthorProfile {
    let mut p = AuthorProfile::new("alice", 30);
    for (i, n) in sizes.iter().enumerate() {
      p.apply(&sized(&format!("c{}", i), ts(10, i as u32), *n), None);
    }
    p
  }

  fn run(profile: &AuthorProfile, lines: usize) -> EngineScore {
    run_commit(profile, &sized("next", ts(12, 0), lines))
  }

  fn run_commit(profile: &AuthorProfile, commit: &CommitRecord) -> EngineScore {
    let config = Config::default();
    let signals = InferenceSignals::none();
    score(&EngineInput {
      commit,
      profile,
      fingerprint: None,
      signals: &signals,
      config: &config,
    })
  }

  #[test]
  fn fewer_than_two_observations_scores_zero() {
    assert_eq!(run(&profile_with(&[]), 900).normalized_score, 0.0);
    assert_eq!(run(&profile_with(&[50]), 900).normalized_score, 0.0);
  }

  #[test]
  fn increasing_then_saturating() {
    // mean 50, stddev 10
    let p = profile_with(&[40, 50, 60]);
    let s1 = run(&p, 60).normalized_score; // z = 1
    let s2 = run(&p, 70).normalized_score; // z = 2
    let s3 = run(&p, 80).normalized_score; // z = 3
    let s4 = run(&p, 400).normalized_score; // z = 35
    assert!(s1 > 0.0 && s1 < s2 && s2 < s3);
    assert_eq!(s3, 1.0);
    assert_eq!(s4, 1.0);
  }

  #[test]
  fn small_commits_are_not_suspicious() {
    let p = profile_with(&[40, 50, 60]);
    let s = run(&p, 1);
    assert!(s.raw_value < 0.0);
    assert_eq!(s.normalized_score, 0.0);
  }

  #[test]
  fn identical_history_uses_stddev_floor() {
    let p = profile_with(&[20, 20, 20]);
    let s = run(&p, 21);
    assert!((s.raw_value - 1.0).abs() < 1e-9);
  }

  #[test]
  fn style_drift_scores_without_a_size_outlier() {
    let mut p = AuthorProfile::new("alice", 30);
    for (i, n) in [20, 22, 24].iter().enumerate() {
      p.apply(&snake_case(&format!("c{}", i), i as u32, *n), None);
    }
    let mut lines: Vec<String> = (0..10).map(|i| format!("// Load batch {}", i)).collect();
    lines.extend((0..10).map(|i| format!("const batchSize{} = readLimit(sourceId);", i)));
    let s = run_commit(&p, &commit_with("next", ts(12, 0), "update", Language::TypeScript, lines));
    assert!(s.raw_value < 0.0);
    assert!((s.normalized_score - 0.45).abs() < 1e-9);
    assert!(s.explanation.contains("Comment density spike"));
    assert!(s.explanation.contains("Naming style shift"));
  }

  #[test]
  fn style_drift_needs_two_prior_commits() {
    let mut p = AuthorProfile::new("alice", 30);
    p.apply(&snake_case("c0", 0, 20), None);
    let lines: Vec<String> = (0..20).map(|i| format!("// remark {}", i)).collect();
    let s = run_commit(&p, &commit_with("next", ts(12, 0), "update", Language::Rust, lines));
    assert_eq!(s.normalized_score, 0.0);
    assert!(s.explanation.starts_with("Insufficient baseline history"));
  }

  #[test]
  fn size_outlier_wins_over_milder_drift() {
    let mut p = AuthorProfile::new("alice", 30);
    for (i, n) in [20, 22, 24].iter().enumerate() {
      p.apply(&snake_case(&format!("c{}", i), i as u32, *n), None);
    }
    let lines: Vec<String> = (0..200).map(|i| format!("const itemCount{} = loadItems(i);", i)).collect();
    let s = run_commit(&p, &commit_with("next", ts(12, 0), "update", Language::TypeScript, lines));
    assert_eq!(s.normalized_score, 1.0);
    assert!(s.explanation.contains("extreme outlier"));
    assert!(s.explanation.contains("Naming style shift"));
  }

  #[test]
  fn normalize_is_monotonic() {
    let mut prev = 0.0;
    for i in 0..=40 {
      let v = normalize(i as f64 * 0.1, 3.0);
      assert!(v >= prev);
      prev = v;
    }
  }
}
