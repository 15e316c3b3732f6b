//! Near-duplicate detection against the author's own retained diffs.

use super::EngineInput;
use crate::config::Config;
use crate::fingerprint;
use crate::types::{EngineId, EngineScore};

/// Similarity -> score.
///
/// Below `simhash_min_similarity`: 0. Up to the flag threshold: linear to 0.5.
/// From the flag threshold: 0.8 rising linearly to 1.0 at identical content.
pub fn normalize(similarity: f64, config: &Config) -> f64 {
  let min = config.simhash_min_similarity;
  let flag = config.simhash_flag_threshold;
  if similarity < min {
    0.0
  } else if similarity < flag {
    0.5 * (similarity - min) / (flag - min)
  } else if flag >= 1.0 {
    1.0
  } else {
    0.8 + 0.2 * (similarity - flag) / (1.0 - flag)
  }
}

pub fn score(input: &EngineInput<'_>) -> EngineScore {
  let config = input.config;
  let weight = config.weights.sim_hash;
  let Some(current) = input.fingerprint else {
    return EngineScore::new(EngineId::SimHash, 0.0, 0.0, weight, "No code tokens to fingerprint");
  };

  let best = input
    .profile
    .window()
    .filter(|e| e.commit_id != input.commit.id())
    .filter_map(|e| e.fingerprint.map(|fp| (e, fingerprint::similarity(current, fp))))
    .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

  let Some((entry, similarity)) = best else {
    return EngineScore::new(EngineId::SimHash, 0.0, 0.0, weight, "No prior diffs from author");
  };

  let normalized = normalize(similarity, config);
  let short: String = entry.commit_id.chars().take(7).collect();
  let explanation = if similarity >= config.simhash_flag_threshold {
    format!(
      "Near-identical code to commit {} ({}% token similarity), likely template reuse",
      short,
      (similarity * 100.0).round()
    )
  } else if normalized > 0.0 {
    format!(
      "Moderate code similarity to {} ({}% match)",
      short,
      (similarity * 100.0).round()
    )
  } else {
    "No near-duplicate commits found".to_string()
  };
  EngineScore::new(EngineId::SimHash, similarity, normalized, weight, explanation)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::baseline::AuthorProfile;
  use crate::engines::fixtures::*;
  use crate::engines::InferenceSignals;
  use crate::types::{CommitRecord, Language};

  const TEMPLATE: &str = "export function handleSubmit(event) {\n  event.preventDefault();\n  setLoading(true);\n}";

  fn commit(id: &str, min: u32, text: &str) -> CommitRecord {
    commit_with(
      id,
      ts(10, min),
      "add handler",
      Language::JavaScript,
      text.lines().map(String::from).collect(),
    )
  }

  fn run(profile: &AuthorProfile, commit: &CommitRecord) -> EngineScore {
    let config = Config::default();
    let signals = InferenceSignals::none();
    score(&EngineInput {
      commit,
      profile,
      fingerprint: fingerprint::fingerprint_added(&commit.added_text()),
      signals: &signals,
      config: &config,
    })
  }

  #[test]
  fn first_commit_scores_zero() {
    let p = AuthorProfile::new("alice", 10);
    let s = run(&p, &commit("c1", 0, TEMPLATE));
    assert_eq!(s.raw_value, 0.0);
    assert_eq!(s.normalized_score, 0.0);
  }

  #[test]
  fn identical_diff_is_flagged() {
    let mut p = AuthorProfile::new("alice", 10);
    let first = commit("c1", 0, TEMPLATE);
    p.apply(&first, fingerprint::fingerprint_added(&first.added_text()));
    let s = run(&p, &commit("c2", 5, TEMPLATE));
    assert!((s.raw_value - 1.0).abs() < f64::EPSILON);
    assert!(s.raw_value >= Config::default().simhash_flag_threshold);
    assert!((s.normalized_score - 1.0).abs() < 1e-9);
  }

  #[test]
  fn takes_maximum_over_whole_window() {
    let mut p = AuthorProfile::new("alice", 10);
    let first = commit("c1", 0, TEMPLATE);
    p.apply(&first, fingerprint::fingerprint_added(&first.added_text()));
    // Later, unrelated commits must not hide the early match.
    for i in 1..5 {
      let other = commit(
        &format!("o{}", i),
        i,
        &format!("let unrelated_{} = database_pool_{}.connect(port_{});", i, i, i),
      );
      p.apply(&other, fingerprint::fingerprint_added(&other.added_text()));
    }
    let s = run(&p, &commit("c9", 9, TEMPLATE));
    assert!((s.raw_value - 1.0).abs() < f64::EPSILON);
  }

  #[test]
  fn own_entry_is_ignored_on_rescan() {
    let mut p = AuthorProfile::new("alice", 10);
    let first = commit("c1", 0, TEMPLATE);
    p.apply(&first, fingerprint::fingerprint_added(&first.added_text()));
    let s = run(&p, &first);
    assert_eq!(s.normalized_score, 0.0);
  }

  #[test]
  fn normalize_is_monotonic_and_bounded() {
    let config = Config::default();
    let mut prev = 0.0;
    for i in 0..=100 {
      let v = normalize(i as f64 / 100.0, &config);
      assert!(v >= prev && v <= 1.0);
      prev = v;
    }
    assert_eq!(normalize(0.5, &config), 0.0);
    assert!((normalize(0.85, &config) - 0.8).abs() < 1e-9);
  }

  #[test]
  fn entries_without_fingerprint_are_skipped() {
    let mut p = AuthorProfile::new("alice", 10);
    p.apply(&commit("c1", 0, "// comment only"), None);
    let s = run(&p, &commit("c2", 5, TEMPLATE));
    assert_eq!(s.raw_value, 0.0);
  }
}
