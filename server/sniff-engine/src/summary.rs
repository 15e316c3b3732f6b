//! Per-author rollup of a scan (the leaderboard).

use std::collections::BTreeMap;

use crate::config::Config;
use crate::types::{AuthorSummary, Band, Verdict};

/// One row per author, ordered by mean score descending then author name.
/// Uses the displayed band, so arbiter answers count.
pub fn summarize(verdicts: &[Verdict], config: &Config) -> Vec<AuthorSummary> {
  let mut by_author: BTreeMap<&str, Vec<&Verdict>> = BTreeMap::new();
  for v in verdicts {
    by_author.entry(v.author.as_str()).or_default().push(v);
  }

  let mut rows: Vec<AuthorSummary> = by_author
    .into_iter()
    .map(|(author, vs)| {
      let total = vs.len() as u64;
      let likely_ai = vs.iter().filter(|v| v.display_band() == Band::LikelyAi).count() as u64;
      let high_confidence = vs
        .iter()
        .filter(|v| v.final_score >= config.high_confidence_threshold)
        .count() as u64;
      let mean_score = vs.iter().map(|v| v.final_score).sum::<f64>() / total as f64;
      AuthorSummary {
        author: author.to_string(),
        total,
        likely_ai,
        ai_ratio: likely_ai as f64 / total as f64,
        mean_score,
        high_confidence,
      }
    })
    .collect();

  rows.sort_by(|a, b| {
    b.mean_score
      .partial_cmp(&a.mean_score)
      .unwrap_or(std::cmp::Ordering::Equal)
      .then_with(|| a.author.cmp(&b.author))
  });
  rows
}
