//! Per-author rolling baselines: commit-size distribution, coding style,
//! fingerprint window, and last-commit time for velocity.
//!
//! A profile is a sequential fold over one author's commits in timestamp order.
//! Each fold is atomic: `AuthorProfile::apply` builds nothing partially visible.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::stats::RunningStats;
use crate::style::{StyleBaseline, StyleMetrics};
use crate::types::{CommitRecord, DiffFingerprint};

/// One retained commit in an author's window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowEntry {
  pub commit_id: String,
  pub timestamp: DateTime<Utc>,
  pub lines_added: u32,
  pub fingerprint: Option<DiffFingerprint>,
  pub style: StyleMetrics,
}

/// Rolling statistics for one author. Owned by `AuthorBaselineTracker`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorProfile {
  author: String,
  capacity: usize,
  window: VecDeque<WindowEntry>,
  /// Welford stats over `lines_added` of exactly the entries in `window`.
  size_stats: RunningStats,
  /// Style stats over the same entries.
  style: StyleBaseline,
  last_timestamp: Option<DateTime<Utc>>,
  #[serde(skip)]
  folded: HashSet<String>,
  total_folded: u64,
}

impl AuthorProfile {
  pub fn new(author: impl Into<String>, capacity: usize) -> Self {
    Self {
      author: author.into(),
      capacity: capacity.max(1),
      window: VecDeque::new(),
      size_stats: RunningStats::new(),
      style: StyleBaseline::default(),
      last_timestamp: None,
      folded: HashSet::new(),
      total_folded: 0,
    }
  }

  pub fn author(&self) -> &str {
    &self.author
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Observations the baseline currently rests on.
  pub fn prior_observations(&self) -> usize {
    self.window.len()
  }

  pub fn total_folded(&self) -> u64 {
    self.total_folded
  }

  pub fn size_mean(&self) -> f64 {
    self.size_stats.mean()
  }

  /// `None` with fewer than two observations.
  pub fn size_stddev(&self) -> Option<f64> {
    self.size_stats.stddev()
  }

  pub fn size_variance(&self) -> Option<f64> {
    self.size_stats.variance()
  }

  pub fn style(&self) -> &StyleBaseline {
    &self.style
  }

  pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
    self.last_timestamp
  }

  pub fn window(&self) -> impl Iterator<Item = &WindowEntry> {
    self.window.iter()
  }

  /// Whether this commit has already been folded into the profile.
  pub fn has_folded(&self, commit_id: &str) -> bool {
    self.folded.contains(commit_id)
  }

  /// Whether `commit` may be folded: not seen before and not older than the last fold.
  pub fn accepts(&self, commit: &CommitRecord) -> bool {
    !self.has_folded(commit.id())
      && self
        .last_timestamp
        .map_or(true, |last| commit.timestamp() >= last)
  }

  /// Burst check: the commit plus retained commits inside the trailing window.
  pub fn in_burst(&self, commit: &CommitRecord, config: &Config) -> bool {
    let start = commit.timestamp() - Duration::minutes(config.burst_window_minutes);
    let recent: Vec<u32> = self
      .window
      .iter()
      .filter(|e| e.commit_id != commit.id())
      .filter(|e| e.timestamp >= start && e.timestamp <= commit.timestamp())
      .map(|e| e.lines_added)
      .chain(std::iter::once(commit.lines_added()))
      .collect();
    let large = recent.iter().filter(|n| **n > config.burst_large_lines).count();
    recent.len() >= config.burst_min_commits && large >= config.burst_min_large
  }

  /// Fold one commit. Callers check `accepts` first; a rejected commit is a no-op.
  pub fn apply(&mut self, commit: &CommitRecord, fingerprint: Option<DiffFingerprint>) -> bool {
    if !self.accepts(commit) {
      return false;
    }
    let entry = WindowEntry {
      commit_id: commit.id().to_string(),
      timestamp: commit.timestamp(),
      lines_added: commit.lines_added(),
      fingerprint,
      style: StyleMetrics::measure(commit),
    };
    if self.window.len() == self.capacity {
      if let Some(evicted) = self.window.pop_front() {
        self.size_stats.remove(evicted.lines_added as f64);
        self.style.remove(&evicted.style);
      }
    }
    self.size_stats.push(entry.lines_added as f64);
    self.style.push(&entry.style);
    self.window.push_back(entry);
    self.last_timestamp = Some(commit.timestamp());
    self.folded.insert(commit.id().to_string());
    self.total_folded += 1;
    true
  }
}

/// Keyed store of author profiles for one scanning session.
///
/// Profiles are lent out whole (`take`) to a single writer and handed back
/// (`restore`); nothing is shared mutably across authors.
#[derive(Debug, Clone)]
pub struct AuthorBaselineTracker {
  capacity: usize,
  profiles: HashMap<String, AuthorProfile>,
}

impl AuthorBaselineTracker {
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity: capacity.max(1),
      profiles: HashMap::new(),
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(config.window_capacity)
  }

  pub fn profile(&self, author: &str) -> Option<&AuthorProfile> {
    self.profiles.get(author)
  }

  /// Remove an author's profile for exclusive use, creating an empty one if absent.
  pub fn take(&mut self, author: &str) -> AuthorProfile {
    self
      .profiles
      .remove(author)
      .unwrap_or_else(|| AuthorProfile::new(author, self.capacity))
  }

  pub fn restore(&mut self, profile: AuthorProfile) {
    self.profiles.insert(profile.author().to_string(), profile);
  }

  /// Fold one commit into its author's profile.
  pub fn observe(&mut self, commit: &CommitRecord, fingerprint: Option<DiffFingerprint>) -> bool {
    let capacity = self.capacity;
    self
      .profiles
      .entry(commit.author().to_string())
      .or_insert_with(|| AuthorProfile::new(commit.author(), capacity))
      .apply(commit, fingerprint)
  }

  pub fn len(&self) -> usize {
    self.profiles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.profiles.is_empty()
  }

  /// Drop every profile (new target repository).
  pub fn reset(&mut self) {
    self.profiles.clear();
  }
}
