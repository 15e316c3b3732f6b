//! Orchestrator: sequences engines, aggregation, profile folding and escalation.
//!
//! A scan splits its batch into one lane per author. Each lane owns that
//! author's profile for the duration of the scan (taken out of the tracker and
//! handed back at the end), and processes the author's commits in timestamp
//! order. Lanes run as independent tokio tasks. Borderline verdicts are
//! escalated on their own tasks so the lane keeps scoring while the arbiter
//! thinks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::aggregate::{self, Boosts};
use crate::baseline::{AuthorBaselineTracker, AuthorProfile};
use crate::config::Config;
use crate::engines::{EngineInput, EngineRegistry};
use crate::error::{EngineError, InferenceError};
use crate::escalation::{Arbiter, EscalationClient};
use crate::fingerprint;
use crate::history::HistorySource;
use crate::inference::InferenceServices;
use crate::message;
use crate::summary;
use crate::types::{AuthorSummary, CommitRecord, EscalationOutcome, Verdict};

/// Cooperative cancellation shared between a caller and a running scan.
#[derive(Debug, Clone)]
pub struct CancelToken {
  tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}

impl CancelToken {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(false);
    Self { tx: Arc::new(tx) }
  }

  pub fn cancel(&self) {
    self.tx.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.tx.borrow()
  }

  /// Resolves once `cancel` has been called.
  pub async fn cancelled(&self) {
    let mut rx = self.tx.subscribe();
    let _ = rx.wait_for(|c| *c).await;
  }
}

/// Result of one scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
  /// One verdict per scored commit, in input order.
  pub verdicts: Vec<Verdict>,
  pub authors: Vec<AuthorSummary>,
  /// False when the scan was cancelled or a lane failed; `verdicts` is then partial.
  pub complete: bool,
  /// Commits never scored.
  pub skipped: usize,
}

/// The read-only half of the pipeline, shared by every lane.
#[derive(Debug, Clone)]
struct Scorer {
  config: Arc<Config>,
  registry: EngineRegistry,
  inference: InferenceServices,
}

impl Scorer {
  /// Score one commit against the profile, then fold it in if it is new and in order.
  fn evaluate(&self, profile: &mut AuthorProfile, commit: &CommitRecord) -> Verdict {
    let config = &*self.config;
    let fingerprint = fingerprint::fingerprint_added(&commit.added_text());
    let signals = self.inference.gather(commit, config);
    for (service, reading) in [("perplexity", &signals.perplexity), ("embedding", &signals.similarity)] {
      if let Err(InferenceError::Unavailable(reason)) = reading {
        tracing::warn!(commit = commit.id(), author = commit.author(), service, %reason, "inference signal unavailable");
      }
    }

    let results = self.registry.score_all(&EngineInput {
      commit,
      profile: &*profile,
      fingerprint,
      signals: &signals,
      config,
    });
    let boosts = Boosts {
      burst: profile.in_burst(commit, config),
      message: message::assess(commit.message(), commit.lines_added()),
    };
    let verdict = aggregate::aggregate(commit, results, &boosts, config);

    if profile.accepts(commit) {
      profile.apply(commit, fingerprint);
    } else if profile.has_folded(commit.id()) {
      tracing::debug!(commit = commit.id(), author = commit.author(), "already folded; scored only");
    } else {
      tracing::warn!(
        commit = commit.id(),
        author = commit.author(),
        "late commit (older than last folded); scored only"
      );
    }
    verdict
  }
}

struct LaneOutput {
  profile: AuthorProfile,
  verdicts: Vec<(usize, Verdict)>,
  skipped: usize,
}

async fn run_lane(
  scorer: Scorer,
  escalation: EscalationClient,
  mut profile: AuthorProfile,
  commits: Vec<(usize, CommitRecord)>,
  cancel: CancelToken,
) -> LaneOutput {
  let total = commits.len();
  let mut verdicts = Vec::with_capacity(total);
  let mut pending: HashMap<usize, Verdict> = HashMap::new();
  let mut escalations: JoinSet<(usize, Verdict)> = JoinSet::new();
  let mut scored = 0;

  for (idx, commit) in commits {
    if cancel.is_cancelled() {
      break;
    }
    let verdict = scorer.evaluate(&mut profile, &commit);
    scored += 1;
    if escalation.should_escalate(&verdict) {
      pending.insert(idx, verdict.clone());
      let client = escalation.clone();
      escalations.spawn(async move { (idx, client.escalate(verdict, &commit).await) });
    } else {
      verdicts.push((idx, verdict));
    }
    tokio::task::yield_now().await;
  }

  while !escalations.is_empty() {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        escalations.abort_all();
        break;
      }
      joined = escalations.join_next() => match joined {
        Some(Ok((idx, verdict))) => {
          pending.remove(&idx);
          verdicts.push((idx, verdict));
        }
        Some(Err(e)) => tracing::error!(author = profile.author(), error = %e, "escalation task failed"),
        None => break,
      },
    }
  }

  // Whatever never came back keeps its local band.
  let reason = if cancel.is_cancelled() { "scan cancelled" } else { "escalation task failed" };
  for (idx, verdict) in pending {
    verdicts.push((
      idx,
      verdict.with_escalation(EscalationOutcome::FallbackLocal {
        reason: reason.to_string(),
      }),
    ));
  }

  LaneOutput {
    profile,
    verdicts,
    skipped: total - scored,
  }
}

/// Scoring session. Author profiles live as long as the pipeline (or until `reset`).
#[derive(Debug)]
pub struct Pipeline {
  scorer: Scorer,
  escalation: EscalationClient,
  tracker: AuthorBaselineTracker,
}

impl Pipeline {
  pub fn new(config: Config) -> Result<Self, EngineError> {
    config.validate()?;
    Ok(Self::build(config))
  }

  pub fn with_defaults() -> Self {
    Self::build(Config::default())
  }

  fn build(config: Config) -> Self {
    Self {
      tracker: AuthorBaselineTracker::from_config(&config),
      scorer: Scorer {
        config: Arc::new(config),
        registry: EngineRegistry::standard(),
        inference: InferenceServices::none(),
      },
      escalation: EscalationClient::disabled(),
    }
  }

  pub fn with_registry(mut self, registry: EngineRegistry) -> Self {
    self.scorer.registry = registry;
    self
  }

  pub fn with_inference(mut self, inference: InferenceServices) -> Self {
    self.scorer.inference = inference;
    self
  }

  pub fn with_arbiter(mut self, arbiter: Arc<dyn Arbiter>) -> Self {
    self.escalation = EscalationClient::new(arbiter, &self.scorer.config);
    self
  }

  pub fn config(&self) -> &Config {
    &self.scorer.config
  }

  pub fn tracker(&self) -> &AuthorBaselineTracker {
    &self.tracker
  }

  /// Forget every author (new target repository).
  pub fn reset(&mut self) {
    tracing::info!(authors = self.tracker.len(), "resetting author profiles");
    self.tracker.reset();
  }

  /// Score a single commit in sequence with whatever the session has seen so far.
  pub async fn score(&mut self, commit: &CommitRecord) -> Verdict {
    let mut profile = self.tracker.take(commit.author());
    let verdict = self.scorer.evaluate(&mut profile, commit);
    self.tracker.restore(profile);
    self.escalation.escalate(verdict, commit).await
  }

  /// Score a batch. Authors run concurrently; each author's commits in timestamp order.
  pub async fn scan(&mut self, commits: Vec<CommitRecord>, cancel: &CancelToken) -> ScanReport {
    let total = commits.len();
    let mut lanes: HashMap<String, Vec<(usize, CommitRecord)>> = HashMap::new();
    for (idx, commit) in commits.into_iter().enumerate() {
      lanes.entry(commit.author().to_string()).or_default().push((idx, commit));
    }

    let mut handles = Vec::with_capacity(lanes.len());
    for (author, mut lane) in lanes {
      // Stable: equal timestamps keep input order.
      lane.sort_by_key(|(_, c)| c.timestamp());
      let profile = self.tracker.take(&author);
      let backup = profile.clone();
      let lane_len = lane.len();
      let handle = tokio::spawn(run_lane(
        self.scorer.clone(),
        self.escalation.clone(),
        profile,
        lane,
        cancel.clone(),
      ));
      handles.push((author, backup, lane_len, handle));
    }

    let mut verdicts: Vec<(usize, Verdict)> = Vec::with_capacity(total);
    let mut skipped = 0;
    let mut failed = false;
    for (author, backup, lane_len, handle) in handles {
      match handle.await {
        Ok(out) => {
          skipped += out.skipped;
          verdicts.extend(out.verdicts);
          self.tracker.restore(out.profile);
        }
        Err(e) => {
          tracing::error!(%author, error = %e, "author lane failed; profile rolled back");
          skipped += lane_len;
          failed = true;
          self.tracker.restore(backup);
        }
      }
    }

    verdicts.sort_by_key(|(idx, _)| *idx);
    let verdicts: Vec<Verdict> = verdicts.into_iter().map(|(_, v)| v).collect();
    let authors = summary::summarize(&verdicts, &self.scorer.config);
    let complete = !failed && skipped == 0 && !cancel.is_cancelled();
    tracing::info!(
      scored = verdicts.len(),
      skipped,
      authors = authors.len(),
      complete,
      "scan finished"
    );
    ScanReport {
      verdicts,
      authors,
      complete,
      skipped,
    }
  }

  /// Fetch up to `count` commits from `source` and scan them.
  pub async fn scan_repository(
    &mut self,
    source: &dyn HistorySource,
    count: usize,
    cancel: &CancelToken,
  ) -> Result<ScanReport, EngineError> {
    let commits = source.fetch(count)?;
    if commits.is_empty() {
      return Err(EngineError::repository_unavailable("no commits to score"));
    }
    Ok(self.scan(commits, cancel).await)
  }
}
