//! Borderline tie-breaking through an external arbiter.
//!
//! Only `Borderline` verdicts are escalated, and only when an arbiter is
//! configured. The arbiter's answer replaces the displayed band; the local
//! score is kept as-is. Any failure (error or timeout) falls back to the local
//! band and is recorded on the verdict.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::ArbiterError;
use crate::types::{ArbiterVerdict, Band, CommitRecord, CommitSummary, EscalationOutcome, Verdict};

#[async_trait]
pub trait Arbiter: Send + Sync {
  async fn adjudicate(&self, summary: &CommitSummary) -> Result<ArbiterVerdict, ArbiterError>;
}

#[derive(Clone)]
pub struct EscalationClient {
  arbiter: Option<Arc<dyn Arbiter>>,
  timeout: Duration,
  max_diff_chars: usize,
}

impl std::fmt::Debug for EscalationClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EscalationClient")
      .field("arbiter", &self.arbiter.is_some())
      .field("timeout", &self.timeout)
      .finish()
  }
}

impl Default for EscalationClient {
  fn default() -> Self {
    Self::disabled()
  }
}

impl EscalationClient {
  /// No arbiter: borderline verdicts keep their local band.
  pub fn disabled() -> Self {
    let config = Config::default();
    Self {
      arbiter: None,
      timeout: Duration::from_millis(config.escalation_timeout_ms),
      max_diff_chars: config.diff_summary_max_chars,
    }
  }

  pub fn new(arbiter: Arc<dyn Arbiter>, config: &Config) -> Self {
    Self {
      arbiter: Some(arbiter),
      timeout: Duration::from_millis(config.escalation_timeout_ms),
      max_diff_chars: config.diff_summary_max_chars,
    }
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  pub fn is_available(&self) -> bool {
    self.arbiter.is_some()
  }

  pub fn should_escalate(&self, verdict: &Verdict) -> bool {
    verdict.band == Band::Borderline && self.is_available()
  }

  /// What the arbiter gets to see: message, truncated added text, local breakdown.
  pub fn summarize(&self, commit: &CommitRecord, verdict: &Verdict) -> CommitSummary {
    CommitSummary {
      commit_id: commit.id().to_string(),
      author: commit.author().to_string(),
      message: commit.message().to_string(),
      diff_summary: commit.added_text().chars().take(self.max_diff_chars).collect(),
      final_score: verdict.final_score,
      engine_breakdown: verdict.engine_breakdown.clone(),
    }
  }

  /// Ask the arbiter, bounded by the timeout.
  pub async fn resolve(&self, summary: &CommitSummary) -> EscalationOutcome {
    let Some(arbiter) = &self.arbiter else {
      return EscalationOutcome::FallbackLocal {
        reason: "no arbiter configured".into(),
      };
    };
    let result = match tokio::time::timeout(self.timeout, arbiter.adjudicate(summary)).await {
      Ok(result) => result,
      Err(_) => Err(ArbiterError::Timeout(self.timeout.as_millis() as u64)),
    };
    match result {
      Ok(verdict) => {
        tracing::info!(commit = %summary.commit_id, ?verdict, "arbiter resolved borderline commit");
        EscalationOutcome::Resolved { verdict }
      }
      Err(e) => {
        tracing::warn!(commit = %summary.commit_id, error = %e, "escalation failed, keeping local band");
        EscalationOutcome::FallbackLocal {
          reason: e.to_string(),
        }
      }
    }
  }

  /// Escalate when eligible; otherwise return the verdict unchanged.
  pub async fn escalate(&self, verdict: Verdict, commit: &CommitRecord) -> Verdict {
    if !self.should_escalate(&verdict) {
      return verdict;
    }
    let summary = self.summarize(commit, &verdict);
    let outcome = self.resolve(&summary).await;
    verdict.with_escalation(outcome)
  }
}
