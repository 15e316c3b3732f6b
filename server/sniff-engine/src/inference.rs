//! Consumed inference capabilities: a perplexity scorer and an embedding
//! similarity scorer. The crate never hosts a model; callers plug these in.

use std::sync::Arc;

use crate::config::Config;
use crate::engines::{perplexity, semantic, InferenceSignals};
use crate::error::InferenceError;
use crate::types::CommitRecord;

/// Text -> perplexity under a language model. Lower means more predictable.
pub trait PerplexityScorer: Send + Sync {
  fn score(&self, text: &str) -> Result<f64, InferenceError>;
}

/// Cosine similarity between the message and an identifier summary of the diff.
pub trait EmbeddingSimilarity: Send + Sync {
  fn similarity(&self, text: &str, diff_summary: &str) -> Result<f64, InferenceError>;
}

#[derive(Clone, Default)]
pub struct InferenceServices {
  perplexity: Option<Arc<dyn PerplexityScorer>>,
  embedding: Option<Arc<dyn EmbeddingSimilarity>>,
}

impl std::fmt::Debug for InferenceServices {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("InferenceServices")
      .field("perplexity", &self.perplexity.is_some())
      .field("embedding", &self.embedding.is_some())
      .finish()
  }
}

impl InferenceServices {
  pub fn none() -> Self {
    Self::default()
  }

  pub fn with_perplexity(mut self, scorer: Arc<dyn PerplexityScorer>) -> Self {
    self.perplexity = Some(scorer);
    self
  }

  pub fn with_embedding(mut self, scorer: Arc<dyn EmbeddingSimilarity>) -> Self {
    self.embedding = Some(scorer);
    self
  }

  /// Query both services for one commit. Ineligible commits are never sent.
  pub fn gather(&self, commit: &CommitRecord, config: &Config) -> InferenceSignals {
    let perplexity = match &self.perplexity {
      None => Err(InferenceError::NotConfigured),
      Some(_) if !perplexity::eligible(commit, config) => {
        Err(InferenceError::Ineligible("message too short".into()))
      }
      Some(scorer) => scorer.score(commit.message()),
    };
    let similarity = match &self.embedding {
      None => Err(InferenceError::NotConfigured),
      Some(_) if !semantic::eligible(commit, config) => {
        Err(InferenceError::Ineligible("message or diff too short".into()))
      }
      Some(scorer) => scorer.similarity(commit.message(), &semantic::diff_summary(commit)),
    };
    if let Err(e) = &perplexity {
      tracing::trace!(commit = commit.id(), error = %e, "perplexity not obtained");
    }
    if let Err(e) = &similarity {
      tracing::trace!(commit = commit.id(), error = %e, "similarity not obtained");
    }
    InferenceSignals {
      perplexity,
      similarity,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engines::fixtures::*;
  use crate::types::Language;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Counting(AtomicUsize);

  impl PerplexityScorer for Counting {
    fn score(&self, _text: &str) -> Result<f64, InferenceError> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Ok(20.0)
    }
  }

  #[test]
  fn unconfigured_services_report_not_configured() {
    let commit = sized("c1", ts(10, 0), 5);
    let s = InferenceServices::none().gather(&commit, &Config::default());
    assert_eq!(s.perplexity, Err(InferenceError::NotConfigured));
    assert_eq!(s.similarity, Err(InferenceError::NotConfigured));
  }

  #[test]
  fn short_messages_are_not_sent() {
    let counter = Arc::new(Counting(AtomicUsize::new(0)));
    let services = InferenceServices::none().with_perplexity(counter.clone());
    let short = sized("c1", ts(10, 0), 5);
    assert!(matches!(
      services.gather(&short, &Config::default()).perplexity,
      Err(InferenceError::Ineligible(_))
    ));
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);

    let long = commit_with(
      "c2",
      ts(10, 5),
      "Refactor the session cache so that expiry runs on a timer",
      Language::Rust,
      vec!["x".into()],
    );
    assert_eq!(services.gather(&long, &Config::default()).perplexity, Ok(20.0));
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
  }
}
