//! Commit acquisition seam. The extraction collaborator that walks a real
//! repository lives outside this crate; it hands over normalized records.

use crate::error::EngineError;
use crate::types::CommitRecord;

pub trait HistorySource: Send + Sync {
  /// Up to `count` most recent commits, any order.
  fn fetch(&self, count: usize) -> Result<Vec<CommitRecord>, EngineError>;
}

/// In-memory history. `fetch` returns it oldest first; equal timestamps keep push order.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
  commits: Vec<CommitRecord>,
}

impl MemoryHistory {
  pub fn new(commits: Vec<CommitRecord>) -> Self {
    Self { commits }
  }

  pub fn push(&mut self, commit: CommitRecord) {
    self.commits.push(commit);
  }

  pub fn len(&self) -> usize {
    self.commits.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commits.is_empty()
  }
}

impl HistorySource for MemoryHistory {
  fn fetch(&self, count: usize) -> Result<Vec<CommitRecord>, EngineError> {
    let mut sorted = self.commits.clone();
    sorted.sort_by_key(|c| c.timestamp());
    let skip = sorted.len().saturating_sub(count);
    Ok(sorted.split_off(skip))
  }
}
