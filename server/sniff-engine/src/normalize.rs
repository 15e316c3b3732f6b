//! Normalize inbound commit lines into canonical CommitRecords.

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::fingerprint;
use crate::types::*;

/// Parse and normalize an InboundCommit.
pub fn normalize(raw: &InboundCommit) -> Result<CommitRecord, EngineError> {
  let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&raw.timestamp)
    .map_err(|e| EngineError::validation("timestamp", &format!("invalid RFC3339: {}", e)))?
    .with_timezone(&Utc);

  let author = raw.author.trim();
  if author.is_empty() {
    return Err(EngineError::validation("author", "must not be empty"));
  }

  let fallback = raw
    .language
    .as_deref()
    .map(Language::from_tag_loose)
    .unwrap_or(Language::Unknown);

  let hunks: Vec<DiffHunk> = if !raw.hunks.is_empty() {
    raw.hunks.iter().map(|h| normalize_hunk(h, fallback)).collect()
  } else if let Some(diff) = &raw.diff {
    vec![DiffHunk {
      path: None,
      language: fallback,
      added: diff.lines().map(strip_cr).collect(),
      removed: Vec::new(),
    }]
  } else {
    return Err(EngineError::validation("hunks", "either hunks or diff is required"));
  };

  let message = raw.message.trim_end().to_string();
  let id = match raw.id.as_deref().map(str::trim) {
    Some(id) if !id.is_empty() => id.to_string(),
    _ => fingerprint::commit_id(author, &timestamp, &message, &hunks),
  };

  Ok(CommitRecord::new(id, author, timestamp, message, hunks))
}

/// Hunk language: explicit tag, then file extension, then the commit-level tag.
fn normalize_hunk(raw: &InboundHunk, fallback: Language) -> DiffHunk {
  let tagged = raw.language.as_deref().map(Language::from_tag_loose);
  let from_path = raw.path.as_deref().map(Language::from_path);
  let language = [tagged, from_path]
    .into_iter()
    .flatten()
    .find(|l| *l != Language::Unknown)
    .unwrap_or(fallback);
  DiffHunk {
    path: raw.path.as_ref().map(|p| p.replace('\\', "/")),
    language,
    added: raw.added.iter().map(|l| strip_cr(l)).collect(),
    removed: raw.removed.iter().map(|l| strip_cr(l)).collect(),
  }
}

fn strip_cr(line: &str) -> String {
  line.strip_suffix('\r').unwrap_or(line).to_string()
}
