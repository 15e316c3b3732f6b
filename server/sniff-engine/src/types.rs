//! Core types for the scoring engine (JSON contracts + internal models).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound types (JSON contract from the extraction collaborator)
// ---------------------------------------------------------------------------

/// One inbound commit line. Unknown fields are silently ignored.
///
/// Either `hunks` or a flat `diff` of added text must carry the change.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundCommit {
  #[serde(default)]
  pub id: Option<String>,
  pub author: String,
  pub timestamp: String,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub hunks: Vec<InboundHunk>,
  /// Added text only, newline separated. Used when `hunks` is empty.
  #[serde(default)]
  pub diff: Option<String>,
  /// Language tag applied to `diff`.
  #[serde(default)]
  pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundHunk {
  #[serde(default)]
  pub path: Option<String>,
  #[serde(default)]
  pub language: Option<String>,
  #[serde(default)]
  pub added: Vec<String>,
  #[serde(default)]
  pub removed: Vec<String>,
}

// ---------------------------------------------------------------------------
// Language tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  Rust,
  C,
  Cpp,
  CSharp,
  Go,
  Java,
  Kotlin,
  JavaScript,
  TypeScript,
  Swift,
  Python,
  Unknown,
}

/// How a language nests blocks, when we know how to build a structural tree for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
  Braces,
  Indentation,
}

impl Language {
  pub fn from_tag_loose(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "rust" | "rs" => Self::Rust,
      "c" | "h" => Self::C,
      "cpp" | "c++" | "cc" | "cxx" | "hpp" => Self::Cpp,
      "csharp" | "c#" | "cs" => Self::CSharp,
      "go" | "golang" => Self::Go,
      "java" => Self::Java,
      "kotlin" | "kt" => Self::Kotlin,
      "javascript" | "js" | "jsx" | "mjs" => Self::JavaScript,
      "typescript" | "ts" | "tsx" => Self::TypeScript,
      "swift" => Self::Swift,
      "python" | "py" => Self::Python,
      _ => Self::Unknown,
    }
  }

  /// Infer from a file path's extension.
  pub fn from_path(path: &str) -> Self {
    match path.rsplit_once('.') {
      Some((_, ext)) if !ext.contains('/') => Self::from_tag_loose(ext),
      _ => Self::Unknown,
    }
  }

  pub fn grammar(self) -> Option<Grammar> {
    match self {
      Self::Python => Some(Grammar::Indentation),
      Self::Unknown => None,
      _ => Some(Grammar::Braces),
    }
  }
}

// ---------------------------------------------------------------------------
// Internal normalized commit
// ---------------------------------------------------------------------------

/// One contiguous span of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
  pub path: Option<String>,
  pub language: Language,
  pub added: Vec<String>,
  pub removed: Vec<String>,
}

/// Canonical, immutable commit after normalization. Line counts are derived
/// from the hunks at construction and cannot drift from them.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
  id: String,
  author: String,
  timestamp: DateTime<Utc>,
  message: String,
  hunks: Vec<DiffHunk>,
  lines_added: u32,
  lines_removed: u32,
}

impl CommitRecord {
  pub fn new(
    id: impl Into<String>,
    author: impl Into<String>,
    timestamp: DateTime<Utc>,
    message: impl Into<String>,
    hunks: Vec<DiffHunk>,
  ) -> Self {
    let lines_added = hunks.iter().map(|h| h.added.len() as u32).sum();
    let lines_removed = hunks.iter().map(|h| h.removed.len() as u32).sum();
    Self {
      id: id.into(),
      author: author.into(),
      timestamp,
      message: message.into(),
      hunks,
      lines_added,
      lines_removed,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn author(&self) -> &str {
    &self.author
  }

  pub fn timestamp(&self) -> DateTime<Utc> {
    self.timestamp
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn hunks(&self) -> &[DiffHunk] {
    &self.hunks
  }

  pub fn lines_added(&self) -> u32 {
    self.lines_added
  }

  pub fn lines_removed(&self) -> u32 {
    self.lines_removed
  }

  /// Every added line across hunks, in order.
  pub fn added_lines(&self) -> impl Iterator<Item = &str> {
    self.hunks.iter().flat_map(|h| h.added.iter().map(String::as_str))
  }

  /// Added lines joined with newlines.
  pub fn added_text(&self) -> String {
    self.added_lines().collect::<Vec<_>>().join("\n")
  }

  /// Language covering the most added lines (Unknown when nothing was added).
  pub fn dominant_language(&self) -> Language {
    let mut best = (Language::Unknown, 0usize);
    for hunk in &self.hunks {
      let count: usize = self
        .hunks
        .iter()
        .filter(|h| h.language == hunk.language)
        .map(|h| h.added.len())
        .sum();
      if count > best.1 {
        best = (hunk.language, count);
      }
    }
    best.0
  }
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Width of a `DiffFingerprint` in bits.
pub const FINGERPRINT_BITS: u32 = 64;

/// 64-bit SimHash of a tokenized diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffFingerprint(pub u64);

// ---------------------------------------------------------------------------
// Engine scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineId {
  Structural,
  Perplexity,
  Velocity,
  Semantic,
  ZScore,
  SimHash,
}

impl EngineId {
  /// Registry order. Breakdowns are always reported in this order.
  pub const ALL: [EngineId; 6] = [
    Self::Structural,
    Self::Perplexity,
    Self::Velocity,
    Self::Semantic,
    Self::ZScore,
    Self::SimHash,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Structural => "structural",
      Self::Perplexity => "perplexity",
      Self::Velocity => "velocity",
      Self::Semantic => "semantic",
      Self::ZScore => "z_score",
      Self::SimHash => "sim_hash",
    }
  }

  /// Velocity is an additive boost, not part of the weighted average.
  pub fn is_weighted(self) -> bool {
    self != Self::Velocity
  }
}

impl fmt::Display for EngineId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One engine's output for one commit. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineScore {
  pub engine: EngineId,
  /// Engine-specific unit (perplexity, lines/minute, z, similarity, uniqueness ratio).
  pub raw_value: f64,
  /// Suspicion in [0, 1].
  pub normalized_score: f64,
  /// Nominal weight from config (0 for velocity).
  pub weight: f64,
  /// Weight after redistribution over the engines that actually scored.
  pub effective_weight: f64,
  pub explanation: String,
}

impl EngineScore {
  pub fn new(
    engine: EngineId,
    raw_value: f64,
    normalized_score: f64,
    weight: f64,
    explanation: impl Into<String>,
  ) -> Self {
    Self {
      engine,
      raw_value,
      normalized_score: normalized_score.clamp(0.0, 1.0),
      weight,
      effective_weight: weight,
      explanation: explanation.into(),
    }
  }

  pub fn with_effective_weight(self, effective_weight: f64) -> Self {
    Self {
      effective_weight,
      ..self
    }
  }

  pub fn contribution(&self) -> f64 {
    self.normalized_score * self.effective_weight
  }
}

/// An engine that did not contribute, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnavailableSignal {
  pub engine: EngineId,
  pub reason: String,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
  LikelyHuman,
  Borderline,
  LikelyAi,
}

impl Band {
  pub fn label(self) -> &'static str {
    match self {
      Self::LikelyHuman => "Likely Human",
      Self::Borderline => "Mixed / Uncertain",
      Self::LikelyAi => "Likely AI-assisted",
    }
  }
}

/// Binary answer from the external arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbiterVerdict {
  AiAssisted,
  HumanWritten,
}

impl ArbiterVerdict {
  pub fn band(self) -> Band {
    match self {
      Self::AiAssisted => Band::LikelyAi,
      Self::HumanWritten => Band::LikelyHuman,
    }
  }
}

/// Where a verdict ended up in the escalation state machine.
///
/// `Borderline -> Escalating -> {Resolved, FallbackLocal}`; everything that
/// never entered `Escalating` is `NotEscalated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EscalationOutcome {
  NotEscalated,
  Resolved { verdict: ArbiterVerdict },
  FallbackLocal { reason: String },
}

/// Final per-commit decision. Rescanning produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
  pub commit_id: String,
  pub author: String,
  pub final_score: f64,
  /// Weighted average of the available weighted engines.
  pub weighted_score: f64,
  pub velocity_boost: f64,
  pub burst_boost: f64,
  /// Additive boost from the deterministic message heuristics.
  pub message_boost: f64,
  pub band: Band,
  pub engine_breakdown: Vec<EngineScore>,
  pub unavailable: Vec<UnavailableSignal>,
  pub reasons: Vec<String>,
  pub escalation_used: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub escalation_verdict: Option<ArbiterVerdict>,
  pub escalation: EscalationOutcome,
}

impl Verdict {
  /// Band to show: the arbiter's answer when one was obtained, the local band otherwise.
  pub fn display_band(&self) -> Band {
    self.escalation_verdict.map(ArbiterVerdict::band).unwrap_or(self.band)
  }

  /// New verdict carrying the escalation result. `final_score` and `band` are preserved.
  pub fn with_escalation(self, outcome: EscalationOutcome) -> Self {
    let (used, arbiter) = match &outcome {
      EscalationOutcome::Resolved { verdict } => (true, Some(*verdict)),
      _ => (false, None),
    };
    let mut reasons = self.reasons;
    match &outcome {
      EscalationOutcome::Resolved { verdict } => reasons.push(format!(
        "Borderline local score; arbiter ruled {}",
        match verdict {
          ArbiterVerdict::AiAssisted => "AI-assisted",
          ArbiterVerdict::HumanWritten => "human-written",
        }
      )),
      EscalationOutcome::FallbackLocal { reason } => {
        reasons.push(format!("Arbiter unavailable ({}); kept local band", reason))
      }
      EscalationOutcome::NotEscalated => {}
    }
    Self {
      reasons,
      escalation_used: used,
      escalation_verdict: arbiter,
      escalation: outcome,
      ..self
    }
  }

  /// Engines that actually contributed.
  pub fn contributing_engines(&self) -> Vec<EngineId> {
    self.engine_breakdown.iter().map(|s| s.engine).collect()
  }
}

// ---------------------------------------------------------------------------
// Arbiter package
// ---------------------------------------------------------------------------

/// What the external arbiter sees for one borderline commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitSummary {
  pub commit_id: String,
  pub author: String,
  pub message: String,
  pub diff_summary: String,
  pub final_score: f64,
  pub engine_breakdown: Vec<EngineScore>,
}

// ---------------------------------------------------------------------------
// Author summary (leaderboard row)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorSummary {
  pub author: String,
  pub total: u64,
  pub likely_ai: u64,
  pub ai_ratio: f64,
  pub mean_score: f64,
  /// Commits at or above the high-confidence threshold.
  pub high_confidence: u64,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for invalid input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

/// Final stdout line of the binary.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFooter {
  pub complete: bool,
  pub authors: Vec<AuthorSummary>,
}
