//! Sniff: multi-engine AI-assistance scoring for version-control commits.
//!
//! Six independent engines turn one commit (plus a read-only snapshot of its
//! author's rolling profile) into normalized suspicion scores. The aggregator
//! folds them into a weighted verdict and band; borderline verdicts may be
//! deferred to an external arbiter. Per-author state is a sequential fold,
//! kept in timestamp order per author while distinct authors run in parallel.
//!
//! No git access, no model hosting; inference and arbitration are consumed
//! through traits.

pub mod aggregate;
pub mod baseline;
pub mod config;
pub mod engines;
pub mod error;
pub mod escalation;
pub mod fingerprint;
pub mod history;
pub mod inference;
pub mod message;
pub mod normalize;
pub mod pipeline;
pub mod stats;
pub mod style;
pub mod summary;
pub mod types;

pub use baseline::{AuthorBaselineTracker, AuthorProfile};
pub use config::Config;
pub use engines::EngineRegistry;
pub use error::{ArbiterError, EngineError, InferenceError, SignalUnavailable};
pub use escalation::{Arbiter, EscalationClient};
pub use history::{HistorySource, MemoryHistory};
pub use inference::{EmbeddingSimilarity, InferenceServices, PerplexityScorer};
pub use pipeline::{CancelToken, Pipeline, ScanReport};
pub use types::{Band, CommitRecord, InboundCommit, Verdict};
