//! Binary entrypoint: read InboundCommit JSON lines from stdin, score them as
//! one scan, write JSON lines to stdout.
//!
//! Output lines are, in order:
//! - An ErrorOutput for every input line that fails to parse or validate
//! - One Verdict per scored commit, oldest first by commit timestamp
//!   (commits with equal timestamps keep their input order)
//! - A final ScanFooter with the per-author leaderboard
//!
//! Logs go to stderr (`RUST_LOG`, default `info`). Ctrl-C cancels the scan;
//! verdicts already finalized are still written and the footer reports
//! `complete: false`.

use std::io::{self, BufRead, Write};

use sniff_engine::normalize::normalize;
use sniff_engine::types::{ErrorOutput, ScanFooter};
use sniff_engine::{CancelToken, EngineError, InboundCommit, MemoryHistory, Pipeline};
use tracing_subscriber::EnvFilter;

fn write_line<T: serde::Serialize>(out: &mut impl Write, value: &T) {
  let _ = serde_json::to_writer(&mut *out, value);
  let _ = writeln!(out);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let mut history = MemoryHistory::default();

  for line in io::stdin().lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        tracing::error!(error = %e, "read error");
        std::process::exit(1);
      }
    };
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let raw: InboundCommit = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        write_line(&mut out, &ErrorOutput::new(EngineError::from(e).to_string()));
        continue;
      }
    };
    match normalize(&raw) {
      Ok(commit) => history.push(commit),
      Err(EngineError::Validation { field, reason }) => {
        write_line(&mut out, &ErrorOutput::new(reason).with_field(field))
      }
      Err(e) => write_line(&mut out, &ErrorOutput::new(e.to_string())),
    }
  }

  let cancel = CancelToken::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("interrupt received, cancelling scan");
        cancel.cancel();
      }
    });
  }

  let mut pipeline = Pipeline::with_defaults();
  match pipeline.scan_repository(&history, history.len(), &cancel).await {
    Ok(report) => {
      for verdict in &report.verdicts {
        write_line(&mut out, verdict);
      }
      write_line(
        &mut out,
        &ScanFooter {
          complete: report.complete,
          authors: report.authors,
        },
      );
    }
    Err(e) => {
      tracing::error!(error = %e, "scan failed");
      write_line(&mut out, &ErrorOutput::new(e.to_string()));
      let _ = out.flush();
      std::process::exit(2);
    }
  }

  let _ = out.flush();
}
