//! Stable content ids, diff tokenization, and SimHash fingerprints.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::{DiffFingerprint, DiffHunk, FINGERPRINT_BITS};

static BLOCK_COMMENT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));
static IDENTIFIER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]+\b").expect("valid regex"));

/// Content hash identifying a commit when the collaborator supplied no id.
///
/// Covers author, timestamp, message, and every hunk. Uses blake3; first 20 bytes as hex.
pub fn commit_id(
  author: &str,
  timestamp: &DateTime<Utc>,
  message: &str,
  hunks: &[DiffHunk],
) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(author.as_bytes());
  hasher.update(b"|");
  hasher.update(timestamp.to_rfc3339().as_bytes());
  hasher.update(b"|");
  hasher.update(message.as_bytes());
  for hunk in hunks {
    hasher.update(b"|");
    hasher.update(hunk.path.as_deref().unwrap_or("").as_bytes());
    for line in &hunk.added {
      hasher.update(b"\n+");
      hasher.update(line.as_bytes());
    }
    for line in &hunk.removed {
      hasher.update(b"\n-");
      hasher.update(line.as_bytes());
    }
  }
  let hex = hasher.finalize().to_hex();
  hex[..40].to_string()
}

/// `#` forms that are code: attributes and preprocessor lines.
const HASH_DIRECTIVES: &[&str] = &[
  "include", "define", "undef", "ifdef", "ifndef", "if", "elif", "else", "endif", "pragma", "import",
];

fn is_hash_directive(rest: &str) -> bool {
  rest.starts_with('[')
    || rest.starts_with("![")
    || HASH_DIRECTIVES.iter().any(|d| {
      rest
        .strip_prefix(d)
        .is_some_and(|after| !after.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
    })
}

/// `'a` or `'static`, as opposed to a char literal like `'a'`.
pub(crate) fn is_lifetime(rest: &str) -> bool {
  let mut ahead = rest.chars();
  matches!(ahead.next(), Some(c) if c.is_alphabetic() || c == '_') && ahead.next() != Some('\'')
}

/// Byte offset of a `//` or `#` line comment, ignoring string literals.
pub fn line_comment_start(line: &str) -> Option<usize> {
  let mut quote: Option<char> = None;
  let mut prev: Option<char> = None;
  let mut chars = line.char_indices();
  while let Some((i, c)) = chars.next() {
    if let Some(q) = quote {
      if c == '\\' {
        chars.next();
      } else if c == q {
        quote = None;
      }
      prev = Some(c);
      continue;
    }
    let rest = &line[i + c.len_utf8()..];
    match c {
      '"' | '`' => quote = Some(c),
      '\'' if !is_lifetime(rest) => quote = Some(c),
      '/' if rest.starts_with('/') => return Some(i),
      '#' if prev.map_or(true, char::is_whitespace) && !is_hash_directive(rest) => return Some(i),
      _ => {}
    }
    prev = Some(c);
  }
  None
}

/// Identifiers and keywords of a code fragment, comments stripped.
pub fn tokens(text: &str) -> Vec<String> {
  let stripped = BLOCK_COMMENT.replace_all(text, "");
  stripped
    .lines()
    .map(|line| &line[..line_comment_start(line).unwrap_or(line.len())])
    .flat_map(|code| IDENTIFIER.find_iter(code).map(|m| m.as_str().to_string()))
    .collect()
}

fn token_hash(token: &str) -> u64 {
  let hash = blake3::hash(token.as_bytes());
  let mut bytes = [0u8; 8];
  bytes.copy_from_slice(&hash.as_bytes()[..8]);
  u64::from_le_bytes(bytes)
}

/// SimHash over a token multiset. `None` when there are no tokens.
pub fn simhash<S: AsRef<str>>(tokens: &[S]) -> Option<DiffFingerprint> {
  if tokens.is_empty() {
    return None;
  }
  let mut v = [0i64; FINGERPRINT_BITS as usize];
  for token in tokens {
    let h = token_hash(token.as_ref());
    for (i, slot) in v.iter_mut().enumerate() {
      if h & (1u64 << i) != 0 {
        *slot += 1;
      } else {
        *slot -= 1;
      }
    }
  }
  let bits = v
    .iter()
    .enumerate()
    .filter(|(_, s)| **s > 0)
    .fold(0u64, |acc, (i, _)| acc | (1u64 << i));
  Some(DiffFingerprint(bits))
}

/// Fingerprint of the added text of a diff.
pub fn fingerprint_added(text: &str) -> Option<DiffFingerprint> {
  simhash(&tokens(text))
}

pub fn hamming(a: DiffFingerprint, b: DiffFingerprint) -> u32 {
  (a.0 ^ b.0).count_ones()
}

/// 1 - hamming / width, in [0, 1].
pub fn similarity(a: DiffFingerprint, b: DiffFingerprint) -> f64 {
  1.0 - hamming(a, b) as f64 / FINGERPRINT_BITS as f64
}
