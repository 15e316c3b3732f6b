//! Structural entropy of the added code.
//!
//! For brace and indentation languages the added lines are parsed into a block
//! tree (statements nested under the statement that opened their block). From
//! it: comment/docstring density, lexical uniqueness, and scaffold uniformity
//! (variance of subtree depth across sibling blocks). Anything we cannot parse
//! falls back to token heuristics on the raw text; this engine never fails.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::EngineInput;
use crate::fingerprint;
use crate::stats;
use crate::types::{EngineId, EngineScore, Grammar};

static RAW_TOKEN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|[{}()\[\];,.=<>:]").expect("valid regex"));

const KEYWORDS: &[&str] = &[
  "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "def", "default",
  "elif", "else", "enum", "export", "false", "fn", "for", "from", "func", "function", "if", "impl",
  "import", "in", "interface", "let", "match", "mut", "new", "None", "null", "pass", "pub",
  "return", "self", "static", "struct", "switch", "this", "throw", "True", "true", "False", "try",
  "type", "use", "var", "void", "while", "with", "yield",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
  Empty,
  UnterminatedComment,
  UnbalancedParens,
  UnbalancedBraces(usize),
  MixedIndentation,
  InconsistentDedent { line: usize },
  /// Nesting deeper than the configured limit.
  TooDeep(usize),
}

/// A parsed statement: its nesting depth and children in the block tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub depth: usize,
  pub children: Vec<usize>,
}

/// Block tree of the added lines. `roots` are top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockTree {
  pub nodes: Vec<Node>,
  pub roots: Vec<usize>,
  pub comment_lines: usize,
  pub code_lines: usize,
}

impl BlockTree {
  fn from_depths(depths: &[usize], comment_lines: usize) -> Self {
    let mut tree = BlockTree {
      comment_lines,
      code_lines: depths.len(),
      ..Default::default()
    };
    // Stack of (node, depth) for the currently open chain.
    let mut open: Vec<(usize, usize)> = Vec::new();
    for &depth in depths {
      while open.last().is_some_and(|(_, d)| *d >= depth) {
        open.pop();
      }
      let idx = tree.nodes.len();
      tree.nodes.push(Node {
        depth,
        children: Vec::new(),
      });
      match open.last() {
        Some((parent, _)) => tree.nodes[*parent].children.push(idx),
        None => tree.roots.push(idx),
      }
      open.push((idx, depth));
    }
    tree
  }

  /// Levels of nesting below every node (0 for a leaf), indexed like `nodes`.
  /// Children always follow their parent, so one reverse pass suffices.
  pub fn heights(&self) -> Vec<usize> {
    let mut heights = vec![0usize; self.nodes.len()];
    for idx in (0..self.nodes.len()).rev() {
      heights[idx] = self.nodes[idx]
        .children
        .iter()
        .map(|c| heights[*c] + 1)
        .max()
        .unwrap_or(0);
    }
    heights
  }

  /// Mean, over sibling groups with at least three block-opening siblings, of the
  /// variance of their subtree heights. `None` when no group qualifies.
  pub fn scaffold_variance(&self) -> Option<f64> {
    let node_heights = self.heights();
    let groups = std::iter::once(&self.roots).chain(self.nodes.iter().map(|n| &n.children));
    let variances: Vec<f64> = groups
      .filter_map(|siblings| {
        let heights: Vec<f64> = siblings
          .iter()
          .map(|s| node_heights[*s])
          .filter(|h| *h > 0)
          .map(|h| h as f64)
          .collect();
        (heights.len() >= 3).then(|| stats::population_variance(&heights))
      })
      .collect();
    if variances.is_empty() {
      None
    } else {
      Some(stats::mean(&variances))
    }
  }
}

fn is_brace_comment(trimmed: &str) -> bool {
  trimmed.starts_with("//")
    || trimmed.starts_with("/*")
    || trimmed.starts_with("*/")
    || trimmed.starts_with("* ")
    || trimmed == "*"
}

/// Parse a C-family fragment. Unmatched braces are tolerated up to a small
/// budget, since diffs routinely open or close blocks outside the hunk.
pub fn parse_braces(lines: &[&str], max_depth: usize) -> Result<BlockTree, ParseError> {
  let mut depths = Vec::new();
  let mut comment_lines = 0;
  let mut in_block_comment = false;
  let mut depth: i64 = 0;
  let mut unmatched_closers = 0usize;
  let mut parens: i64 = 0;

  for line in lines {
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }
    if in_block_comment || is_brace_comment(trimmed) {
      comment_lines += 1;
    }

    let mut statement_depth: Option<i64> = None;
    let mut seen_code = false;
    let mut chars = line.char_indices();
    let mut quote: Option<char> = None;
    while let Some((i, c)) = chars.next() {
      let rest = &line[i + c.len_utf8()..];
      if in_block_comment {
        if c == '*' && rest.starts_with('/') {
          chars.next();
          in_block_comment = false;
        }
        continue;
      }
      if let Some(q) = quote {
        if c == '\\' {
          chars.next();
        } else if c == q {
          quote = None;
        }
        continue;
      }
      match c {
        '/' if rest.starts_with('/') => break,
        '/' if rest.starts_with('*') => {
          chars.next();
          in_block_comment = true;
        }
        '"' | '`' => {
          quote = Some(c);
          seen_code = true;
        }
        '\'' if !fingerprint::is_lifetime(rest) => {
          quote = Some(c);
          seen_code = true;
        }
        '}' => {
          if depth == 0 {
            unmatched_closers += 1;
          } else {
            depth -= 1;
          }
        }
        '{' => {
          if !seen_code && statement_depth.is_none() {
            statement_depth = Some(depth);
          }
          seen_code = true;
          depth += 1;
          if depth as usize > max_depth {
            return Err(ParseError::TooDeep(depth as usize));
          }
        }
        '(' | '[' => {
          seen_code = true;
          parens += 1;
        }
        ')' | ']' => {
          seen_code = true;
          parens -= 1;
          if parens < 0 {
            return Err(ParseError::UnbalancedParens);
          }
        }
        c if c.is_whitespace() || c == ';' || c == ',' => {}
        _ => {
          if !seen_code && statement_depth.is_none() {
            statement_depth = Some(depth);
          }
          seen_code = true;
        }
      }
    }
    // A string literal never spans lines in these grammars, except template literals.
    if quote.is_some_and(|q| q != '`') {
      return Err(ParseError::UnbalancedParens);
    }
    if let Some(d) = statement_depth {
      depths.push(d as usize);
    }
  }

  if in_block_comment {
    return Err(ParseError::UnterminatedComment);
  }
  if parens != 0 {
    return Err(ParseError::UnbalancedParens);
  }
  let imbalance = unmatched_closers + depth as usize;
  if imbalance > 3 {
    return Err(ParseError::UnbalancedBraces(imbalance));
  }
  if depths.is_empty() {
    return Err(ParseError::Empty);
  }
  Ok(BlockTree::from_depths(&depths, comment_lines))
}

/// Parse an indentation-nested fragment (Python-like).
pub fn parse_indentation(lines: &[&str], max_depth: usize) -> Result<BlockTree, ParseError> {
  let mut depths = Vec::new();
  let mut comment_lines = 0;
  let mut in_docstring: Option<&str> = None;
  let mut uses_tabs = false;
  let mut uses_spaces = false;
  let mut open: Vec<usize> = Vec::new();

  for (n, line) in lines.iter().enumerate() {
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }
    if let Some(delim) = in_docstring {
      comment_lines += 1;
      if trimmed.contains(delim) {
        in_docstring = None;
      }
      continue;
    }
    if trimmed.starts_with('#') {
      comment_lines += 1;
      continue;
    }
    if let Some(delim) = ["\"\"\"", "'''"].into_iter().find(|d| trimmed.starts_with(d)) {
      comment_lines += 1;
      if !trimmed[3..].contains(delim) {
        in_docstring = Some(delim);
      }
      continue;
    }

    let leading: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
    uses_tabs |= leading.contains('\t');
    uses_spaces |= leading.contains(' ');
    if uses_tabs && uses_spaces {
      return Err(ParseError::MixedIndentation);
    }
    let width = leading.len();

    let mut dedented = false;
    while open.last().is_some_and(|w| *w > width) {
      open.pop();
      dedented = true;
    }
    match open.last() {
      Some(w) if *w == width => {}
      // Dedent that lands between two open levels.
      Some(_) if dedented => return Err(ParseError::InconsistentDedent { line: n + 1 }),
      _ => open.push(width),
    }
    if open.len() > max_depth {
      return Err(ParseError::TooDeep(open.len()));
    }
    depths.push(open.len() - 1);
  }

  if in_docstring.is_some() {
    return Err(ParseError::UnterminatedComment);
  }
  if depths.is_empty() {
    return Err(ParseError::Empty);
  }
  Ok(BlockTree::from_depths(&depths, comment_lines))
}

pub fn parse(lines: &[&str], grammar: Grammar, max_depth: usize) -> Result<BlockTree, ParseError> {
  match grammar {
    Grammar::Braces => parse_braces(lines, max_depth),
    Grammar::Indentation => parse_indentation(lines, max_depth),
  }
}

/// Unique identifiers over identifier occurrences, keywords excluded.
/// `None` below `min_identifiers` occurrences.
pub fn lexical_uniqueness(text: &str, min_identifiers: usize) -> Option<f64> {
  let keywords: HashSet<&str> = KEYWORDS.iter().copied().collect();
  let idents: Vec<String> = fingerprint::tokens(text)
    .into_iter()
    .filter(|t| !keywords.contains(t.as_str()))
    .collect();
  if idents.is_empty() || idents.len() < min_identifiers {
    return None;
  }
  let unique: HashSet<&str> = idents.iter().map(String::as_str).collect();
  Some(unique.len() as f64 / idents.len() as f64)
}

/// Score contribution of a uniqueness ratio below the threshold: in (0.3, 0.4],
/// strictly higher for lower ratios.
pub fn uniqueness_score(ratio: f64, threshold: f64) -> f64 {
  if ratio >= threshold || threshold <= 0.0 {
    return 0.0;
  }
  0.3 + 0.1 * (1.0 - ratio / threshold)
}

/// Share of token trigrams that occur more than once. `None` for tiny inputs.
pub fn boilerplate_ratio(text: &str) -> Option<f64> {
  let toks: Vec<&str> = RAW_TOKEN.find_iter(text).map(|m| m.as_str()).collect();
  if toks.len() < 22 {
    return None;
  }
  let mut counts: HashMap<(&str, &str, &str), usize> = HashMap::new();
  for w in toks.windows(3) {
    *counts.entry((w[0], w[1], w[2])).or_insert(0) += 1;
  }
  let total = toks.len() - 2;
  let repeated: usize = counts.values().filter(|c| **c > 1).sum();
  Some(repeated as f64 / total as f64)
}

/// Framework scaffolding that assistants emit in bulk.
pub fn idiom_bursts(text: &str, lines: usize) -> Vec<&'static str> {
  let mut found = Vec::new();
  if text.contains("useState") && text.contains("useEffect") {
    found.push("Generic React component scaffolding detected");
  }
  if text.contains("console.log") && !text.contains("TODO") && lines > 5 {
    found.push("Debug logging scaffold without follow-up notes");
  }
  found
}

/// Coefficient of variation of line lengths, and of blank-line gap sizes.
fn regularity(lines: &[&str]) -> (f64, Option<f64>) {
  let lengths: Vec<f64> = lines
    .iter()
    .filter(|l| !l.trim().is_empty())
    .map(|l| l.chars().count() as f64)
    .collect();
  let mut gaps = Vec::new();
  let mut gap = 0usize;
  for l in lines {
    if l.trim().is_empty() {
      gap += 1;
    } else {
      if gap > 0 {
        gaps.push(gap as f64);
      }
      gap = 0;
    }
  }
  let gap_cv = (gaps.len() >= 3).then(|| stats::coefficient_of_variation(&gaps));
  (stats::coefficient_of_variation(&lengths), gap_cv)
}

fn raw_comment_lines(lines: &[&str]) -> usize {
  lines
    .iter()
    .map(|l| l.trim())
    .filter(|l| fingerprint::line_comment_start(l) == Some(0))
    .count()
}

pub fn score(input: &EngineInput<'_>) -> EngineScore {
  let config = input.config;
  let weight = config.weights.structural;
  let lines: Vec<&str> = input.commit.added_lines().collect();
  let text = lines.join("\n");
  let code_lines = lines.iter().filter(|l| !l.trim().is_empty()).count();
  if code_lines == 0 {
    return EngineScore::new(EngineId::Structural, 1.0, 0.0, weight, "No code added");
  }

  let parsed = input
    .commit
    .dominant_language()
    .grammar()
    .map(|g| parse(&lines, g, config.max_structural_depth));

  let mut score = 0.0;
  let mut reasons: Vec<String> = Vec::new();

  let comment_lines = match &parsed {
    Some(Ok(tree)) => tree.comment_lines,
    _ => raw_comment_lines(&lines),
  };
  let density = comment_lines as f64 / code_lines as f64;
  if code_lines >= config.min_structural_lines && density > config.comment_density_threshold {
    score += 0.3;
    reasons.push(format!(
      "High docstring/comment density ({} of {} lines)",
      comment_lines, code_lines
    ));
  }

  let uniqueness = lexical_uniqueness(&text, config.min_identifiers);
  if let Some(ratio) = uniqueness {
    let u = uniqueness_score(ratio, config.lexical_uniqueness_threshold);
    if u > 0.0 {
      score += u;
      reasons.push(format!(
        "Low lexical entropy (identifier uniqueness {:.2})",
        ratio
      ));
    }
  }

  match &parsed {
    Some(Ok(tree)) => {
      if let Some(var) = tree.scaffold_variance() {
        if var < 0.1 {
          score += 0.15;
          reasons.push(format!("Uniform scaffolding across sibling blocks (depth variance {:.2})", var));
        }
      }
    }
    other => {
      if let Some(Err(e)) = other {
        tracing::debug!(commit = input.commit.id(), error = ?e, "structural parse failed; token fallback");
      }
      if let Some(ratio) = boilerplate_ratio(&text) {
        if code_lines >= config.min_structural_lines && ratio >= 0.5 {
          score += 0.2;
          reasons.push(format!("Repeated boilerplate n-grams ({:.0}% of trigrams)", ratio * 100.0));
        }
      }
      for idiom in idiom_bursts(&text, code_lines) {
        score += if idiom.starts_with("Generic React") { 0.3 } else { 0.1 };
        reasons.push(idiom.to_string());
      }
    }
  }

  let (cv, gap_cv) = regularity(&lines);
  if cv < 0.25 && code_lines > 15 {
    score += 0.2;
    reasons.push(format!("Abnormally uniform line lengths (CV={:.2})", cv));
  } else if cv < 0.35 && code_lines > 20 {
    score += 0.1;
    reasons.push(format!("Suspicious line length regularity (CV={:.2})", cv));
  }
  if gap_cv.is_some_and(|g| g < 0.3) {
    score += 0.1;
    reasons.push("Perfectly regular blank-line spacing".to_string());
  }

  if code_lines > 50 {
    score += 0.1;
    reasons.push("Large structural block addition".to_string());
  }

  let explanation = if reasons.is_empty() {
    "Organic structural complexity".to_string()
  } else {
    reasons.join("; ")
  };
  EngineScore::new(
    EngineId::Structural,
    uniqueness.unwrap_or(1.0),
    score.min(1.0),
    weight,
    explanation,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::baseline::AuthorProfile;
  use crate::config::Config;
  use crate::engines::fixtures::*;
  use crate::engines::InferenceSignals;
  use crate::types::Language;

  const MAX_DEPTH: usize = 256;

  fn run(language: Language, lines: Vec<String>) -> EngineScore {
    let config = Config::default();
    let profile = AuthorProfile::new("alice", 10);
    let signals = InferenceSignals::none();
    let commit = commit_with("c1", ts(10, 0), "msg", language, lines);
    score(&EngineInput {
      commit: &commit,
      profile: &profile,
      fingerprint: None,
      signals: &signals,
      config: &config,
    })
  }

  #[test]
  fn brace_tree_nests_blocks() {
    let lines = [
      "fn a() {",
      "  let x = 1;",
      "  if x > 0 {",
      "    go(x);",
      "  }",
      "}",
      "fn b() {",
      "  stop();",
      "}",
    ];
    let tree = parse_braces(&lines, MAX_DEPTH).unwrap();
    let heights = tree.heights();
    assert_eq!(tree.roots.len(), 2);
    assert_eq!(heights[tree.roots[0]], 2);
    assert_eq!(heights[tree.roots[1]], 1);
  }

  #[test]
  fn brace_fragment_tolerates_outer_close() {
    let lines = ["    return value;", "  }", "}"];
    assert!(parse_braces(&lines, MAX_DEPTH).is_ok());
  }

  #[test]
  fn unbalanced_parens_fail_closed() {
    let lines = ["call(first,", "  second"];
    assert_eq!(parse_braces(&lines, MAX_DEPTH), Err(ParseError::UnbalancedParens));
  }

  #[test]
  fn indentation_tree_and_docstrings() {
    let lines = [
      "def handle(request):",
      "    \"\"\"Handle the request.\"\"\"",
      "    if request.ok:",
      "        return respond(request)",
      "    return None",
    ];
    let tree = parse_indentation(&lines, MAX_DEPTH).unwrap();
    assert_eq!(tree.comment_lines, 1);
    assert_eq!(tree.roots.len(), 1);
    assert_eq!(tree.heights()[tree.roots[0]], 2);
  }

  #[test]
  fn rust_lifetimes_are_not_quotes() {
    let lines = [
      "fn first<'a>(items: &'a [&'static str]) -> &'a str {",
      "  let sep = ',';",
      "  items.first().copied().unwrap_or(\"\")",
      "}",
    ];
    let tree = parse_braces(&lines, MAX_DEPTH).unwrap();
    assert_eq!(tree.roots.len(), 1);
    assert_eq!(tree.heights()[tree.roots[0]], 1);
  }

  #[test]
  fn char_literal_quote_still_scanned() {
    let lines = ["let open = '(';", "let close = ')';"];
    assert!(parse_braces(&lines, MAX_DEPTH).is_ok());
  }

  #[test]
  fn pointer_writes_are_not_comments() {
    let lines = [
      "/*",
      " * Reset the slot.",
      " */",
      "void reset(int *ptr) {",
      "  *ptr = 0;",
      "}",
    ];
    let tree = parse_braces(&lines, MAX_DEPTH).unwrap();
    assert_eq!(tree.comment_lines, 3);
  }

  #[test]
  fn deep_nesting_is_rejected_past_the_limit() {
    let lines: Vec<String> = (0..5_000).map(|i| format!("{}if cond_{}:", " ".repeat(i), i)).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    assert_eq!(parse_indentation(&refs, MAX_DEPTH), Err(ParseError::TooDeep(MAX_DEPTH + 1)));

    let braces: Vec<String> = (0..5_000).map(|i| format!("block_{} {{", i)).collect();
    let refs: Vec<&str> = braces.iter().map(String::as_str).collect();
    assert_eq!(parse_braces(&refs, MAX_DEPTH), Err(ParseError::TooDeep(MAX_DEPTH + 1)));
  }

  #[test]
  fn heights_of_a_deep_chain_need_no_recursion() {
    let depths: Vec<usize> = (0..5_000).collect();
    let tree = BlockTree::from_depths(&depths, 0);
    let heights = tree.heights();
    assert_eq!(heights[tree.roots[0]], 4_999);
    assert_eq!(heights[4_999], 0);
    assert_eq!(tree.scaffold_variance(), None);
  }

  #[test]
  fn deeply_nested_commit_falls_back_to_tokens() {
    let lines: Vec<String> = (0..3_000).map(|i| format!("{}if cond_{}:", " ".repeat(i), i)).collect();
    let s = run(Language::Python, lines);
    assert_eq!(s.engine, EngineId::Structural);
    assert!(s.normalized_score <= 1.0);
    assert!(!s.explanation.contains("Uniform scaffolding"));
  }

  #[test]
  fn mixed_indentation_fails() {
    let lines = ["def a():", "\tpass", "    pass"];
    assert_eq!(parse_indentation(&lines, MAX_DEPTH), Err(ParseError::MixedIndentation));
  }

  #[test]
  fn inconsistent_dedent_fails() {
    let lines = ["def a():", "        x = 1", "    y = 2"];
    assert!(matches!(
      parse_indentation(&lines, MAX_DEPTH),
      Err(ParseError::InconsistentDedent { .. })
    ));
  }

  #[test]
  fn uniform_sibling_blocks_have_zero_variance() {
    let mut lines = Vec::new();
    for i in 0..4 {
      lines.push(format!("fn f{}() {{", i));
      lines.push(format!("  step_{}();", i));
      lines.push("}".to_string());
    }
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let tree = parse_braces(&refs, MAX_DEPTH).unwrap();
    assert_eq!(tree.scaffold_variance(), Some(0.0));
  }

  #[test]
  fn uniqueness_score_band_and_monotonicity() {
    let t = 0.3;
    assert_eq!(uniqueness_score(0.5, t), 0.0);
    let mut prev = 0.0;
    for i in (0..30).rev() {
      let v = uniqueness_score(i as f64 / 100.0, t);
      assert!(v >= 0.3 && v <= 0.4);
      assert!(v > prev);
      prev = v;
    }
  }

  #[test]
  fn repetitive_code_scores_higher_than_varied() {
    let repetitive: Vec<String> = (0..25).map(|_| "value = compute(value)".to_string()).collect();
    let varied: Vec<String> = (0..25)
      .map(|i| format!("alpha_{} = beta_{}(gamma_{})", i, i, i))
      .collect();
    let r = run(Language::Unknown, repetitive);
    let v = run(Language::Unknown, varied);
    assert!(r.raw_value < v.raw_value);
    assert!(r.normalized_score > v.normalized_score);
  }

  #[test]
  fn unparseable_falls_back_without_failing() {
    let lines = vec!["foo(bar,".to_string(), "baz".to_string()];
    let s = run(Language::Rust, lines);
    assert_eq!(s.engine, EngineId::Structural);
    assert!(s.normalized_score >= 0.0);
  }

  #[test]
  fn react_scaffolding_detected_in_fallback() {
    let lines = vec![
      "const [items, setItems] = useState([]);".to_string(),
      "useEffect(() => { load(); }, []);".to_string(),
    ];
    let s = run(Language::Unknown, lines);
    assert!(s.explanation.contains("React"));
    assert!(s.normalized_score >= 0.3);
  }

  #[test]
  fn empty_addition_scores_zero() {
    let s = run(Language::Rust, vec!["   ".into()]);
    assert_eq!(s.normalized_score, 0.0);
  }
}
