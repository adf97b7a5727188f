//! Path matchers deciding which references bypass resolution entirely.

use regex::Regex;

use crate::error::{ResourceError, Result};

/// A single compiled exclusion rule.
#[derive(Debug, Clone)]
enum ExcludeRule {
  /// Matches the path itself or anything nested beneath it.
  Scope(String),
  /// `/…/` delimited regular expression or a translated glob.
  Pattern(Regex),
}

/// Compiled set of exclusion rules, keeping the source strings for serialisation.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
  sources: Vec<String>,
  rules: Vec<ExcludeRule>,
}

impl ExcludeSet {
  /// Compile raw rule strings.
  ///
  /// Entries wrapped in slashes (`/\.svg$/`) are regular expressions, entries containing `*`
  /// are globs and everything else is a scope rule.
  pub fn compile<I, S>(values: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut set = Self::default();
    for value in values {
      let value: String = value.into();
      let trimmed = value.trim();
      if trimmed.is_empty() {
        continue;
      }

      let rule = if let Some(expr) = regex_source(trimmed) {
        ExcludeRule::Pattern(compile_regex(expr)?)
      } else if trimmed.contains('*') {
        ExcludeRule::Pattern(compile_regex(&glob_to_regex(trimmed))?)
      } else {
        ExcludeRule::Scope(normalise(trimmed).to_string())
      };

      set.rules.push(rule);
      set.sources.push(value);
    }
    Ok(set)
  }

  /// Returns `true` when `path` matches any rule.
  pub fn matches(&self, path: &str) -> bool {
    let candidate = normalise(path);
    self.rules.iter().any(|rule| match rule {
      ExcludeRule::Scope(scope) => scope_matches(scope, candidate),
      ExcludeRule::Pattern(pattern) => pattern.is_match(path),
    })
  }

  /// Returns `true` when no rules are configured.
  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Source strings the set was compiled from.
  pub fn sources(&self) -> &[String] {
    &self.sources
  }
}

impl TryFrom<Vec<String>> for ExcludeSet {
  type Error = ResourceError;

  fn try_from(values: Vec<String>) -> Result<Self> {
    Self::compile(values)
  }
}

impl From<ExcludeSet> for Vec<String> {
  fn from(set: ExcludeSet) -> Self {
    set.sources
  }
}

fn regex_source(value: &str) -> Option<&str> {
  value
    .strip_prefix('/')
    .and_then(|rest| rest.strip_suffix('/'))
    .filter(|expr| !expr.is_empty())
}

fn compile_regex(expr: &str) -> Result<Regex> {
  Regex::new(expr)
    .map_err(|err| ResourceError::InvalidOptions(format!("bad exclude pattern `{expr}`: {err}")))
}

fn glob_to_regex(glob: &str) -> String {
  let glob = normalise(glob);
  let mut expr = String::from("^/?");
  let mut chars = glob.chars().peekable();
  while let Some(ch) = chars.next() {
    match ch {
      '*' if chars.peek() == Some(&'*') => {
        chars.next();
        expr.push_str(".*");
      }
      '*' => expr.push_str("[^/]*"),
      '?' => expr.push_str("[^/]"),
      other => expr.push_str(&regex::escape(&other.to_string())),
    }
  }
  expr.push('$');
  expr
}

fn normalise(value: &str) -> &str {
  value.trim().trim_matches('/')
}

fn scope_matches(rule: &str, candidate: &str) -> bool {
  if candidate == rule {
    return true;
  }

  candidate
    .strip_prefix(rule)
    .is_some_and(|suffix| suffix.starts_with('/'))
}
