use std::sync::OnceLock;

use regex::Regex;

fn remote_reference_patterns() -> &'static [Regex] {
  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  PATTERNS
    .get_or_init(|| {
      vec![
        Regex::new(r"(?i)^(?:[a-z][a-z0-9+.\-]*:)?//").expect("invalid scheme regex"),
        Regex::new(r"(?i)^data:").expect("invalid data URI regex"),
        Regex::new(r"(?i)^mailto:").expect("invalid mailto regex"),
        Regex::new(r"(?i)^javascript:").expect("invalid javascript regex"),
        Regex::new(r"(?i)^(?:about|tel):").expect("invalid about regex"),
      ]
    })
    .as_slice()
}

fn bare_extension_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"^\.\w+$").expect("invalid extension regex"))
}

/// Determine whether a reference points outside the local file set.
///
/// Absolute and protocol-relative URLs, data URIs and pseudo schemes are never resolved.
pub fn is_remote_url(value: &str) -> bool {
  let value = value.trim_start();
  remote_reference_patterns()
    .iter()
    .any(|pattern| pattern.is_match(value))
}

/// Extension of the final path segment including the leading dot, or `""`.
///
/// Dot-files such as `.htaccess` have no extension.
pub fn extname(path: &str) -> &str {
  let base = path.rsplit('/').next().unwrap_or(path);
  match base.rfind('.') {
    Some(index) if index > 0 => &base[index..],
    _ => "",
  }
}

/// Heuristic separating plain file paths from templated or dynamic values.
///
/// `{{ asset }}.png`, `/img/<%= name %>` or `/a.png?x=1` fail because the text after the final
/// dot is not a simple word.
pub fn looks_like_file_path(path: &str) -> bool {
  bare_extension_pattern().is_match(extname(path))
}
