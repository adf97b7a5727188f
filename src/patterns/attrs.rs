/// Built-in resource attributes for a lowercase tag name.
pub fn default_tag_attributes(tag: &str) -> &'static [&'static str] {
  match tag {
    "img" | "source" => &["src", "srcset"],
    "script" | "embed" | "audio" | "track" | "input" => &["src"],
    "link" => &["href"],
    "object" => &["data"],
    "video" => &["src", "poster"],
    _ => &[],
  }
}

/// One comma separated entry of a `srcset` value.
///
/// Whitespace and descriptors are kept verbatim so the list can be reassembled with only the
/// URL replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate {
  /// Whitespace preceding the URL.
  pub leading: String,
  /// Image URL.
  pub url: String,
  /// Descriptor text following the URL, including surrounding whitespace.
  pub rest: String,
}

impl SrcsetCandidate {
  fn parse(item: &str) -> Self {
    let body = item.trim_start();
    let leading = &item[..item.len() - body.len()];
    let split = body.find(char::is_whitespace).unwrap_or(body.len());

    Self {
      leading: leading.to_string(),
      url: body[..split].to_string(),
      rest: body[split..].to_string(),
    }
  }
}

/// Split a `srcset` value into its candidates, preserving item order.
pub fn split_srcset(value: &str) -> Vec<SrcsetCandidate> {
  value.split(',').map(SrcsetCandidate::parse).collect()
}

/// Reassemble candidates produced by [`split_srcset`].
pub fn join_srcset(candidates: &[SrcsetCandidate]) -> String {
  candidates
    .iter()
    .map(|candidate| format!("{}{}{}", candidate.leading, candidate.url, candidate.rest))
    .collect::<Vec<_>>()
    .join(",")
}
