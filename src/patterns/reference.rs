use std::ops::Range;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Characters accepted in a reference path; the path must end in `.<word>`.
const PATH: &str = r"[\w\-./@%~+]+\.\w+";
/// Query string or fragment trailing the path inside the same delimiters.
const SUFFIX: &str = r#"(?:[?#][^'"()\s]*)?"#;

/// Reference syntaxes recognised inside stylesheet values and scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePattern {
  /// `{"cdn": "path/to/resource"}.cdn` in scripts.
  ScriptCdn,
  /// `src='…'` inside legacy `filter` declarations.
  Filter,
  /// `url(…)` inside `@font-face` `src` declarations.
  Font,
  /// Any other `url(…)`, typically background images.
  Background,
}

/// A located reference inside a payload string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSite {
  /// Byte range of the whole match.
  pub range: Range<usize>,
  /// Extracted path.
  pub path: String,
  /// Quote character around the path, empty when unquoted.
  pub quote: &'static str,
  /// Query string or fragment following the path.
  pub suffix: String,
}

impl ReferencePattern {
  fn regex(self) -> &'static Regex {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    static FILTER: OnceLock<Regex> = OnceLock::new();
    static URL: OnceLock<Regex> = OnceLock::new();

    match self {
      Self::ScriptCdn => SCRIPT.get_or_init(|| {
        Regex::new(&format!(
          r#"\{{\s*(?:"cdn"|'cdn'|cdn)\s*:\s*(?:"(?P<dq>{PATH})(?P<dqs>{SUFFIX})"|'(?P<sq>{PATH})(?P<sqs>{SUFFIX})')\s*\}}\.cdn\b"#
        ))
        .expect("invalid script reference regex")
      }),
      Self::Filter => FILTER.get_or_init(|| {
        Regex::new(&format!(
          r#"(?i)\bsrc\s*=\s*(?:"(?P<dq>{PATH})(?P<dqs>{SUFFIX})"|'(?P<sq>{PATH})(?P<sqs>{SUFFIX})'|(?P<bare>{PATH})(?P<bares>{SUFFIX}))"#
        ))
        .expect("invalid filter reference regex")
      }),
      Self::Font | Self::Background => URL.get_or_init(|| {
        Regex::new(&format!(
          r#"(?i)\burl\(\s*(?:"(?P<dq>{PATH})(?P<dqs>{SUFFIX})"|'(?P<sq>{PATH})(?P<sqs>{SUFFIX})'|(?P<bare>{PATH})(?P<bares>{SUFFIX}))\s*\)"#
        ))
        .expect("invalid url reference regex")
      }),
    }
  }

  /// Pick the pattern for a stylesheet value given its lowercase property name.
  pub fn for_property(property: Option<&str>) -> Self {
    match property {
      Some("filter") => Self::Filter,
      Some("src") => Self::Font,
      _ => Self::Background,
    }
  }

  /// Locate every reference in `text`, in source order.
  pub fn find_sites(self, text: &str) -> Vec<ReferenceSite> {
    self
      .regex()
      .captures_iter(text)
      .filter_map(|caps| site_from(&caps))
      .collect()
  }

  /// Text replacing the whole match once the path resolved to `path`.
  pub fn render(self, site: &ReferenceSite, path: &str) -> String {
    let quote = site.quote;
    match self {
      Self::ScriptCdn => format!("\"{path}\""),
      Self::Filter => format!("src={quote}{path}{quote}"),
      Self::Font => format!("url({quote}{path}{}{quote})", site.suffix),
      Self::Background => {
        let fragment = site.suffix.find('#').map_or("", |index| &site.suffix[index..]);
        format!("url({quote}{path}{fragment}{quote})")
      }
    }
  }
}

fn site_from(caps: &Captures<'_>) -> Option<ReferenceSite> {
  let whole = caps.get(0)?;
  let (quote, path, suffix) = [("\"", "dq", "dqs"), ("'", "sq", "sqs"), ("", "bare", "bares")]
    .into_iter()
    .find_map(|(quote, path, suffix)| {
      let path = caps.name(path)?;
      Some((quote, path.as_str(), caps.name(suffix).map_or("", |m| m.as_str())))
    })?;

  Some(ReferenceSite {
    range: whole.range(),
    path: path.to_string(),
    quote,
    suffix: suffix.to_string(),
  })
}
