//! Data structures exchanged between the engine and its host.

use std::path::Path;

/// Content kind of the file being processed, selecting the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
  /// Template or HTML markup, supplied as a token tree.
  Markup,
  /// Script source, supplied as raw text.
  Script,
  /// Stylesheet, supplied as a token tree and rendered back by the host.
  Stylesheet,
  /// Anything else; only fingerprinted.
  Binary,
}

impl ContentKind {
  /// Infer the kind from a path's extension.
  pub fn detect(path: &str) -> Self {
    let extension = Path::new(path)
      .extension()
      .and_then(|ext| ext.to_str())
      .map(str::to_ascii_lowercase);

    match extension.as_deref() {
      Some("html" | "htm" | "xhtml" | "tpl") => Self::Markup,
      Some("js" | "mjs") => Self::Script,
      Some("css") => Self::Stylesheet,
      _ => Self::Binary,
    }
  }
}

/// A single attribute on a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
  /// Attribute name as written.
  pub name: String,
  /// Attribute value, `None` for bare boolean attributes.
  pub value: Option<String>,
}

impl Attribute {
  /// Convenience constructor for a valued attribute.
  pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: Some(value.into()),
    }
  }
}

/// Payload of a start tag token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStart {
  /// Lowercase tag name.
  pub tag: String,
  /// Attributes in source order.
  pub attrs: Vec<Attribute>,
}

impl TagStart {
  /// Create a start tag, lowercasing the name.
  pub fn new(tag: &str, attrs: Vec<Attribute>) -> Self {
    Self {
      tag: tag.to_ascii_lowercase(),
      attrs,
    }
  }

  /// Value of the first attribute named `name` (case-insensitive).
  pub fn attr(&self, name: &str) -> Option<&str> {
    self
      .attrs
      .iter()
      .find(|attr| attr.name.eq_ignore_ascii_case(name))
      .and_then(|attr| attr.value.as_deref())
  }

  /// Overwrite the first attribute named `name`, appending it when absent.
  pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
    let value = value.into();
    match self
      .attrs
      .iter_mut()
      .find(|attr| attr.name.eq_ignore_ascii_case(name))
    {
      Some(attr) => attr.value = Some(value),
      None => self.attrs.push(Attribute::new(name, value)),
    }
  }
}

/// A `<script>` element with its start tag and inline body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
  /// Start tag payload.
  pub start: TagStart,
  /// Inline body text; empty for external scripts.
  pub content: String,
}

impl ScriptTag {
  /// External scripts declare a `src` and carry no body to rewrite.
  pub fn is_external(&self) -> bool {
    self.start.attr("src").is_some()
  }
}

/// Inline body of a `<style>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleContent {
  /// Raw body text.
  pub value: String,
  /// Parsed stylesheet tokens, replaced by the rewritten tree after processing.
  ///
  /// When absent the raw `value` is registered as text, and the host must parse it when the
  /// virtual stylesheet's token tree is requested.
  pub tokens: Option<Vec<Token>>,
}

/// A `<style>` element with its start tag and inline body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTag {
  /// Start tag payload.
  pub start: TagStart,
  /// Inline stylesheet body.
  pub content: StyleContent,
}

/// Node of the host supplied content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
  /// Markup start tag.
  TagStart(TagStart),
  /// Markup end tag, lowercase name.
  TagEnd(String),
  /// `<script>` element with inline body.
  Script(ScriptTag),
  /// `<style>` element with inline body.
  Style(StyleTag),
  /// Markup text.
  Text(String),
  /// Markup or stylesheet comment.
  Comment(String),
  /// Stylesheet selector or at-rule prelude.
  CssSelector(String),
  /// Stylesheet property name.
  CssProperty(String),
  /// Stylesheet property value.
  CssValue(String),
  /// Punctuation and anything else passed through verbatim.
  Raw(String),
}

/// Body of a file registered with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactBody {
  /// Raw bytes (renamed artifacts).
  Bytes(Vec<u8>),
  /// Unparsed text.
  Text(String),
  /// Pre-parsed token tree (inline style blocks).
  Tokens(Vec<Token>),
}

/// Request for running the whole engine against another file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
  /// Path of the file to process.
  pub path: String,
  /// Identity the file should report instead of its own path.
  pub origin_path: Option<String>,
  /// Nesting depth of the sub-invocation.
  pub depth: usize,
}

/// Result of computing the final path for some content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
  /// Path written back into the referring content.
  pub final_path: String,
  /// Renamed artifact registered with the host, present only for the rename strategy.
  pub artifact: Option<String>,
}

/// Output of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
  /// Final path of the processed file, absent for markup and virtual stylesheets.
  pub file_path: Option<String>,
  /// Rewritten token tree for markup and stylesheets.
  pub ast: Option<Vec<Token>>,
  /// Rewritten text for scripts.
  pub content: Option<String>,
  /// Artifact registered under the rename strategy.
  pub artifact: Option<String>,
}

impl RunOutcome {
  pub(crate) fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
    self.file_path = Some(fingerprint.final_path);
    self.artifact = fingerprint.artifact;
    self
  }
}
