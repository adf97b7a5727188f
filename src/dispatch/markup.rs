//! Markup content: tag attributes, inline scripts and inline style blocks.

use futures::future::try_join_all;

use super::{resolve_local, rewrite_references, script};
use crate::error::{ResourceError, Result};
use crate::fingerprint::content_digest;
use crate::host::{ResourceHost, SourceFile};
use crate::models::{ArtifactBody, RunOutcome, ScriptTag, StyleTag, TagStart, Token};
use crate::patterns::{ReferencePattern, is_remote_url, join_srcset, split_srcset};
use crate::resolver::Resolver;

const STYLE_ATTRIBUTE: &str = "style";
const SRCSET_ATTRIBUTE: &str = "srcset";

/// How a single attribute value is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
  Path,
  Srcset,
  Style,
}

/// Rewrite every tag start, inline script and inline style in the token tree.
///
/// Tokens are processed concurrently; the returned tree keeps the original order.
pub async fn dispatch<H, F>(resolver: &Resolver<'_, H>, file: &mut F) -> Result<RunOutcome>
where
  H: ResourceHost + ?Sized,
  F: SourceFile + ?Sized,
{
  let mut tokens = file.ast().await?;
  rewrite_tokens(resolver, &mut tokens).await?;

  Ok(RunOutcome {
    ast: Some(tokens),
    ..RunOutcome::default()
  })
}

/// Rewrite markup tokens in place.
pub async fn rewrite_tokens<H>(resolver: &Resolver<'_, H>, tokens: &mut [Token]) -> Result<()>
where
  H: ResourceHost + ?Sized,
{
  try_join_all(
    tokens
      .iter_mut()
      .map(|token| rewrite_token(resolver, token)),
  )
  .await?;
  Ok(())
}

async fn rewrite_token<H>(resolver: &Resolver<'_, H>, token: &mut Token) -> Result<()>
where
  H: ResourceHost + ?Sized,
{
  match token {
    Token::TagStart(start) => rewrite_tag_start(resolver, start).await,
    Token::Script(script) => rewrite_script_tag(resolver, script).await,
    Token::Style(style) => rewrite_style_tag(resolver, style).await,
    Token::TagEnd(_)
    | Token::Text(_)
    | Token::Comment(_)
    | Token::CssSelector(_)
    | Token::CssProperty(_)
    | Token::CssValue(_)
    | Token::Raw(_) => Ok(()),
  }
}

/// Resolve resource attributes and the inline `style` attribute of a start tag.
pub async fn rewrite_tag_start<H>(resolver: &Resolver<'_, H>, start: &mut TagStart) -> Result<()>
where
  H: ResourceHost + ?Sized,
{
  let mut jobs: Vec<(String, String, AttributeKind)> = Vec::new();

  for name in resolver.options().attributes_for(&start.tag) {
    if name.eq_ignore_ascii_case(STYLE_ATTRIBUTE) {
      continue;
    }
    let Some(value) = start.attr(name) else {
      continue;
    };
    if value.is_empty() || is_remote_url(value) {
      continue;
    }

    let kind = if name.eq_ignore_ascii_case(SRCSET_ATTRIBUTE) {
      AttributeKind::Srcset
    } else {
      AttributeKind::Path
    };
    jobs.push((name.to_string(), value.to_string(), kind));
  }

  if let Some(style) = start.attr(STYLE_ATTRIBUTE).filter(|value| !value.is_empty()) {
    jobs.push((STYLE_ATTRIBUTE.to_string(), style.to_string(), AttributeKind::Style));
  }

  if jobs.is_empty() {
    return Ok(());
  }

  let results = try_join_all(
    jobs
      .iter()
      .map(|(_, value, kind)| resolve_attribute(resolver, value, *kind)),
  )
  .await?;

  for ((name, _, _), result) in jobs.iter().zip(results) {
    if let Some(value) = result {
      start.set_attr(name, value);
    }
  }

  Ok(())
}

async fn resolve_attribute<H>(
  resolver: &Resolver<'_, H>,
  value: &str,
  kind: AttributeKind,
) -> Result<Option<String>>
where
  H: ResourceHost + ?Sized,
{
  match kind {
    AttributeKind::Path => resolve_local(resolver, value).await,
    AttributeKind::Srcset => resolve_srcset(resolver, value).await.map(Some),
    AttributeKind::Style => rewrite_references(resolver, value, ReferencePattern::Background)
      .await
      .map(Some),
  }
}

/// Resolve each candidate URL of a `srcset` independently, keeping descriptors and order.
async fn resolve_srcset<H>(resolver: &Resolver<'_, H>, value: &str) -> Result<String>
where
  H: ResourceHost + ?Sized,
{
  let mut candidates = split_srcset(value);
  let resolved = try_join_all(
    candidates
      .iter()
      .map(|candidate| resolve_local(resolver, &candidate.url)),
  )
  .await?;

  for (candidate, url) in candidates.iter_mut().zip(resolved) {
    if let Some(url) = url {
      candidate.url = url;
    }
  }

  Ok(join_srcset(&candidates))
}

async fn rewrite_script_tag<H>(resolver: &Resolver<'_, H>, script: &mut ScriptTag) -> Result<()>
where
  H: ResourceHost + ?Sized,
{
  if script.is_external() {
    return rewrite_tag_start(resolver, &mut script.start).await;
  }

  script.content = script::rewrite_text(resolver, &script.content).await?;
  Ok(())
}

/// Promote an inline style body to a virtual stylesheet and run the engine on it.
async fn rewrite_style_tag<H>(resolver: &Resolver<'_, H>, style: &mut StyleTag) -> Result<()>
where
  H: ResourceHost + ?Sized,
{
  let content = &mut style.content;
  let path = format!("{}.css", content_digest(content.value.as_bytes()));
  let body = match &content.tokens {
    Some(tokens) => ArtifactBody::Tokens(tokens.clone()),
    None => ArtifactBody::Text(content.value.clone()),
  };

  let registered = resolver.register_virtual(path, body).await?;
  let outcome = resolver.invoke(&registered, None).await?;
  let tokens = outcome.ast.ok_or(ResourceError::IncompleteOutcome {
    path: registered,
    missing: "token tree",
  })?;

  content.tokens = Some(tokens);
  Ok(())
}
