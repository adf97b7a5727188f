//! Script content: `{"cdn": "…"}.cdn` accessors are replaced by resolved string literals.

use anyhow::Context;

use super::rewrite_references;
use crate::error::Result;
use crate::fingerprint::compute_path;
use crate::host::{ResourceHost, SourceFile};
use crate::models::RunOutcome;
use crate::patterns::ReferencePattern;
use crate::resolver::Resolver;

/// Rewrite a whole script file and fingerprint the rewritten text.
pub async fn dispatch<H, F>(resolver: &Resolver<'_, H>, file: &mut F) -> Result<RunOutcome>
where
  H: ResourceHost + ?Sized,
  F: SourceFile + ?Sized,
{
  let bytes = file.content().await?;
  let text = String::from_utf8(bytes)
    .with_context(|| format!("script {} is not valid UTF-8", file.path()))?;

  let content = rewrite_text(resolver, &text).await?;
  let fingerprint = compute_path(
    resolver.host(),
    resolver.options(),
    content.as_bytes(),
    file.path(),
    file.origin_path(),
  )
  .await?;

  Ok(
    RunOutcome {
      content: Some(content),
      ..RunOutcome::default()
    }
    .with_fingerprint(fingerprint),
  )
}

/// Rewrite script text in place; shared with inline `<script>` bodies.
pub async fn rewrite_text<H>(resolver: &Resolver<'_, H>, text: &str) -> Result<String>
where
  H: ResourceHost + ?Sized,
{
  rewrite_references(resolver, text, ReferencePattern::ScriptCdn).await
}
