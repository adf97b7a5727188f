//! Opaque content: no reference scanning, only fingerprinting.

use crate::error::Result;
use crate::fingerprint::compute_path;
use crate::host::{ResourceHost, SourceFile};
use crate::models::RunOutcome;
use crate::resolver::Resolver;

/// Compute the final path directly from the raw bytes.
pub async fn dispatch<H, F>(resolver: &Resolver<'_, H>, file: &mut F) -> Result<RunOutcome>
where
  H: ResourceHost + ?Sized,
  F: SourceFile + ?Sized,
{
  let content = file.content().await?;
  let fingerprint = compute_path(
    resolver.host(),
    resolver.options(),
    &content,
    file.path(),
    file.origin_path(),
  )
  .await?;

  Ok(RunOutcome::default().with_fingerprint(fingerprint))
}
