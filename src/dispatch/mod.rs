//! Per content-kind walkers that locate reference sites and rewrite them in place.

pub mod binary;
pub mod markup;
pub mod script;
pub mod stylesheet;

use futures::future::try_join_all;

use crate::error::Result;
use crate::host::ResourceHost;
use crate::patterns::{ReferencePattern, is_remote_url, looks_like_file_path};
use crate::resolver::Resolver;

/// Resolve `path` unless it is remote or does not look like a plain file path.
pub(crate) async fn resolve_local<H>(resolver: &Resolver<'_, H>, path: &str) -> Result<Option<String>>
where
  H: ResourceHost + ?Sized,
{
  if path.is_empty() || is_remote_url(path) || !looks_like_file_path(path) {
    return Ok(None);
  }
  resolver.resolve(path).await.map(Some)
}

/// Replace every `pattern` reference in `text` with its resolved form.
///
/// Sites resolve concurrently; skipped sites keep their original text.
pub(crate) async fn rewrite_references<H>(
  resolver: &Resolver<'_, H>,
  text: &str,
  pattern: ReferencePattern,
) -> Result<String>
where
  H: ResourceHost + ?Sized,
{
  let sites = pattern.find_sites(text);
  if sites.is_empty() {
    return Ok(text.to_string());
  }

  let resolved = try_join_all(
    sites
      .iter()
      .map(|site| resolve_local(resolver, &site.path)),
  )
  .await?;

  let mut output = String::with_capacity(text.len());
  let mut cursor = 0;
  for (site, path) in sites.iter().zip(resolved) {
    output.push_str(&text[cursor..site.range.start]);
    match path {
      Some(path) => output.push_str(&pattern.render(site, &path)),
      None => output.push_str(&text[site.range.clone()]),
    }
    cursor = site.range.end;
  }
  output.push_str(&text[cursor..]);

  Ok(output)
}
