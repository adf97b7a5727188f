//! Recursive resolution of a single reference through a sub-invocation of the engine.

use crate::config::ResourceOptions;
use crate::error::{ResourceError, Result};
use crate::host::ResourceHost;
use crate::models::{ArtifactBody, InvokeRequest, RunOutcome};

/// Resolves references found while processing one file.
///
/// Carries the nesting depth of that file so every sub-invocation is issued one level
/// deeper.
pub struct Resolver<'a, H: ?Sized> {
  host: &'a H,
  options: &'a ResourceOptions,
  depth: usize,
}

impl<'a, H> Resolver<'a, H>
where
  H: ResourceHost + ?Sized,
{
  /// Create a resolver for a file opened at `depth`.
  pub fn new(host: &'a H, options: &'a ResourceOptions, depth: usize) -> Self {
    Self {
      host,
      options,
      depth,
    }
  }

  /// Host the resolver delegates to.
  pub fn host(&self) -> &'a H {
    self.host
  }

  /// Options of the current run.
  pub fn options(&self) -> &'a ResourceOptions {
    self.options
  }

  /// Resolve a local reference to its final path.
  ///
  /// Excluded references come back unchanged without touching the host. Callers must
  /// filter remote URLs beforehand.
  pub async fn resolve(&self, raw_path: &str) -> Result<String> {
    if !self.options.exclude.is_empty() && self.host.is_excluded(raw_path, &self.options.exclude) {
      log::trace!(target: "resource_version::resolver", "excluded {raw_path}");
      return Ok(raw_path.to_string());
    }

    let outcome = self.invoke(raw_path, Some(raw_path)).await?;
    outcome.file_path.ok_or_else(|| ResourceError::IncompleteOutcome {
      path: raw_path.to_string(),
      missing: "final path",
    })
  }

  /// Run the whole engine against `path`.
  pub async fn invoke(&self, path: &str, origin_path: Option<&str>) -> Result<RunOutcome> {
    log::debug!(
      target: "resource_version::resolver",
      "invoking {path} at depth {}",
      self.depth + 1
    );
    self
      .host
      .invoke_self(InvokeRequest {
        path: path.to_string(),
        origin_path: origin_path.map(str::to_string),
        depth: self.depth + 1,
      })
      .await
  }

  /// Register a virtual content unit with the host.
  pub async fn register_virtual(&self, path: String, body: ArtifactBody) -> Result<String> {
    self.host.add_file(path, body, true).await
  }
}
