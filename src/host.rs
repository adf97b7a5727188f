//! Collaborator traits implemented by the hosting pipeline.

use futures::future::LocalBoxFuture;

use crate::error::Result;
use crate::exclude::ExcludeSet;
use crate::models::{ArtifactBody, ContentKind, InvokeRequest, RunOutcome, Token};

/// Handle to the file currently being processed.
///
/// Combines the token tree provider (markup and stylesheets) with the content provider
/// (scripts and binaries).
pub trait SourceFile {
  /// Logical path of the file.
  fn path(&self) -> &str;

  /// Declared content kind.
  fn kind(&self) -> ContentKind;

  /// Identity assigned by the referring file, reported instead of [`SourceFile::path`].
  fn origin_path(&self) -> Option<&str> {
    None
  }

  /// Virtual files only exist inside the pipeline, e.g. extracted inline style blocks.
  fn is_virtual(&self) -> bool {
    false
  }

  /// Nesting depth of the invocation that opened this file.
  fn depth(&self) -> usize {
    0
  }

  /// Structural representation of markup and stylesheet content.
  fn ast(&mut self) -> LocalBoxFuture<'_, Result<Vec<Token>>>;

  /// Replace the structural representation.
  fn set_ast(&mut self, tokens: Vec<Token>);

  /// Raw bytes; for token backed files this renders the current tree.
  fn content(&mut self) -> LocalBoxFuture<'_, Result<Vec<u8>>>;

  /// Replace the raw bytes.
  fn set_content(&mut self, content: Vec<u8>);
}

/// Services the host pipeline provides to the engine.
pub trait ResourceHost {
  /// Run the whole engine against another file and return its outcome.
  fn invoke_self(&self, request: InvokeRequest) -> LocalBoxFuture<'_, Result<RunOutcome>>;

  /// Register a new artifact, returning the path it was registered under.
  fn add_file(
    &self,
    path: String,
    body: ArtifactBody,
    is_virtual: bool,
  ) -> LocalBoxFuture<'_, Result<String>>;

  /// Decide whether a reference bypasses resolution.
  fn is_excluded(&self, path: &str, exclude: &ExcludeSet) -> bool {
    exclude.matches(path)
  }
}
