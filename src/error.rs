//! Error taxonomy shared by the engine and host implementations.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = ResourceError> = std::result::Result<T, E>;

/// Failures that abort processing of the file currently being rewritten.
///
/// References that cannot be decomposed into a plain file path are not errors; they are
/// left untouched by the dispatchers.
#[derive(Debug, Error)]
pub enum ResourceError {
  /// A referenced local file is not part of the host's resolvable set.
  #[error("referenced file `{path}` does not exist")]
  MissingFile {
    /// Logical path of the missing reference.
    path: String,
  },
  /// The file registry refused to register an artifact.
  #[error("file registry rejected `{path}`: {reason}")]
  RegistryRejected {
    /// Path the artifact was registered under.
    path: String,
    /// Host supplied explanation.
    reason: String,
  },
  /// A sub-invocation finished without the piece of output its caller needs.
  #[error("processing `{path}` produced no {missing}")]
  IncompleteOutcome {
    /// Path of the sub-invoked file.
    path: String,
    /// Name of the missing output.
    missing: &'static str,
  },
  /// Nested references went deeper than the engine permits.
  #[error("recursion limit of {limit} exceeded while processing `{path}`")]
  RecursionLimit {
    /// File that tripped the guard.
    path: String,
    /// Maximum nesting depth.
    limit: usize,
  },
  /// Options were well-formed JSON but semantically invalid.
  #[error("invalid options: {0}")]
  InvalidOptions(String),
  /// Failed to read an options file from disk.
  #[error("failed to read {}", path.display())]
  OptionsIo {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    #[source]
    source: std::io::Error,
  },
  /// Failed to parse options JSON.
  #[error("failed to parse options")]
  OptionsParse(#[from] serde_json::Error),
  /// Any other failure raised by a host collaborator.
  #[error(transparent)]
  Host(#[from] anyhow::Error),
}
