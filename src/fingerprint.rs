//! Content hashing and the query / rename path strategies.

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::{ResourceOptions, Strategy};
use crate::error::Result;
use crate::host::ResourceHost;
use crate::models::{ArtifactBody, Fingerprint};

/// Lowercase hex SHA-256 digest of `content`.
pub fn content_digest(content: &[u8]) -> String {
  let digest = Sha256::digest(content);
  digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Digest truncated to `length` characters.
pub fn short_hash(content: &[u8], length: usize) -> String {
  let mut digest = content_digest(content);
  digest.truncate(length);
  digest
}

/// Insert `_<hash>` before the final extension; paths without one are returned unchanged.
pub fn insert_hash(path: &str, hash: &str) -> String {
  static EXTENSION: OnceLock<Regex> = OnceLock::new();
  let pattern = EXTENSION.get_or_init(|| Regex::new(r"(\.\w+)$").expect("invalid extension regex"));
  pattern
    .replace(path, format!("_{hash}${{1}}").as_str())
    .into_owned()
}

/// Path for `hash` under `strategy`, starting from the path reported to the referrer.
pub fn versioned_path(strategy: Strategy, path: &str, hash: &str) -> String {
  match strategy {
    Strategy::Query => format!("{path}?v={hash}"),
    Strategy::Rename => insert_hash(path, hash),
  }
}

/// Compute the final path for `content`, registering the renamed artifact when required.
///
/// `origin_path` is the identity the referrer knows the file by; it defaults to
/// `logical_path`.
pub async fn compute_path<H>(
  host: &H,
  options: &ResourceOptions,
  content: &[u8],
  logical_path: &str,
  origin_path: Option<&str>,
) -> Result<Fingerprint>
where
  H: ResourceHost + ?Sized,
{
  let hash = short_hash(content, options.length);
  let origin = origin_path.unwrap_or(logical_path);
  let final_path = versioned_path(options.strategy, origin, &hash);

  let artifact = match options.strategy {
    Strategy::Query => None,
    Strategy::Rename => {
      let renamed = insert_hash(logical_path, &hash);
      log::debug!(target: "resource_version::fingerprint", "registering {renamed}");
      let registered = host
        .add_file(renamed, ArtifactBody::Bytes(content.to_vec()), false)
        .await?;
      Some(registered)
    }
  };

  Ok(Fingerprint {
    final_path,
    artifact,
  })
}
