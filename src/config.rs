//! Run options controlling how resolved references are rewritten.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ResourceError, Result};
use crate::exclude::ExcludeSet;
use crate::patterns::default_tag_attributes;

const DEFAULT_CONFIG_FILE: &str = "resource-version.json";

/// Width of the hex digest; longer hash lengths are clamped to it.
pub const DIGEST_HEX_LEN: usize = 64;

/// Path rewriting strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
  /// Append `?v=<hash>` to the referenced path.
  #[default]
  Query,
  /// Embed `_<hash>` before the extension and register the renamed file.
  Rename,
}

/// Attribute names configured for a tag, either a single name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AttrList {
  /// A single attribute name.
  One(String),
  /// Several attribute names.
  Many(Vec<String>),
}

impl AttrList {
  /// Iterate over the configured attribute names.
  pub fn iter(&self) -> impl Iterator<Item = &str> {
    let names: &[String] = match self {
      Self::One(name) => std::slice::from_ref(name),
      Self::Many(names) => names,
    };
    names.iter().map(String::as_str)
  }
}

/// Options for a single engine run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceOptions {
  /// Path rewriting strategy.
  #[serde(rename = "type")]
  pub strategy: Strategy,
  /// Number of hex characters of the content digest kept in paths.
  pub length: usize,
  /// References matching these rules are returned unchanged.
  #[serde(
    deserialize_with = "deserialize_exclude",
    serialize_with = "serialize_exclude"
  )]
  pub exclude: ExcludeSet,
  /// Extra resource attributes keyed by lowercase tag name.
  pub tag_attrs: BTreeMap<String, AttrList>,
}

impl Default for ResourceOptions {
  fn default() -> Self {
    Self {
      strategy: Strategy::Query,
      length: 5,
      exclude: ExcludeSet::default(),
      tag_attrs: BTreeMap::new(),
    }
  }
}

impl ResourceOptions {
  /// Overlay caller supplied options on top of the defaults.
  ///
  /// `overrides` must be a JSON object (or `null` for pure defaults); unknown keys are
  /// ignored so that options shared with sibling stages do not cause failures.
  pub fn merged(overrides: &Value) -> Result<Self> {
    let mut base = serde_json::to_value(Self::default())?;
    match (overrides, &mut base) {
      (Value::Null, _) => {}
      (Value::Object(extra), Value::Object(target)) => {
        for (key, value) in extra {
          if !value.is_null() {
            target.insert(key.clone(), value.clone());
          }
        }
      }
      _ => {
        return Err(ResourceError::InvalidOptions(
          "options must be a JSON object".into(),
        ));
      }
    }

    let options: Self = serde_json::from_value(base)?;
    options.validated()
  }

  /// Attempt to load options from `resource-version.json` in the provided directory.
  pub fn discover(dir: &Path) -> Result<Self> {
    Self::from_path(dir.join(DEFAULT_CONFIG_FILE))
  }

  /// Read options from a specific JSON file, falling back to defaults when it is missing.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(Self::default());
      }
      Err(err) => {
        return Err(ResourceError::OptionsIo {
          path: path.to_path_buf(),
          source: err,
        });
      }
    };

    let value: Value = serde_json::from_str(&contents)?;
    Self::merged(&value)
  }

  /// Reject unusable values and clamp the hash length to the digest width.
  pub fn validated(mut self) -> Result<Self> {
    if self.length == 0 {
      return Err(ResourceError::InvalidOptions(
        "`length` must be a positive integer".into(),
      ));
    }
    self.length = self.length.min(DIGEST_HEX_LEN);
    Ok(self)
  }

  /// Resource attributes for `tag`: built-in names first, then configured extras.
  pub fn attributes_for(&self, tag: &str) -> Vec<&str> {
    let mut names: Vec<&str> = default_tag_attributes(tag).to_vec();
    if let Some(extra) = self.tag_attrs.get(tag) {
      for name in extra.iter() {
        if !names.contains(&name) {
          names.push(name);
        }
      }
    }
    names
  }
}

fn deserialize_exclude<'de, D>(deserializer: D) -> std::result::Result<ExcludeSet, D::Error>
where
  D: serde::Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    One(String),
    Many(Vec<String>),
  }

  let values = match Raw::deserialize(deserializer)? {
    Raw::One(value) => vec![value],
    Raw::Many(values) => values,
  };
  ExcludeSet::compile(values).map_err(serde::de::Error::custom)
}

fn serialize_exclude<S>(set: &ExcludeSet, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
  S: serde::Serializer,
{
  set.sources().serialize(serializer)
}
