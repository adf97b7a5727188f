#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod exclude;
pub mod fingerprint;
pub mod host;
pub mod memory;
pub mod models;
pub mod patterns;
pub mod resolver;

pub use config::{ResourceOptions, Strategy};
pub use engine::ResourceVersion;
pub use error::{ResourceError, Result};
pub use host::{ResourceHost, SourceFile};
pub use models::{ContentKind, RunOutcome, Token};
