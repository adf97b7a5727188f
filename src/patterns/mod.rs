//! Pure pattern definitions locating resource references inside each content kind.
//!
//! Split so that remote/bare-path filtering, markup attribute tables and the
//! stylesheet/script reference expressions can be tested independently of the engine.

mod attrs;
mod filters;
mod reference;

pub use attrs::{SrcsetCandidate, default_tag_attributes, join_srcset, split_srcset};
pub use filters::{extname, is_remote_url, looks_like_file_path};
pub use reference::{ReferencePattern, ReferenceSite};
