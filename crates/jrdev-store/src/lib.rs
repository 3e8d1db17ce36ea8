//! JSON-file persistence for JrDev's on-disk state (spec.md §6).
//!
//! Everything here is a flat JSON file under `~/.jrdev` or
//! `<project>/.jrdev`; `json::read_json`/`write_json` are generic so the
//! domain types living in `jrdev-registry` and `jrdev-core` don't need to
//! depend back on this crate.

pub mod error;
pub mod git_config;
pub mod json;
pub mod paths;

pub use error::{Error, Result};
pub use git_config::GitConfig;
pub use json::{read_json, write_json};
pub use paths::{ProjectPaths, UserPaths};
