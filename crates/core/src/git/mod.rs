//! Output repository access via `git2`.

pub mod client;

pub use client::{Committer, GitClient};
