//! Upstream repository access via the `git` CLI.

pub mod client;
pub mod log;
pub mod parser;

pub use client::UpstreamClient;
pub use log::SourceLog;
pub use parser::*;
