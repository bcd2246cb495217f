//! remapmirror core library.
//!
//! Replays an upstream Git history through an external source remapper into a
//! derivative repository. Each output commit carries the original authorship
//! and a provenance trailer naming the upstream commit it came from, which is
//! all a later run needs to resume incrementally.

pub mod config;
pub mod errors;
pub mod git;
pub mod models;
mod process;
pub mod provenance;
pub mod range;
pub mod remapper;
pub mod replay;
pub mod resume;
pub mod tree;
pub mod upstream;
pub mod workspace;

// Re-exports for convenience.
pub use config::MirrorConfig;
pub use provenance::ProvenanceCodec;
pub use replay::Replayer;
