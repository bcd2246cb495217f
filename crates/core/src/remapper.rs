//! Invocation of the external remapper.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info, instrument, warn};

use crate::config::MirrorConfig;
use crate::errors::RemapError;
use crate::process;

/// The configured remapper command.
#[derive(Debug, Clone)]
pub struct Remapper {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    output_dir: PathBuf,
    clean_output: bool,
}

impl Remapper {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        clean_output: bool,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            output_dir: output_dir.into(),
            clean_output,
        }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(
            config.remapper.program.clone(),
            config.remapper.args.clone(),
            config.remapper.working_dir.clone(),
            config.remapper.output_dir.clone(),
            config.remapper.clean_output,
        )
    }

    /// Arguments with `{upstream}` and `{output}` substituted.
    pub fn expand_args(&self, upstream: &Path) -> Vec<String> {
        let upstream = upstream.to_string_lossy();
        let output = self.output_dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{upstream}", &upstream)
                    .replace("{output}", &output)
            })
            .collect()
    }

    /// Display form of the full command line, used in logs and errors.
    pub fn command_line(&self, upstream: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.expand_args(upstream));
        parts.join(" ")
    }

    /// Run the remapper against the checked-out `upstream` tree and return
    /// the location of the transformed `subtree`.
    ///
    /// Any non-zero exit status is a [`RemapError::RemapFailure`].
    #[instrument(skip(self), fields(program = %self.program))]
    pub fn run(&self, upstream: &Path, subtree: &Path) -> Result<PathBuf, RemapError> {
        let produced = self.output_dir.join(subtree);
        if self.clean_output && produced.exists() && !same_location(&self.output_dir, upstream) {
            std::fs::remove_dir_all(&produced)?;
            debug!(path = %produced.display(), "removed previous remapper output");
        }

        let command = self.command_line(upstream);
        info!(cmd = %command, "starting remapper");
        let status = process::command(&self.program)
            .args(self.expand_args(upstream))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| RemapError::SpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            warn!(cmd = %command, %status, "remapper failed");
            return Err(RemapError::RemapFailure { command, status });
        }

        if !produced.is_dir() {
            return Err(RemapError::OutputMissing(produced.display().to_string()));
        }
        info!("remapper finished");
        Ok(produced)
    }
}

/// In-place remapping writes into the upstream working copy; the clean
/// checkout already wiped that, and deleting it here would delete the input.
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
