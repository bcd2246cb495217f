//! Blocking `git` CLI client for the upstream working copy.
//!
//! Every command runs with an explicit `current_dir`; nothing here changes the
//! process working directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info, instrument, warn};

use super::parser::{parse_commit_detail, parse_oneline_log, DETAIL_FORMAT};
use crate::errors::UpstreamError;
use crate::models::{CommitDetail, CommitRecord};
use crate::process;

/// Client for the disposable upstream working copy.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    path: PathBuf,
    log_rev: String,
}

impl UpstreamClient {
    /// Use an existing working copy at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, UpstreamError> {
        let path = path.as_ref();
        if !path.join(".git").exists() {
            return Err(UpstreamError::WorkingCopyNotFound(
                path.display().to_string(),
            ));
        }
        info!(path = %path.display(), "opened upstream working copy");
        Ok(Self {
            path: path.to_path_buf(),
            log_rev: "HEAD".into(),
        })
    }

    /// Delete anything at `path` and clone `url` there.
    #[instrument(fields(url = %url, path = %path.display()))]
    pub fn clone_fresh(url: &str, path: &Path) -> Result<Self, UpstreamError> {
        if path.exists() {
            info!("removing previous upstream working copy");
            std::fs::remove_dir_all(path)?;
        }
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let target = path.to_string_lossy().to_string();
        run_git(&parent, &["clone", url, &target])?;
        info!("clone completed");
        Ok(Self {
            path: path.to_path_buf(),
            log_rev: "HEAD".into(),
        })
    }

    /// Read history from `rev` instead of HEAD, so a working copy left
    /// detached at an old commit still sees the whole branch.
    pub fn tracking(mut self, rev: impl Into<String>) -> Self {
        self.log_rev = rev.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fast-forward the current branch to `remote`/`branch`.
    #[instrument(skip(self))]
    pub fn pull(&self, remote: &str, branch: &str) -> Result<(), UpstreamError> {
        self.run(&["pull", "--ff-only", "--quiet", remote, branch])?;
        info!(remote, branch, "pull completed");
        Ok(())
    }

    /// Check out a branch name or commit id.
    #[instrument(skip(self))]
    pub fn checkout(&self, rev: &str) -> Result<(), UpstreamError> {
        self.run(&["checkout", "--quiet", rev])?;
        debug!(rev, "checked out");
        Ok(())
    }

    /// Discard every local change: remove `scratch_paths`, hard-reset tracked
    /// files to HEAD and delete untracked files and directories.
    #[instrument(skip(self, scratch_paths))]
    pub fn reset_clean(&self, scratch_paths: &[PathBuf]) -> Result<(), UpstreamError> {
        for scratch in scratch_paths {
            let target = self.path.join(scratch);
            if target.is_dir() {
                std::fs::remove_dir_all(&target)?;
                debug!(path = %target.display(), "removed scratch directory");
            } else if target.exists() {
                std::fs::remove_file(&target)?;
            }
        }
        self.run(&["reset", "--hard", "--quiet", "HEAD"])?;
        self.run(&["clean", "-fd", "--quiet"])?;
        debug!("working copy reset");
        Ok(())
    }

    /// `git log --format=oneline` records of the tracked revision, newest
    /// first, following first parents only.
    pub fn log_oneline(&self) -> Result<Vec<CommitRecord>, UpstreamError> {
        let output = self.run(&[
            "log",
            "--first-parent",
            "--format=oneline",
            &self.log_rev,
            "--",
        ])?;
        parse_oneline_log(&output)
    }

    /// Author, date and full message of one commit.
    pub fn show_detail(&self, id: &str) -> Result<CommitDetail, UpstreamError> {
        let output = self.run(&["show", "--no-patch", DETAIL_FORMAT, id])?;
        parse_commit_detail(&output)
    }

    fn run(&self, args: &[&str]) -> Result<String, UpstreamError> {
        run_git(&self.path, args)
    }
}

/// Run `git` in `dir` and return stdout; a non-zero exit is an error naming
/// the command and its status.
fn run_git(dir: &Path, args: &[&str]) -> Result<String, UpstreamError> {
    let command = format!("git {}", args.join(" "));
    debug!(cmd = %command, dir = %dir.display(), "running git command");

    let output = process::command("git")
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UpstreamError::BinaryNotFound("git".into())
            } else {
                UpstreamError::IoError(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let status = output.status;
        warn!(cmd = %command, %status, %stderr, "git command failed");
        return Err(UpstreamError::CommandFailed {
            command,
            status,
            stderr,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
