//! Error types for the remapmirror core library.
//!
//! Each subsystem has its own error type derived with `thiserror`.
//! [`ReplayError`] wraps the upstream, output and remapper errors it can
//! surface during a pass.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Upstream errors
// ---------------------------------------------------------------------------

/// Errors from `git` CLI operations against the upstream working copy.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// The upstream path is not a git working copy.
    #[error("upstream working copy not found at '{0}'")]
    WorkingCopyNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("command '{command}' failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The resume point never appeared in the upstream log.
    #[error(
        "reached end of upstream log without finding start commit {start} \
         (history rewritten or resume point stale)"
    )]
    StartCommitNotFound { start: String },

    /// Could not parse the output produced by `git`.
    #[error("failed to parse git output: {0}")]
    ParseError(String),

    /// Generic I/O wrapper.
    #[error("upstream I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Output repository errors
// ---------------------------------------------------------------------------

/// Errors from output repository (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Remapper errors
// ---------------------------------------------------------------------------

/// Errors from invoking the external remapper.
#[derive(Debug, Error)]
pub enum RemapError {
    /// The remapper program could not be started.
    #[error("failed to start remapper '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The remapper exited unsuccessfully or was killed by a signal.
    #[error("remapper command '{command}' failed ({status})")]
    RemapFailure {
        command: String,
        status: std::process::ExitStatus,
    },

    /// The remapper succeeded but left no output subtree behind.
    #[error("remapper output not found at '{0}'")]
    OutputMissing(String),

    /// Generic I/O wrapper (e.g. cleaning previous output).
    #[error("remapper I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Replay errors
// ---------------------------------------------------------------------------

/// Errors from the replay driver.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The upstream author line is not of the form `Name <email>`.
    #[error("invalid author identity '{0}'")]
    InvalidAuthor(String),

    /// The upstream author date is not RFC 2822.
    #[error("invalid author date '{date}': {detail}")]
    InvalidDate { date: String, detail: String },

    /// Copying the remapped tree into the output repository failed.
    #[error("failed to materialize '{path}': {source}")]
    TreeCopyFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("replay upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("replay output repository error: {0}")]
    Git(#[from] GitError),

    #[error("replay remapper error: {0}")]
    Remap(#[from] RemapError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = UpstreamError::StartCommitNotFound {
            start: "abc123".into(),
        };
        assert!(err.to_string().contains("abc123"));

        let err = GitError::RepositoryNotFound("/tmp/out".into());
        assert_eq!(err.to_string(), "git repository not found at '/tmp/out'");

        let err = ConfigError::InvalidValue {
            field: "output.subtree".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("output.subtree"));
    }

    #[cfg(unix)]
    #[test]
    fn test_remap_failure_names_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        let err = RemapError::RemapFailure {
            command: "python remap.py".into(),
            status: std::process::ExitStatus::from_raw(2 << 8),
        };
        assert_eq!(
            err.to_string(),
            "remapper command 'python remap.py' failed (exit status: 2)"
        );

        let err = RemapError::RemapFailure {
            command: "python remap.py".into(),
            status: std::process::ExitStatus::from_raw(9),
        };
        assert!(err.to_string().contains("signal: 9"));
    }
}
