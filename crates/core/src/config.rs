//! Configuration for remapmirror.
//!
//! Everything the replay needs to know lives in one TOML file: where the
//! upstream working copy and the output repository are, how to run the
//! remapper, how provenance trailers are spelled, and which preparation steps
//! run before replay.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// General settings.
    #[serde(default)]
    pub mirror: MirrorSection,

    /// Upstream repository whose history is replayed.
    pub upstream: UpstreamConfig,

    /// Output repository receiving the remapped commits.
    pub output: OutputConfig,

    /// External remapper invocation.
    pub remapper: RemapperConfig,

    /// Provenance trailer spelling.
    #[serde(default)]
    pub provenance: ProvenanceConfig,

    /// Preparation toggles and replay limits.
    #[serde(default)]
    pub options: OptionsConfig,
}

// ---------------------------------------------------------------------------
// Mirror section
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorSection {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for MirrorSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

/// Upstream repository settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// URL to clone from when `options.clone_fresh` is set.
    #[serde(default)]
    pub clone_url: Option<String>,

    /// Local working copy of the upstream repository.
    pub path: PathBuf,

    /// Remote name used when pulling the latest changes.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Branch that carries the linear history being replayed.
    #[serde(default = "default_upstream_branch")]
    pub branch: String,

    /// Base URL for browsing a single upstream commit; the commit id is
    /// appended to it in the provenance trailer.
    pub commit_url: String,

    /// Resume point used when the output history carries no provenance.
    pub default_start_commit: String,

    /// Directories removed from the working copy before every checkout, in
    /// addition to the hard reset.
    #[serde(default = "default_scratch_paths")]
    pub scratch_paths: Vec<PathBuf>,
}

fn default_remote() -> String {
    "origin".into()
}

fn default_upstream_branch() -> String {
    "master".into()
}

fn default_scratch_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Output repository settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Location of the output repository; created on first run.
    pub path: PathBuf,

    /// The single tracked subtree holding transformed sources.
    #[serde(default = "default_subtree")]
    pub subtree: PathBuf,

    /// Committer name; the original author is used when unset.
    #[serde(default)]
    pub committer_name: Option<String>,

    /// Committer email; the original author is used when unset.
    #[serde(default)]
    pub committer_email: Option<String>,
}

fn default_subtree() -> PathBuf {
    PathBuf::from("src")
}

// ---------------------------------------------------------------------------
// Remapper
// ---------------------------------------------------------------------------

/// External remapper invocation.
///
/// `args` may contain the placeholders `{upstream}` (upstream working copy)
/// and `{output}` (remapper output directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemapperConfig {
    /// Program to execute.
    pub program: String,

    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,

    /// Directory the remapper runs in.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Directory where the remapper leaves its transformed tree. The
    /// configured output subtree is copied from here.
    pub output_dir: PathBuf,

    /// Remove `<output_dir>/<subtree>` before each invocation so a failed
    /// run cannot leak partial output into the next commit.
    #[serde(default = "default_true")]
    pub clean_output: bool,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// How provenance trailers are written and recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    /// Trailer key, written as `<key>: <commit_url><id>`.
    #[serde(default = "default_trailer_key")]
    pub trailer_key: String,

    /// Prose prefix used by older mirrors, recognized but never written.
    #[serde(default = "default_legacy_prefix")]
    pub legacy_prefix: Option<String>,
}

fn default_trailer_key() -> String {
    "Remapped-From".into()
}

fn default_legacy_prefix() -> Option<String> {
    Some("Remapped by Srg2Source from ".into())
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            trailer_key: default_trailer_key(),
            legacy_prefix: default_legacy_prefix(),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Preparation toggles and replay limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Delete the upstream working copy and clone it again.
    #[serde(default = "default_true")]
    pub clone_fresh: bool,

    /// Pull `upstream.remote`/`upstream.branch` before replaying.
    #[serde(default = "default_true")]
    pub pull_latest: bool,

    /// Reset and check out `upstream.branch` before reading the log.
    #[serde(default = "default_true")]
    pub checkout_branch_first: bool,

    /// Replay at most this many commits per run. 0 = no limit.
    #[serde(default)]
    pub max_commits: usize,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            clone_fresh: true,
            pull_latest: true,
            checkout_branch_first: true,
            max_commits: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl MirrorConfig {
    /// Load a [`MirrorConfig`] from a TOML file.
    ///
    /// Relative paths are resolved against the directory holding the file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config: MirrorConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Anchor every relative filesystem path at `base`.
    ///
    /// `output.subtree` and `upstream.scratch_paths` stay relative: they name
    /// locations inside a repository, not on the host.
    pub fn resolve_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.upstream.path);
        anchor(&mut self.output.path);
        anchor(&mut self.remapper.working_dir);
        anchor(&mut self.remapper.output_dir);
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("upstream.commit_url", &self.upstream.commit_url)?;
        require_non_empty(
            "upstream.default_start_commit",
            &self.upstream.default_start_commit,
        )?;
        if self.upstream.path.as_os_str().is_empty() {
            return Err(invalid("upstream.path", "must not be empty"));
        }
        if self.output.path.as_os_str().is_empty() {
            return Err(invalid("output.path", "must not be empty"));
        }
        require_non_empty("remapper.program", &self.remapper.program)?;

        if self.options.clone_fresh
            && self.upstream.clone_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(invalid(
                "upstream.clone_url",
                "required when options.clone_fresh is enabled",
            ));
        }
        if self.options.pull_latest {
            require_non_empty("upstream.remote", &self.upstream.remote)?;
        }
        if self.options.pull_latest || self.options.checkout_branch_first {
            require_non_empty("upstream.branch", &self.upstream.branch)?;
        }

        require_repo_relative("output.subtree", &self.output.subtree)?;
        for scratch in &self.upstream.scratch_paths {
            require_repo_relative("upstream.scratch_paths", scratch)?;
        }

        let key = &self.provenance.trailer_key;
        require_non_empty("provenance.trailer_key", key)?;
        if key.contains(':') || key.chars().any(char::is_whitespace) {
            return Err(invalid(
                "provenance.trailer_key",
                "must not contain ':' or whitespace",
            ));
        }
        if matches!(self.provenance.legacy_prefix.as_deref(), Some("")) {
            return Err(invalid(
                "provenance.legacy_prefix",
                "must be omitted rather than empty",
            ));
        }

        Ok(())
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# remapmirror configuration
# Relative paths are resolved against the directory holding this file.

[mirror]
log_level = "info"

[upstream]
clone_url = "https://github.com/Bukkit/CraftBukkit"
path = "CraftBukkit"
remote = "origin"
branch = "master"
commit_url = "https://github.com/Bukkit/CraftBukkit/commit/"
default_start_commit = "27f73b62998ef7ba6b951a5cc7acbb95a1a17bed"
scratch_paths = ["src"]

[output]
path = "/tmp/MCPBukkit"
subtree = "src"
# committer_name = "Remap Bot"
# committer_email = "remap@example.com"

[remapper]
program = "python"
args = ["remap-craftbukkit.py", "--cb-dir", "{upstream}", "--fml-dir", "fml", "--skip-output-archive"]
working_dir = "."
output_dir = "CraftBukkit"
clean_output = true

[provenance]
trailer_key = "Remapped-From"
legacy_prefix = "Remapped by Srg2Source from "

[options]
clone_fresh = true
pull_latest = true
checkout_branch_first = true
max_commits = 0   # 0 = no limit
"#
    }
}

fn invalid(field: &str, detail: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        detail: detail.into(),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

/// A path inside a repository: non-empty, relative, no `..`.
fn require_repo_relative(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    let ok = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)));
    if !ok {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: format!(
                "'{}' must be a relative path inside the repository",
                path.display()
            ),
        });
    }
    Ok(())
}
