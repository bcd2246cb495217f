//! Output repository operations via `git2`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, Offset};
use git2::{Commit, ErrorCode, IndexAddOption, ObjectType, Oid, Repository, Status, StatusOptions};
use tracing::{debug, info, instrument};

use crate::errors::GitError;
use crate::models::{clean_ident, AuthorStamp};

/// High-level Git client wrapping the output `git2::Repository`.
pub struct GitClient {
    repo: Repository,
    repo_path: PathBuf,
}

/// Committer identity override; `None` fields fall back to the author.
#[derive(Debug, Clone, Default)]
pub struct Committer {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        debug!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
        })
    }

    /// Create `repo_path` if needed and initialize an empty repository there.
    #[instrument(skip(repo_path), fields(path = %repo_path.as_ref().display()))]
    pub fn init<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        std::fs::create_dir_all(path)?;
        let repo = Repository::init(path)?;
        info!("initialized empty output repository");
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Message of the HEAD commit, or `None` while HEAD is unborn.
    pub fn head_message(&self) -> Result<Option<String>, GitError> {
        Ok(self
            .head_commit()?
            .map(|commit| String::from_utf8_lossy(commit.message_bytes()).into_owned()))
    }

    /// The HEAD commit; `None` only for an unborn branch. Any other failure
    /// to read HEAD is an error.
    fn head_commit(&self) -> Result<Option<Commit<'_>>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stage everything under `subtree` (including deletions) and commit it
    /// on HEAD with the original author identity and date.
    ///
    /// The commit object is written directly so that identities git itself
    /// accepts (an empty email, brackets in a name) never block the replay.
    #[instrument(skip(self, message, author, committer), fields(subtree = %subtree.display()))]
    pub fn commit_subtree(
        &self,
        subtree: &Path,
        message: &str,
        author: &AuthorStamp,
        committer: &Committer,
    ) -> Result<Oid, GitError> {
        let spec = subtree.to_string_lossy().to_string();
        let mut index = self.repo.index()?;
        index.add_all([spec.as_str()].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all([spec.as_str()].iter(), None)?;
        index.write()?;
        let tree_oid = index.write_tree()?;

        let committer_name = committer.name.as_deref().unwrap_or(&author.name);
        let committer_email = committer.email.as_deref().unwrap_or(&author.email);
        let now: DateTime<FixedOffset> = Local::now().into();

        let parent = self.head_commit()?;
        let mut raw = format!("tree {}\n", tree_oid);
        if let Some(parent) = &parent {
            raw.push_str(&format!("parent {}\n", parent.id()));
        }
        raw.push_str(&format!(
            "author {}\n",
            ident_line(&author.name, &author.email, &author.when)
        ));
        raw.push_str(&format!(
            "committer {}\n",
            ident_line(committer_name, committer_email, &now)
        ));
        raw.push('\n');
        raw.push_str(message);

        let oid = self.repo.odb()?.write(ObjectType::Commit, raw.as_bytes())?;
        self.advance_head(oid, message)?;
        info!(sha = %oid, "created commit");
        Ok(oid)
    }

    /// Point the branch HEAD refers to (or a detached HEAD) at `oid`.
    fn advance_head(&self, oid: Oid, message: &str) -> Result<(), GitError> {
        let head = self.repo.find_reference("HEAD")?;
        match head.symbolic_target() {
            Some(branch) => {
                let subject = message.lines().next().unwrap_or("");
                self.repo
                    .reference(branch, oid, true, &format!("commit: {}", subject))?;
            }
            None => self.repo.set_head_detached(oid)?,
        }
        Ok(())
    }

    /// Paths with uncommitted changes (tracked or untracked).
    pub fn dirty_paths(&self) -> Result<Vec<String>, GitError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter(|entry| entry.status() != Status::CURRENT && !entry.status().is_ignored())
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect())
    }
}

/// `Name <email> <seconds> <+hhmm>` as stored in a commit header.
///
/// Angle brackets and line breaks are dropped from both parts. An empty name
/// falls back to the local part of the email, then to `unknown`; an empty
/// email is kept as `<>`.
fn ident_line(name: &str, email: &str, when: &DateTime<FixedOffset>) -> String {
    let email = clean_ident(email);
    let mut name = clean_ident(name);
    if name.is_empty() {
        name = email.split('@').next().unwrap_or("").to_string();
    }
    if name.is_empty() {
        name = "unknown".into();
    }

    let offset = when.offset().fix().local_minus_utc() / 60;
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    format!(
        "{} <{}> {} {}{:02}{:02}",
        name,
        email,
        when.timestamp(),
        sign,
        offset / 60,
        offset % 60
    )
}
