//! Replay driver.
//!
//! One pass over the pending queue, strictly sequential:
//!
//! 1. reset the upstream working copy and check out the commit,
//! 2. read its author, date and message,
//! 3. run the remapper,
//! 4. replace the output subtree with the remapper's output,
//! 5. commit with the original authorship and a provenance trailer.
//!
//! Progress lives only in the output repository's history. A failed commit
//! aborts the pass without advancing that history, so re-running resumes at
//! the same commit. An interruption during step 4 can leave an uncommitted
//! output tree behind; `status` reports it and it is not repaired
//! automatically.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::MirrorConfig;
use crate::errors::{ReplayError, UpstreamError};
use crate::git::{Committer, GitClient};
use crate::models::{CommitRecord, ReplayStats, ReplayedCommit, ResumePoint};
use crate::provenance::ProvenanceCodec;
use crate::range;
use crate::remapper::Remapper;
use crate::resume;
use crate::tree::replace_tree;
use crate::upstream::{SourceLog, UpstreamClient};
use crate::workspace::CleanCheckout;

/// Drives the replay of upstream history into the output repository.
pub struct Replayer {
    config: MirrorConfig,
    codec: ProvenanceCodec,
    remapper: Remapper,
    committer: Committer,
}

/// Read-only view of where the next run would start.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub resume_point: ResumePoint,
    /// `None` when the upstream working copy is missing or the resume point
    /// cannot be found in it.
    pub pending: Option<usize>,
    pub pending_error: Option<String>,
    /// Uncommitted paths in the output repository, e.g. from an interrupted
    /// tree copy.
    pub dirty_paths: Vec<String>,
}

impl Replayer {
    pub fn new(config: MirrorConfig) -> Self {
        let codec = ProvenanceCodec::from_config(&config);
        let remapper = Remapper::from_config(&config);
        let committer = Committer {
            name: config.output.committer_name.clone(),
            email: config.output.committer_email.clone(),
        };
        Self {
            config,
            codec,
            remapper,
            committer,
        }
    }

    /// Prepare the upstream working copy, then replay everything pending.
    pub fn run(&self, shutdown: &AtomicBool) -> Result<ReplayStats, ReplayError> {
        let upstream = self.prepare_upstream()?;
        self.replay(&upstream, shutdown)
    }

    /// Clone, check out the branch and pull, according to `options`.
    #[instrument(skip(self))]
    pub fn prepare_upstream(&self) -> Result<UpstreamClient, ReplayError> {
        let upstream_cfg = &self.config.upstream;
        let options = &self.config.options;

        let client = match (&upstream_cfg.clone_url, options.clone_fresh) {
            (Some(url), true) => UpstreamClient::clone_fresh(url, &upstream_cfg.path)?,
            _ => UpstreamClient::open(&upstream_cfg.path)?,
        }
        .tracking(upstream_cfg.branch.clone());

        // The branch is checked out before pulling so a detached HEAD left by
        // an earlier run is not what receives the pull.
        if options.checkout_branch_first {
            client.reset_clean(&upstream_cfg.scratch_paths)?;
            client.checkout(&upstream_cfg.branch)?;
        }
        if options.pull_latest {
            client.pull(&upstream_cfg.remote, &upstream_cfg.branch)?;
        }
        Ok(client)
    }

    /// Resolve the resume point, enumerate and replay pending commits.
    ///
    /// `shutdown` is checked between commits only; the commit in flight
    /// always completes or fails as a whole.
    pub fn replay(
        &self,
        upstream: &UpstreamClient,
        shutdown: &AtomicBool,
    ) -> Result<ReplayStats, ReplayError> {
        let (output, resume_point) = resume::resolve(
            &self.config.output.path,
            &self.config.upstream.default_start_commit,
            &self.codec,
        )?;
        let queue = range::enumerate(upstream, &resume_point, self.config.options.max_commits)?;

        let mut stats = ReplayStats {
            resumed_from: Some(resume_point.commit.clone()),
            pending: queue.len(),
            deferred: queue.deferred(),
            ..Default::default()
        };
        if queue.is_empty() {
            info!("output repository is up to date");
            return Ok(stats);
        }

        let total = queue.len();
        for (index, record) in queue.into_iter().enumerate() {
            if shutdown.load(Ordering::SeqCst) {
                warn!(remaining = total - index, "shutdown requested, stopping between commits");
                stats.interrupted = true;
                break;
            }
            info!(
                progress = %format!("{}/{}", index + 1, total),
                id = %record.id,
                message = %record.short_message,
                "replaying commit"
            );
            let replayed = self.replay_one(upstream, &output, &record)?;
            stats.replayed.push(replayed);
        }

        info!(replayed = stats.replayed_count(), "replay pass complete");
        Ok(stats)
    }

    fn replay_one(
        &self,
        upstream: &UpstreamClient,
        output: &GitClient,
        record: &CommitRecord,
    ) -> Result<ReplayedCommit, ReplayError> {
        let subtree = self.config.output.subtree.as_path();

        // 1. Materialize upstream state.
        let checkout = CleanCheckout::acquire(
            upstream,
            &self.config.upstream.scratch_paths,
            &record.id,
        )?;

        // 2. Metadata.
        let detail = upstream.commit_detail(&record.id)?;
        let author = detail.author_stamp()?;

        // 3. Transform.
        let produced = self.remapper.run(upstream.path(), subtree)?;

        // 4. Output tree.
        let target = output.repo_path().join(subtree);
        info!(from = %produced.display(), to = %target.display(), "copying remapped tree");
        replace_tree(&produced, &target).map_err(|source| ReplayError::TreeCopyFailed {
            path: target.display().to_string(),
            source,
        })?;

        // 5. Commit.
        let message = self.codec.encode(&detail.message, &record.id);
        let oid = output.commit_subtree(subtree, &message, &author, &self.committer)?;
        checkout.release();

        let output_sha = oid.to_string();
        info!(
            id = %record.id,
            sha = %output_sha,
            author = %detail.author,
            "committed remapped commit"
        );
        Ok(ReplayedCommit {
            source_id: record.id.clone(),
            output_sha,
            short_message: record.short_message.clone(),
        })
    }

    /// Where the next run would start, without touching either repository.
    pub fn status(&self) -> Result<StatusReport, ReplayError> {
        let output_path = &self.config.output.path;
        let resume_point = resume::inspect(
            output_path,
            &self.config.upstream.default_start_commit,
            &self.codec,
        )?;

        let (pending, pending_error) = match self.count_pending(&resume_point) {
            Ok(n) => (Some(n), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let dirty_paths = if output_path.join(".git").exists() {
            GitClient::new(output_path)?.dirty_paths()?
        } else {
            Vec::new()
        };

        Ok(StatusReport {
            resume_point,
            pending,
            pending_error,
            dirty_paths,
        })
    }

    fn count_pending(&self, resume_point: &ResumePoint) -> Result<usize, UpstreamError> {
        let upstream = UpstreamClient::open(&self.config.upstream.path)?
            .tracking(self.config.upstream.branch.clone());
        Ok(upstream.list_commits_since(&resume_point.commit)?.len())
    }

    pub fn output_path(&self) -> &Path {
        &self.config.output.path
    }
}
