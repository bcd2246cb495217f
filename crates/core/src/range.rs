//! Commit range enumeration: which upstream commits this run replays.

use tracing::info;

use crate::errors::UpstreamError;
use crate::models::{CommitRecord, ResumePoint};
use crate::upstream::SourceLog;

/// Upstream commits strictly after the resume point, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingQueue {
    commits: Vec<CommitRecord>,
    /// Commits left for a later run because of the per-run limit.
    deferred: usize,
}

impl PendingQueue {
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn deferred(&self) -> usize {
        self.deferred
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommitRecord> {
        self.commits.iter()
    }
}

impl IntoIterator for PendingQueue {
    type Item = CommitRecord;
    type IntoIter = std::vec::IntoIter<CommitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.commits.into_iter()
    }
}

/// Build the queue for one run.
///
/// `limit` keeps only the oldest `limit` commits (0 = everything). Upstream
/// order is never changed; the remainder is found again by the next run once
/// the resume point has advanced.
pub fn enumerate<L: SourceLog + ?Sized>(
    log: &L,
    resume: &ResumePoint,
    limit: usize,
) -> Result<PendingQueue, UpstreamError> {
    let mut commits = log.list_commits_since(&resume.commit)?;
    let mut deferred = 0;
    if limit > 0 && commits.len() > limit {
        deferred = commits.len() - limit;
        commits.truncate(limit);
    }
    info!(
        resume = %resume.commit,
        pending = commits.len(),
        deferred,
        "enumerated commits to replay"
    );
    Ok(PendingQueue { commits, deferred })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitDetail, ResumeSource};
    use crate::upstream::log::commits_after;

    /// In-memory upstream history, stored oldest first.
    struct FakeLog(Vec<&'static str>);

    impl SourceLog for FakeLog {
        fn list_commits_since(&self, start_id: &str) -> Result<Vec<CommitRecord>, UpstreamError> {
            let newest_first = self.0.iter().rev().map(|id| CommitRecord {
                id: id.to_string(),
                short_message: format!("msg {id}"),
            });
            commits_after(newest_first, start_id)
        }

        fn commit_detail(&self, _id: &str) -> Result<CommitDetail, UpstreamError> {
            unreachable!("enumeration never fetches details")
        }
    }

    fn at(commit: &str) -> ResumePoint {
        ResumePoint {
            commit: commit.into(),
            source: ResumeSource::Trailer,
        }
    }

    fn ids(queue: &PendingQueue) -> Vec<&str> {
        queue.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_strictly_after_resume_point_in_order() {
        let log = FakeLog(vec!["a", "b", "c", "d", "e"]);
        let queue = enumerate(&log, &at("b"), 0).unwrap();
        assert_eq!(ids(&queue), vec!["c", "d", "e"]);
        assert_eq!(queue.deferred(), 0);
    }

    #[test]
    fn test_up_to_date_yields_empty_queue() {
        let log = FakeLog(vec!["a", "b", "c"]);
        assert!(enumerate(&log, &at("c"), 0).unwrap().is_empty());
    }

    #[test]
    fn test_second_pass_after_replay_is_empty() {
        let log = FakeLog(vec!["a", "b", "c"]);
        let first = enumerate(&log, &at("a"), 0).unwrap();
        let last = first.commits().last().unwrap().id.clone();
        let second = enumerate(&log, &at(&last), 0).unwrap();
        assert_eq!(ids(&first), vec!["b", "c"]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_missing_anchor_is_fatal() {
        let log = FakeLog(vec!["a", "b", "c"]);
        let err = enumerate(&log, &at("rewritten"), 0).unwrap_err();
        assert!(matches!(err, UpstreamError::StartCommitNotFound { .. }));
    }

    #[test]
    fn test_limit_keeps_oldest() {
        let log = FakeLog(vec!["a", "b", "c", "d", "e"]);
        let queue = enumerate(&log, &at("a"), 2).unwrap();
        assert_eq!(ids(&queue), vec!["b", "c"]);
        assert_eq!(queue.deferred(), 2);
    }
}
