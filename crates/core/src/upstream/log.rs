//! Source log reader: the slice of upstream history still to be replayed.

use tracing::{debug, info};

use super::client::UpstreamClient;
use crate::errors::UpstreamError;
use crate::models::{CommitDetail, CommitRecord};

/// Read access to upstream history.
pub trait SourceLog {
    /// Commits strictly after `start_id` on the current branch, oldest first.
    ///
    /// Fails with [`UpstreamError::StartCommitNotFound`] when `start_id` is
    /// not reachable from HEAD.
    fn list_commits_since(&self, start_id: &str) -> Result<Vec<CommitRecord>, UpstreamError>;

    /// Author, date and full message of exactly one commit.
    fn commit_detail(&self, id: &str) -> Result<CommitDetail, UpstreamError>;
}

impl SourceLog for UpstreamClient {
    fn list_commits_since(&self, start_id: &str) -> Result<Vec<CommitRecord>, UpstreamError> {
        let newest_first = self.log_oneline()?;
        commits_after(newest_first, start_id)
    }

    fn commit_detail(&self, id: &str) -> Result<CommitDetail, UpstreamError> {
        self.show_detail(id)
    }
}

/// Collect newest-first records up to (not including) `start_id`, then
/// reverse into replay order.
pub fn commits_after<I>(newest_first: I, start_id: &str) -> Result<Vec<CommitRecord>, UpstreamError>
where
    I: IntoIterator<Item = CommitRecord>,
{
    let mut pending = Vec::new();
    for record in newest_first {
        if record.id == start_id {
            pending.reverse();
            info!(start = start_id, count = pending.len(), "found start commit");
            return Ok(pending);
        }
        debug!(id = %record.id, message = %record.short_message, "pending commit");
        pending.push(record);
    }
    Err(UpstreamError::StartCommitNotFound {
        start: start_id.to_string(),
    })
}
