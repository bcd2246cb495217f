//! Scoped clean checkout of the upstream working copy.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::errors::UpstreamError;
use crate::upstream::UpstreamClient;

/// A working copy reset and checked out at one commit.
///
/// Acquiring the guard discards every local change before the checkout, so a
/// previous failed transformation cannot leak into this commit's input. If the
/// guard is dropped without [`CleanCheckout::release`] (an error or panic
/// while the commit was in flight) the working copy is reset again.
pub struct CleanCheckout<'a> {
    client: &'a UpstreamClient,
    scratch_paths: &'a [PathBuf],
    commit: String,
    armed: bool,
}

impl<'a> CleanCheckout<'a> {
    pub fn acquire(
        client: &'a UpstreamClient,
        scratch_paths: &'a [PathBuf],
        commit: &str,
    ) -> Result<Self, UpstreamError> {
        client.reset_clean(scratch_paths)?;
        client.checkout(commit)?;
        debug!(commit, "clean checkout acquired");
        Ok(Self {
            client,
            scratch_paths,
            commit: commit.to_string(),
            armed: true,
        })
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// The commit was replayed; leave the working copy as it is.
    pub fn release(mut self) {
        self.armed = false;
    }
}

impl Drop for CleanCheckout<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!(commit = %self.commit, "resetting working copy after aborted replay");
        if let Err(e) = self.client.reset_clean(self.scratch_paths) {
            warn!(commit = %self.commit, error = %e, "failed to reset upstream working copy");
        }
    }
}
