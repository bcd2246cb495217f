//! Resume-point resolution from the output repository's own history.

use std::path::Path;

use tracing::{info, warn};

use crate::errors::GitError;
use crate::git::GitClient;
use crate::models::{ResumePoint, ResumeSource};
use crate::provenance::ProvenanceCodec;

/// Open (creating if necessary) the output repository and work out where
/// replay continues.
///
/// A missing location or missing repository is initialized and resumes from
/// `default_id`, as does an empty history. A HEAD commit without a
/// recognizable trailer is logged and also resumes from `default_id`: redoing
/// work is safe, refusing to start is not useful.
pub fn resolve(
    output_path: &Path,
    default_id: &str,
    codec: &ProvenanceCodec,
) -> Result<(GitClient, ResumePoint), GitError> {
    if !output_path.join(".git").exists() {
        if output_path.exists() {
            info!(path = %output_path.display(), "no git repository found, initializing");
        } else {
            info!(path = %output_path.display(), "creating output repository");
        }
        let client = GitClient::init(output_path)?;
        let point = default_point(default_id, ResumeSource::FreshRepository);
        return Ok((client, point));
    }

    let client = GitClient::new(output_path)?;
    let point = from_head(&client, default_id, codec)?;
    Ok((client, point))
}

/// Same decision as [`resolve`] without creating anything on disk.
pub fn inspect(
    output_path: &Path,
    default_id: &str,
    codec: &ProvenanceCodec,
) -> Result<ResumePoint, GitError> {
    if !output_path.join(".git").exists() {
        return Ok(default_point(default_id, ResumeSource::FreshRepository));
    }
    let client = GitClient::new(output_path)?;
    from_head(&client, default_id, codec)
}

fn from_head(
    client: &GitClient,
    default_id: &str,
    codec: &ProvenanceCodec,
) -> Result<ResumePoint, GitError> {
    let Some(message) = client.head_message()? else {
        return Ok(default_point(default_id, ResumeSource::EmptyHistory));
    };

    match codec.decode(&message) {
        Some(commit) => {
            info!(commit = %commit, "resuming after last remapped commit");
            Ok(ResumePoint {
                commit,
                source: ResumeSource::Trailer,
            })
        }
        None => {
            warn!(
                message = %message.trim_end(),
                expected = %codec.prefix(),
                "unrecognized commit message on output HEAD"
            );
            Ok(default_point(default_id, ResumeSource::UnrecognizedTrailer))
        }
    }
}

fn default_point(default_id: &str, source: ResumeSource) -> ResumePoint {
    info!(commit = default_id, %source, "starting at default commit");
    ResumePoint {
        commit: default_id.to_string(),
        source,
    }
}
