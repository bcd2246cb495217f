//! Domain model types shared by the log reader, resolver and replay driver.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::errors::ReplayError;

// ---------------------------------------------------------------------------
// Upstream commits
// ---------------------------------------------------------------------------

/// One line of upstream history: commit id plus its subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub id: String,
    pub short_message: String,
}

/// Author metadata and full message of a single upstream commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDetail {
    /// `Name <email>`.
    pub author: String,
    /// RFC 2822 author date, e.g. `Tue, 1 Jan 2013 10:00:00 +0100`.
    pub date: String,
    /// Full message body.
    pub message: String,
}

/// A parsed author identity with its original timestamp and offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorStamp {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl CommitDetail {
    /// Split `author` and parse `date` so the output commit can carry the
    /// original attribution.
    pub fn author_stamp(&self) -> Result<AuthorStamp, ReplayError> {
        let (name, email) = parse_identity(&self.author)
            .ok_or_else(|| ReplayError::InvalidAuthor(self.author.clone()))?;
        let when = DateTime::parse_from_rfc2822(self.date.trim()).map_err(|e| {
            ReplayError::InvalidDate {
                date: self.date.clone(),
                detail: e.to_string(),
            }
        })?;
        Ok(AuthorStamp { name, email, when })
    }
}

/// Parse `Name <email>`. The name and the email may be empty; the brackets
/// around the email may not. Brackets inside the name are dropped.
fn parse_identity(raw: &str) -> Option<(String, String)> {
    let raw = raw.trim();
    let open = raw.rfind('<')?;
    let rest = &raw[open + 1..];
    let close = rest.find('>')?;
    if !rest[close + 1..].trim().is_empty() {
        return None;
    }
    Some((clean_ident(&raw[..open]), clean_ident(&rest[..close])))
}

/// Drop the characters a commit header cannot carry inside a name or email
/// (`<`, `>`, line breaks), collapse the gaps and trim.
pub(crate) fn clean_ident(raw: &str) -> String {
    raw.split(|c| matches!(c, '<' | '>' | '\n' | '\r'))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Resume point
// ---------------------------------------------------------------------------

/// Why a particular resume point was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSource {
    /// The output repository did not exist (or was not a repository).
    FreshRepository,
    /// The output repository has no commits yet.
    EmptyHistory,
    /// The latest output commit carries no recognizable trailer.
    UnrecognizedTrailer,
    /// Decoded from the latest output commit's trailer.
    Trailer,
}

impl std::fmt::Display for ResumeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FreshRepository => write!(f, "fresh_repository"),
            Self::EmptyHistory => write!(f, "empty_history"),
            Self::UnrecognizedTrailer => write!(f, "unrecognized_trailer"),
            Self::Trailer => write!(f, "trailer"),
        }
    }
}

/// The upstream commit after which replay continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumePoint {
    pub commit: String,
    pub source: ResumeSource,
}

// ---------------------------------------------------------------------------
// Replay outcome
// ---------------------------------------------------------------------------

/// One upstream commit that made it into the output repository.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayedCommit {
    pub source_id: String,
    pub output_sha: String,
    pub short_message: String,
}

/// Summary of a replay pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayStats {
    pub resumed_from: Option<String>,
    pub pending: usize,
    /// Commits held back by `options.max_commits` for a later run.
    pub deferred: usize,
    pub replayed: Vec<ReplayedCommit>,
    /// Set when a shutdown request stopped the pass between commits.
    pub interrupted: bool,
}

impl ReplayStats {
    pub fn replayed_count(&self) -> usize {
        self.replayed.len()
    }
}
