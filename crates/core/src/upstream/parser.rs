//! Parsers for `git log` / `git show` output.

use tracing::debug;

use crate::errors::UpstreamError;
use crate::models::{CommitDetail, CommitRecord};

/// Line emitted after the message body by [`DETAIL_FORMAT`].
pub const DETAIL_SENTINEL: &str = "---END---";

/// `git show` format: author, RFC 2822 author date, raw body, sentinel.
pub const DETAIL_FORMAT: &str = "--format=format:%an <%ae>%n%aD%n%B%n---END---";

/// Parse `git log --format=oneline` output (`<id> <subject>` per line,
/// newest first). Order is preserved.
pub fn parse_oneline_log(output: &str) -> Result<Vec<CommitRecord>, UpstreamError> {
    let mut records = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (id, short_message) = match line.split_once(' ') {
            Some((id, rest)) => (id, rest),
            None => (line, ""),
        };
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UpstreamError::ParseError(format!(
                "unexpected log line: {line:?}"
            )));
        }
        records.push(CommitRecord {
            id: id.to_string(),
            short_message: short_message.to_string(),
        });
    }
    debug!(count = records.len(), "parsed oneline log");
    Ok(records)
}

/// Parse the output of `git show --no-patch` with [`DETAIL_FORMAT`].
///
/// The body is everything between the date line and the last sentinel line,
/// so a body that happens to contain the sentinel text is still captured.
pub fn parse_commit_detail(output: &str) -> Result<CommitDetail, UpstreamError> {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() < 3 {
        return Err(UpstreamError::ParseError(format!(
            "commit detail too short ({} lines)",
            lines.len()
        )));
    }
    let end = lines
        .iter()
        .rposition(|line| *line == DETAIL_SENTINEL)
        .filter(|&i| i >= 2)
        .ok_or_else(|| {
            UpstreamError::ParseError("commit detail missing end sentinel".into())
        })?;

    let mut body: Vec<&str> = lines[2..end].to_vec();
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }

    Ok(CommitDetail {
        author: lines[0].to_string(),
        date: lines[1].to_string(),
        message: body.join("\n"),
    })
}
