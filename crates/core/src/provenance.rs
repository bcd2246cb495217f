//! Provenance trailers linking output commits to their upstream origin.
//!
//! Every output commit ends with a trailer block holding exactly one line
//!
//! ```text
//! Remapped-From: https://github.com/owner/repo/commit/<upstream id>
//! ```
//!
//! The key and the browse URL are matched literally; the id runs to the end of
//! the line. The output history is the only checkpoint the replay keeps, so
//! this line is what lets a later run pick up where the previous one stopped.

use crate::config::MirrorConfig;

/// Encodes and decodes provenance trailers.
#[derive(Debug, Clone)]
pub struct ProvenanceCodec {
    key: String,
    commit_url: String,
    legacy_prefix: Option<String>,
}

impl ProvenanceCodec {
    pub fn new(
        key: impl Into<String>,
        commit_url: impl Into<String>,
        legacy_prefix: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            commit_url: commit_url.into(),
            legacy_prefix,
        }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(
            config.provenance.trailer_key.clone(),
            config.upstream.commit_url.clone(),
            config.provenance.legacy_prefix.clone(),
        )
    }

    /// The literal text preceding the id: `<key>: <commit_url>`.
    pub fn prefix(&self) -> String {
        format!("{}: {}", self.key, self.commit_url)
    }

    /// Append the trailer for `source_id` to `message`.
    ///
    /// Existing trailer lines (ours or legacy) are dropped first so the result
    /// carries exactly one, as its last line.
    pub fn encode(&self, message: &str, source_id: &str) -> String {
        let kept: Vec<&str> = message
            .lines()
            .filter(|line| !self.is_provenance_line(line))
            .collect();
        let body = kept.join("\n");
        let body = body.trim_end();

        if body.is_empty() {
            format!("{}{}\n", self.prefix(), source_id)
        } else {
            format!("{}\n\n{}{}\n", body, self.prefix(), source_id)
        }
    }

    /// Recover the upstream id from an output commit message.
    ///
    /// Looks at the trailing paragraph first; the last matching line wins. If
    /// no structured trailer exists, falls back to the legacy prose prefix
    /// anywhere in the message.
    pub fn decode(&self, message: &str) -> Option<String> {
        trailer_block(message)
            .iter()
            .rev()
            .find_map(|line| self.parse_trailer_line(line))
            .or_else(|| self.decode_legacy(message))
    }

    fn parse_trailer_line(&self, line: &str) -> Option<String> {
        let value = line
            .strip_prefix(self.key.as_str())?
            .strip_prefix(':')?
            .trim_start();
        let id = value.strip_prefix(self.commit_url.as_str())?.trim_end();
        valid_id(id).then(|| id.to_string())
    }

    fn decode_legacy(&self, message: &str) -> Option<String> {
        let prefix = self.legacy_prefix.as_deref()?;
        let marker = format!("{}{}", prefix, self.commit_url);
        let start = message.rfind(&marker)? + marker.len();
        let rest = &message[start..];
        let id = rest.split('\n').next().unwrap_or("").trim_end();
        valid_id(id).then(|| id.to_string())
    }

    fn is_provenance_line(&self, line: &str) -> bool {
        if self.parse_trailer_line(line).is_some() {
            return true;
        }
        match &self.legacy_prefix {
            Some(prefix) => line.starts_with(&format!("{}{}", prefix, self.commit_url)),
            None => false,
        }
    }
}

/// A commit id as `git log` prints it: non-empty hexadecimal.
fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Lines of the final paragraph, ignoring trailing blank lines.
fn trailer_block(message: &str) -> Vec<&str> {
    let lines: Vec<&str> = message.trim_end().lines().collect();
    let start = lines
        .iter()
        .rposition(|line| line.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    lines[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://github.com/Bukkit/CraftBukkit/commit/";

    fn codec() -> ProvenanceCodec {
        ProvenanceCodec::new(
            "Remapped-From",
            URL,
            Some("Remapped by Srg2Source from ".into()),
        )
    }

    #[test]
    fn test_encode_appends_single_trailer() {
        let msg = codec().encode("Fix the thing\n\nLonger body.\n", "abc123");
        assert_eq!(
            msg,
            format!("Fix the thing\n\nLonger body.\n\nRemapped-From: {URL}abc123\n")
        );
    }

    #[test]
    fn test_round_trip() {
        let c = codec();
        for message in ["", "one line", "subject\n\nbody\nmore", "trailing\n\n\n"] {
            let encoded = c.encode(message, "27f73b62998ef7ba6b951a5cc7acbb95a1a17bed");
            assert_eq!(
                c.decode(&encoded).as_deref(),
                Some("27f73b62998ef7ba6b951a5cc7acbb95a1a17bed"),
                "message {message:?}"
            );
            assert!(encoded.trim_end().ends_with("27f73b62998ef7ba6b951a5cc7acbb95a1a17bed"));
        }
    }

    #[test]
    fn test_encode_replaces_existing_trailer() {
        let c = codec();
        let once = c.encode("Subject", "0123abc");
        let twice = c.encode(&once, "4567def");
        assert_eq!(twice.matches("Remapped-From:").count(), 1);
        assert_eq!(c.decode(&twice).as_deref(), Some("4567def"));
    }

    #[test]
    fn test_decode_absent() {
        assert_eq!(codec().decode("Manual commit\n\nNo provenance here."), None);
        assert_eq!(codec().decode(""), None);
    }

    #[test]
    fn test_decode_ignores_similar_text() {
        let c = codec();
        // Other URL, other key, and the key in running prose.
        let msg = format!(
            "Subject\n\nRemapped-From: https://example.com/commit/abc\n\
             Remapped-Fromage: {URL}abc\nsee Remapped-From: {URL}abc"
        );
        assert_eq!(c.decode(&msg), None);
    }

    #[test]
    fn test_decode_only_reads_final_paragraph() {
        let c = codec();
        let msg = format!("Subject\n\nRemapped-From: {URL}abc\n\nSigned-off-by: x <x@y>");
        assert_eq!(c.decode(&msg), None);
    }

    #[test]
    fn test_decode_rejects_empty_spaced_or_non_hex_id() {
        let c = codec();
        assert_eq!(c.decode(&format!("s\n\nRemapped-From: {URL}")), None);
        assert_eq!(c.decode(&format!("s\n\nRemapped-From: {URL}abc def")), None);
        assert_eq!(c.decode(&format!("s\n\nRemapped-From: {URL}master")), None);
        assert_eq!(c.decode(&format!("s\n\nRemapped-From: {URL}abc1234.")), None);
    }

    #[test]
    fn test_decode_tolerates_crlf() {
        let c = codec();
        let msg = format!("Subject\r\n\r\nRemapped-From: {URL}abc\r\n");
        assert_eq!(c.decode(&msg).as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_legacy_prose() {
        let c = codec();
        let msg = format!("Update pom\n\nRemapped by Srg2Source from {URL}deadbeef\n");
        assert_eq!(c.decode(&msg).as_deref(), Some("deadbeef"));

        let without_legacy = ProvenanceCodec::new("Remapped-From", URL, None);
        assert_eq!(without_legacy.decode(&msg), None);
    }

    #[test]
    fn test_encode_drops_legacy_line() {
        let c = codec();
        let legacy = format!("Update pom\n\nRemapped by Srg2Source from {URL}deadbeef");
        let encoded = c.encode(&legacy, "cafe");
        assert!(!encoded.contains("Srg2Source"));
        assert_eq!(c.decode(&encoded).as_deref(), Some("cafe"));
    }
}
