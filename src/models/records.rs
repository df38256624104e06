//! Canonical records produced by the normalizer and the playlist resolver

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// Title used when an item carries none of the known title fields
pub const UNKNOWN_TITLE: &str = "unknown title";

/// One search hit, in provider result order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Provider item id; numeric JSON ids are rendered in decimal
    pub id: Option<String>,
    pub title: String,
}

/// Normalized answer to a search query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub records: Vec<SearchRecord>,
    pub result_count: usize,
}

impl SearchResults {
    pub fn new(records: Vec<SearchRecord>) -> Self {
        let result_count = records.len();
        Self {
            records,
            result_count,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn first(&self) -> Option<&SearchRecord> {
        self.records.first()
    }
}

/// Provider-specific player identifier selecting one of several play sources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTag(String);

fn from_segment_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/from/([^/?#]+)").ok())
        .as_ref()
}

impl SourceTag {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self(tag.into())
    }

    /// Parse the `/from/<tag>` path segment out of a URI
    pub fn from_uri(uri: &str) -> Option<Self> {
        from_segment_regex()?
            .captures(uri)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|tag| !tag.is_empty())
            .map(|tag| Self(tag.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The playback descriptor of a single item
///
/// `item` is the canonical tree of the first matching item; XML payloads are
/// converted into the same tree form as JSON (see [`crate::normalize::xml`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub item: Value,
    pub source_tag: Option<SourceTag>,
}

/// A playable URI discovered in a detail record
///
/// Only constructible through [`StreamCandidate::normalize`], so a candidate
/// is always an absolute http(s) URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamCandidate(String);

impl StreamCandidate {
    /// Normalize raw text into a candidate
    ///
    /// Blank text is discarded, protocol-relative `//host/...` becomes
    /// `https://host/...`, and anything else not starting with `http` is
    /// rejected.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let absolute = if trimmed.starts_with("//") {
            format!("https:{trimmed}")
        } else {
            trimmed.to_string()
        };

        let lower = absolute.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(Self(absolute))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StreamCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StreamCandidate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_parsing() {
        assert_eq!(
            SourceTag::from_uri("http://x.com/api.php/provide/vod/from/subm3u8/")
                .map(|t| t.to_string()),
            Some("subm3u8".to_string())
        );
        assert_eq!(
            SourceTag::from_uri("http://x.com/api.php/FROM/wjm3u8?ac=list").map(|t| t.to_string()),
            Some("wjm3u8".to_string())
        );
        assert!(SourceTag::from_uri("http://x.com/api.php/provide/vod").is_none());
        assert!(SourceTag::from_uri("http://x.com/from/").is_none());
    }

    #[test]
    fn test_candidate_normalization() {
        assert_eq!(
            StreamCandidate::normalize("  https://cdn.example.com/a/index.m3u8 ")
                .map(|c| c.into_string()),
            Some("https://cdn.example.com/a/index.m3u8".to_string())
        );
        assert_eq!(
            StreamCandidate::normalize("//cdn.example.com/b.mp4").map(|c| c.into_string()),
            Some("https://cdn.example.com/b.mp4".to_string())
        );
        assert!(StreamCandidate::normalize("").is_none());
        assert!(StreamCandidate::normalize("   ").is_none());
        assert!(StreamCandidate::normalize("ftp://cdn.example.com/c.ts").is_none());
        assert!(StreamCandidate::normalize("第1集").is_none());
        // Bare "http" prefix without a scheme separator is not a URI
        assert!(StreamCandidate::normalize("httpfoo").is_none());
    }

    #[test]
    fn test_search_results_count_tracks_records() {
        let results = SearchResults::new(vec![
            SearchRecord {
                id: Some("1".to_string()),
                title: "A".to_string(),
            },
            SearchRecord {
                id: None,
                title: UNKNOWN_TITLE.to_string(),
            },
        ]);
        assert_eq!(results.result_count, 2);
        assert_eq!(results.first().and_then(|r| r.id.as_deref()), Some("1"));
        assert_eq!(SearchResults::empty().result_count, 0);
    }
}
