//! Domain models shared by the normalization, resolution and scoring stages

pub mod metrics;
pub mod records;

pub use metrics::*;
pub use records::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire format a provider answers its query API in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Json,
    Xml,
}

impl PayloadFormat {
    pub fn from_is_xml(is_xml: bool) -> Self {
        if is_xml { Self::Xml } else { Self::Json }
    }

    pub fn is_xml(&self) -> bool {
        matches!(self, Self::Xml)
    }

    /// Value sent in the `Accept` header for queries in this format
    pub fn accept_header(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which provider query a payload answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Search,
    Detail,
}

/// A provider collection API under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    /// Base query URI, e.g. `https://host/api.php/provide/vod`
    pub api: String,
    pub format: PayloadFormat,
}

impl Endpoint {
    pub fn new<N: Into<String>, A: Into<String>>(name: N, api: A, is_xml: bool) -> Self {
        Self {
            name: name.into(),
            api: api.into(),
            format: PayloadFormat::from_is_xml(is_xml),
        }
    }

    pub fn is_xml(&self) -> bool {
        self.format.is_xml()
    }

    /// Player identifier encoded in the base URI (`.../from/<tag>/...`), if any
    pub fn source_tag(&self) -> Option<SourceTag> {
        SourceTag::from_uri(&self.api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_format_from_flag() {
        assert_eq!(PayloadFormat::from_is_xml(true), PayloadFormat::Xml);
        assert_eq!(PayloadFormat::from_is_xml(false), PayloadFormat::Json);
        assert_eq!(PayloadFormat::Xml.accept_header(), "application/xml");
        assert_eq!(PayloadFormat::Json.accept_header(), "application/json");
    }

    #[test]
    fn test_endpoint_source_tag() {
        let tagged = Endpoint::new(
            "a",
            "https://api.example.com/api.php/provide/vod/from/lzm3u8/at/xml",
            true,
        );
        assert_eq!(tagged.source_tag().map(|t| t.to_string()), Some("lzm3u8".to_string()));

        let plain = Endpoint::new("b", "https://api.example.com/api.php/provide/vod", false);
        assert!(plain.source_tag().is_none());
    }
}
