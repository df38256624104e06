//! Playback candidate extraction from a detail record

use serde_json::Value;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::models::{PayloadFormat, SourceTag, StreamCandidate};
use crate::normalize::{field_text, items};

/// Separator between play sources in MacCMS `vod_play_from` / `vod_play_url`
const SOURCE_SEPARATOR: &str = "$$$";
const EPISODE_SEPARATOR: char = '#';
const FIELD_SEPARATOR: char = '$';

/// Where a strategy looks for URIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Flag-keyed play sources (`dl.dd[@flag]` in XML, `vod_play_from` in JSON)
    MultiSource,
    /// A single field, walked by path
    ///
    /// With `play_list` the text uses the `name$uri#name$uri` grammar,
    /// otherwise the whole text is one URI.
    Field {
        path: &'static [&'static str],
        play_list: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateStrategy {
    pub name: &'static str,
    pub source: CandidateSource,
}

const fn field(
    name: &'static str,
    path: &'static [&'static str],
    play_list: bool,
) -> CandidateStrategy {
    CandidateStrategy {
        name,
        source: CandidateSource::Field { path, play_list },
    }
}

/// Extraction strategies in priority order; the first non-empty result wins
pub const CANDIDATE_STRATEGIES: &[CandidateStrategy] = &[
    CandidateStrategy {
        name: "multi-source",
        source: CandidateSource::MultiSource,
    },
    field("url", &["url"], false),
    field("url_m3u8", &["url_m3u8"], false),
    field("playurl", &["playurl"], false),
    field("vod_play_url", &["vod_play_url"], true),
    field("player.src", &["player", "src"], false),
];

/// One flag-keyed play source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaySource {
    pub flag: String,
    pub body: String,
}

/// Ordered, de-duplicated playable URIs of a detail item
pub fn extract_candidates(
    item: &Value,
    format: PayloadFormat,
    source_tag: Option<&SourceTag>,
    config: &ResolverConfig,
) -> Vec<StreamCandidate> {
    for strategy in CANDIDATE_STRATEGIES {
        let candidates = match strategy.source {
            CandidateSource::MultiSource => {
                from_play_sources(&play_sources(item, format), source_tag, config)
            }
            CandidateSource::Field { path, play_list } => match field_at(item, path) {
                Some(text) if play_list => normalize_all(parse_play_list(&text)),
                Some(text) => normalize_all([text]),
                None => Vec::new(),
            },
        };

        if !candidates.is_empty() {
            debug!(
                strategy = strategy.name,
                count = candidates.len(),
                "Extracted stream candidates"
            );
            return candidates;
        }
    }

    debug!("No stream candidates found in detail record");
    Vec::new()
}

/// Pick the play sources to use: the tag's own sources, else every accepted flag
fn from_play_sources(
    sources: &[PlaySource],
    source_tag: Option<&SourceTag>,
    config: &ResolverConfig,
) -> Vec<StreamCandidate> {
    if let Some(tag) = source_tag {
        let tagged = normalize_all(
            sources
                .iter()
                .filter(|s| s.flag == tag.as_str())
                .flat_map(|s| parse_play_list(&s.body)),
        );
        if !tagged.is_empty() {
            return tagged;
        }
    }

    normalize_all(
        sources
            .iter()
            .filter(|s| config.accepts_flag(&s.flag))
            .flat_map(|s| parse_play_list(&s.body)),
    )
}

/// Flag-keyed play sources of an item, in document order
pub fn play_sources(item: &Value, format: PayloadFormat) -> Vec<PlaySource> {
    match format {
        PayloadFormat::Xml => item
            .get("dl")
            .map(items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|dl| dl.get("dd"))
            .flat_map(items)
            .filter_map(|dd| {
                Some(PlaySource {
                    flag: field_text(dd, "flag")?,
                    body: field_text(dd, "_text")?,
                })
            })
            .collect(),
        PayloadFormat::Json => {
            let from = field_text(item, "vod_play_from");
            let urls = field_text(item, "vod_play_url");
            let (Some(from), Some(urls)) = (from, urls) else {
                return Vec::new();
            };
            from.split(SOURCE_SEPARATOR)
                .zip(urls.split(SOURCE_SEPARATOR))
                .map(|(flag, body)| PlaySource {
                    flag: flag.trim().to_string(),
                    body: body.to_string(),
                })
                .collect()
        }
    }
}

fn field_at(item: &Value, path: &[&str]) -> Option<String> {
    let (last, parents) = path.split_last()?;
    let parent = parents.iter().try_fold(item, |node, key| match node.get(*key)? {
        Value::Array(values) => values.first(),
        other => Some(other),
    })?;
    field_text(parent, last)
}

/// Split play-list text (`name$uri#name$uri`, sources joined by `$$$`) into raw URIs
///
/// Each `#` segment contributes its last `$` field; a segment without `$`
/// is taken whole.
pub fn parse_play_list(text: &str) -> Vec<String> {
    text.split(SOURCE_SEPARATOR)
        .flat_map(|source| source.split(EPISODE_SEPARATOR))
        .filter_map(|segment| segment.rsplit(FIELD_SEPARATOR).next())
        .map(|uri| uri.trim().to_string())
        .filter(|uri| !uri.is_empty())
        .collect()
}

/// Normalize raw URIs, dropping invalid ones and keeping first occurrences
pub fn normalize_all<I, S>(raw: I) -> Vec<StreamCandidate>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<StreamCandidate> = Vec::new();
    for candidate in raw.into_iter().filter_map(|r| StreamCandidate::normalize(r.as_ref())) {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
