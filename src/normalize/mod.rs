//! Response normalization
//!
//! Providers answer the same MacCMS-style query with a dozen different
//! envelopes. Every payload is first turned into one canonical
//! `serde_json::Value` tree (XML via [`xml::parse_xml_tree`]), then the
//! ordered shape table for its format is walked until a container is found.

pub mod xml;

use serde_json::Value;
use tracing::debug;

use crate::errors::{ProbeError, ProbeResult};
use crate::models::{
    DetailRecord, PayloadFormat, QueryKind, SearchRecord, SearchResults, SourceTag, UNKNOWN_TITLE,
};
use xml::{ATTRIBUTE_PREFIX, TEXT_KEY};

/// A named item container location inside the canonical tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeStrategy {
    pub name: &'static str,
    /// Keys walked from the tree root down to the item container
    pub path: &'static [&'static str],
}

const fn shape(name: &'static str, path: &'static [&'static str]) -> ShapeStrategy {
    ShapeStrategy { name, path }
}

pub const XML_SEARCH_SHAPES: &[ShapeStrategy] = &[
    shape("direct list", &["list", "video"]),
    shape("rss list", &["rss", "list", "video"]),
    shape("videos wrapper", &["videos", "video"]),
    shape("data wrapper", &["data", "video"]),
];

pub const XML_DETAIL_SHAPES: &[ShapeStrategy] = &[
    shape("direct list", &["list", "video"]),
    shape("rss list", &["rss", "list", "video"]),
    shape("videos wrapper", &["videos", "video"]),
    shape("data wrapper", &["data", "video"]),
    shape("bare video", &["video"]),
];

pub const JSON_SHAPES: &[ShapeStrategy] = &[
    shape("direct list", &["list"]),
    shape("rss list", &["rss", "list"]),
    shape("videos wrapper", &["videos"]),
    shape("data wrapper", &["data"]),
];

const XML_ID_FIELDS: &[&str] = &["id", "vodid", "vod_id"];
const JSON_ID_FIELDS: &[&str] = &["vod_id", "id", "vodid"];
const XML_TITLE_FIELDS: &[&str] = &["name", "title", "vod_name", "vod_title"];
const JSON_TITLE_FIELDS: &[&str] = &["vod_name", "title", "name", "vod_title"];

/// Shape table consulted for a payload, in priority order
pub fn shapes(format: PayloadFormat, kind: QueryKind) -> &'static [ShapeStrategy] {
    match (format, kind) {
        (PayloadFormat::Xml, QueryKind::Search) => XML_SEARCH_SHAPES,
        (PayloadFormat::Xml, QueryKind::Detail) => XML_DETAIL_SHAPES,
        (PayloadFormat::Json, _) => JSON_SHAPES,
    }
}

/// Result of [`normalize`]
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Search(SearchResults),
    Detail(Option<DetailRecord>),
}

/// Parse a raw payload into the canonical tree
///
/// Only JSON can fail; XML degrades to a partial (possibly empty) tree.
pub fn parse_payload(payload: &str, format: PayloadFormat) -> ProbeResult<Value> {
    match format {
        PayloadFormat::Json => serde_json::from_str(payload.trim_start_matches('\u{feff}'))
            .map_err(|e| ProbeError::parse(format.as_str(), e.to_string())),
        PayloadFormat::Xml => Ok(xml::parse_xml_tree(payload)),
    }
}

/// Normalize any payload, degrading every failure to an empty result
pub fn normalize(
    payload: &str,
    format: PayloadFormat,
    kind: QueryKind,
    endpoint_tag: Option<&SourceTag>,
) -> Normalized {
    match kind {
        QueryKind::Search => Normalized::Search(parse_search(payload, format).unwrap_or_else(|e| {
            debug!("Search payload not understood: {e}");
            SearchResults::empty()
        })),
        QueryKind::Detail => Normalized::Detail(
            parse_detail(payload, format, endpoint_tag).unwrap_or_else(|e| {
                debug!("Detail payload not understood: {e}");
                None
            }),
        ),
    }
}

/// Normalize a search answer
pub fn parse_search(payload: &str, format: PayloadFormat) -> ProbeResult<SearchResults> {
    let tree = parse_payload(payload, format)?;
    Ok(search_from_tree(&tree, format))
}

/// Normalize a detail answer to the first item found
///
/// `endpoint_tag` is the source tag of the endpoint base URI; XML payloads
/// without one fall back to the root `baseurl` attribute.
pub fn parse_detail(
    payload: &str,
    format: PayloadFormat,
    endpoint_tag: Option<&SourceTag>,
) -> ProbeResult<Option<DetailRecord>> {
    let tree = parse_payload(payload, format)?;
    Ok(detail_from_tree(&tree, format, endpoint_tag))
}

pub fn search_from_tree(tree: &Value, format: PayloadFormat) -> SearchResults {
    let Some((strategy, container)) = find_container(tree, shapes(format, QueryKind::Search)) else {
        debug!(format = %format, "No known search shape matched");
        return SearchResults::empty();
    };

    let (id_fields, title_fields) = match format {
        PayloadFormat::Xml => (XML_ID_FIELDS, XML_TITLE_FIELDS),
        PayloadFormat::Json => (JSON_ID_FIELDS, JSON_TITLE_FIELDS),
    };

    let records: Vec<SearchRecord> = items(container)
        .into_iter()
        .map(|item| SearchRecord {
            id: first_field(item, id_fields),
            title: first_field(item, title_fields).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        })
        .collect();

    debug!(shape = strategy.name, results = records.len(), "Normalized search payload");
    SearchResults::new(records)
}

pub fn detail_from_tree(
    tree: &Value,
    format: PayloadFormat,
    endpoint_tag: Option<&SourceTag>,
) -> Option<DetailRecord> {
    let (strategy, container) = find_container(tree, shapes(format, QueryKind::Detail))?;
    let item = items(container).into_iter().next()?;

    let source_tag = endpoint_tag.cloned().or_else(|| match format {
        PayloadFormat::Xml => xml::root_attribute(tree, "baseurl").and_then(SourceTag::from_uri),
        PayloadFormat::Json => None,
    });

    debug!(shape = strategy.name, source_tag = ?source_tag, "Normalized detail payload");
    Some(DetailRecord {
        item: item.clone(),
        source_tag,
    })
}

/// First strategy whose container exists in the tree
pub fn find_container<'a>(
    tree: &'a Value,
    strategies: &'static [ShapeStrategy],
) -> Option<(&'static ShapeStrategy, &'a Value)> {
    strategies.iter().find_map(|strategy| {
        strategy
            .path
            .iter()
            .try_fold(tree, |node, key| node.get(*key))
            .filter(|container| !container.is_null())
            .map(|container| (strategy, container))
    })
}

/// Items of a container; a lone item is a one-element list
pub fn items(container: &Value) -> Vec<&Value> {
    match container {
        Value::Array(values) => values.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Text of a field looked up as attribute, child text, then plain value
pub fn field_text(item: &Value, field: &str) -> Option<String> {
    item.get(format!("{ATTRIBUTE_PREFIX}{field}"))
        .and_then(scalar_text)
        .or_else(|| item.get(field).and_then(node_text))
}

fn first_field(item: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| field_text(item, field))
}

/// Text content of a tree node: scalars directly, elements via `_text`
pub fn node_text(node: &Value) -> Option<String> {
    match node {
        Value::Object(map) => map.get(TEXT_KEY).and_then(scalar_text),
        Value::Array(values) => values.first().and_then(node_text),
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_json_direct_list() {
        let payload = r#"{"list":[{"vod_id":7,"vod_name":"X"}]}"#;
        let results = parse_search(payload, PayloadFormat::Json).unwrap();
        assert_eq!(results.result_count, 1);
        assert_eq!(
            results.records,
            vec![SearchRecord {
                id: Some("7".to_string()),
                title: "X".to_string()
            }]
        );
    }

    #[rstest]
    #[case(r#"{"list":[{"vod_id":1,"vod_name":"A"},{"vod_id":2,"vod_name":"B"}]}"#, 2)]
    #[case(r#"{"rss":{"list":[{"id":"1","title":"A"}]}}"#, 1)]
    #[case(r#"{"videos":[{"vodid":"5","name":"A"}]}"#, 1)]
    #[case(r#"{"data":{"vod_id":"9","vod_title":"A"}}"#, 1)]
    #[case(r#"{"code":1,"msg":"ok","total":0}"#, 0)]
    #[case(r#"{"list":[]}"#, 0)]
    fn test_json_shapes(#[case] payload: &str, #[case] expected: usize) {
        assert_eq!(parse_search(payload, PayloadFormat::Json).unwrap().result_count, expected);
    }

    #[test]
    fn test_json_shape_priority() {
        // `list` outranks `data` even when both are present
        let results = parse_search(
            r#"{"data":[{"vod_id":1,"vod_name":"D"}],"list":[{"vod_id":2,"vod_name":"L"}]}"#,
            PayloadFormat::Json,
        )
        .unwrap();
        assert_eq!(results.records[0].title, "L");
    }

    #[test]
    fn test_xml_search_shapes() {
        let rss = concat!(
            r#"<?xml version="1.0"?><rss><list>"#,
            r#"<video><id>11</id><name><![CDATA[Eleven]]></name></video>"#,
            r#"<video><vodid>12</vodid><title>Twelve</title></video>"#,
            r#"</list></rss>"#
        );
        let results = parse_search(rss, PayloadFormat::Xml).unwrap();
        assert_eq!(results.result_count, 2);
        assert_eq!(results.records[0].id.as_deref(), Some("11"));
        assert_eq!(results.records[0].title, "Eleven");
        assert_eq!(results.records[1].id.as_deref(), Some("12"));
        assert_eq!(results.records[1].title, "Twelve");

        let attr_id = concat!(
            r#"<videos><video id="3" vod_name="ignored">"#,
            r#"<vod_name>Three</vod_name></video></videos>"#
        );
        let results = parse_search(attr_id, PayloadFormat::Xml).unwrap();
        assert_eq!(results.records[0].id.as_deref(), Some("3"));
        assert_eq!(results.records[0].title, "ignored");
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let payload = r#"{"list":[{"type":"movie"}]}"#;
        let results = parse_search(payload, PayloadFormat::Json).unwrap();
        assert_eq!(results.result_count, 1);
        assert_eq!(results.records[0].id, None);
        assert_eq!(results.records[0].title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_search("<html>502 Bad Gateway</html>", PayloadFormat::Json).unwrap_err();
        assert!(matches!(err, ProbeError::Parse { .. }));

        assert_eq!(
            normalize("garbage", PayloadFormat::Json, QueryKind::Search, None),
            Normalized::Search(SearchResults::empty())
        );
        assert_eq!(
            normalize("garbage", PayloadFormat::Json, QueryKind::Detail, None),
            Normalized::Detail(None)
        );
    }

    #[test]
    fn test_detail_first_item_and_tags() {
        let endpoint_tag = SourceTag::new("ffm3u8");
        let detail = parse_detail(
            r#"{"list":[{"vod_id":1,"vod_play_url":"a"},{"vod_id":2}]}"#,
            PayloadFormat::Json,
            Some(&endpoint_tag),
        )
        .unwrap()
        .unwrap();
        assert_eq!(detail.item, json!({"vod_id":1,"vod_play_url":"a"}));
        assert_eq!(detail.source_tag, Some(endpoint_tag));
    }

    #[test]
    fn test_xml_detail_bare_video_and_baseurl_tag() {
        let payload = concat!(
            r#"<rss baseurl="http://api.example.com/api.php/provide/vod/from/lzm3u8/">"#,
            r#"<list><video><id>1</id></video></list></rss>"#
        );
        let detail = parse_detail(payload, PayloadFormat::Xml, None).unwrap().unwrap();
        assert_eq!(detail.source_tag.map(|t| t.to_string()), Some("lzm3u8".to_string()));

        let bare = "<video><id>5</id></video>";
        let bare_detail = parse_detail(bare, PayloadFormat::Xml, None).unwrap().unwrap();
        assert_eq!(field_text(&bare_detail.item, "id").as_deref(), Some("5"));
        assert_eq!(bare_detail.source_tag, None);

        // A bare <video> root is not a search shape
        assert_eq!(parse_search(bare, PayloadFormat::Xml).unwrap().result_count, 0);
    }

    #[test]
    fn test_no_shape_is_empty_not_error() {
        assert_eq!(parse_detail("<error>nope</error>", PayloadFormat::Xml, None).unwrap(), None);
        assert_eq!(parse_detail(r#"{"list":[]}"#, PayloadFormat::Json, None).unwrap(), None);
    }

    #[test]
    fn test_shape_tables_are_ordered() {
        let names: Vec<&str> =
            shapes(PayloadFormat::Xml, QueryKind::Detail).iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["direct list", "rss list", "videos wrapper", "data wrapper", "bare video"]
        );
        assert_eq!(shapes(PayloadFormat::Json, QueryKind::Search).len(), 4);
    }
}
