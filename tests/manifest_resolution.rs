//! Detail payload to terminal media segment, through the public library API
//!
//! Manifests are served from an in-memory graph so these run without a network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use vod_probe::{
    config::ResolverConfig,
    errors::{ProbeError, ProbeResult},
    models::PayloadFormat,
    normalize::parse_detail,
    resolve::{FetchedManifest, ManifestFetcher, extract_candidates, resolve_media},
};

const CDN: &str = "https://cdn.example.com";

#[derive(Default)]
struct ManifestGraph {
    manifests: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl ManifestGraph {
    fn serve(mut self, path: &str, body: &str) -> Self {
        self.manifests.insert(format!("{CDN}{path}"), body.to_string());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestFetcher for ManifestGraph {
    async fn fetch_manifest(&self, uri: &str) -> ProbeResult<FetchedManifest> {
        self.requested.lock().unwrap().push(uri.to_string());
        match self.manifests.get(uri) {
            Some(body) => Ok(FetchedManifest {
                uri: uri.to_string(),
                body: body.clone(),
                content_type: None,
            }),
            None => Err(ProbeError::Http {
                status: 404,
                url: uri.to_string(),
            }),
        }
    }
}

fn first_candidate(payload: &str, format: PayloadFormat) -> String {
    let record = parse_detail(payload, format, None).unwrap().unwrap();
    let candidates = extract_candidates(
        &record.item,
        format,
        record.source_tag.as_ref(),
        &ResolverConfig::default(),
    );
    candidates.first().unwrap().to_string()
}

#[test]
fn test_xml_detail_to_segment() {
    let payload = r#"<rss baseurl="https://cj.example.com/api.php/provide/vod/from/wjm3u8/">
        <list><video>
        <id>11</id><name>Example</name>
        <dl>
        <dd flag="other">第1集$https://elsewhere.example.com/x.m3u8</dd>
        <dd flag="wjm3u8">HD$//cdn.example.com/v/11/index.m3u8</dd>
        </dl>
        </video></list></rss>"#;
    let candidate = first_candidate(payload, PayloadFormat::Xml);
    assert_eq!(candidate, format!("{CDN}/v/11/index.m3u8"));

    let graph = ManifestGraph::default().serve(
        "/v/11/1000k/index.m3u8",
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:6.0,\n/v/11/1000k/seg-00001.ts\n",
    );
    let master = "#EXTM3U\n#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=1000000\n1000k/index.m3u8\n";

    let media = tokio_test::block_on(resolve_media(&graph, &candidate, master, None, 2));
    assert_eq!(media, Some(format!("{CDN}/v/11/1000k/seg-00001.ts")));
    assert_eq!(graph.requested(), vec![format!("{CDN}/v/11/1000k/index.m3u8")]);
}

#[test]
fn test_json_detail_with_single_field_fallback() {
    let payload = r#"{"code":1,"list":[{
        "vod_id":3,
        "vod_name":"Example",
        "vod_play_url":"",
        "url":"https://cdn.example.com/a/index.m3u8"
    }]}"#;
    let candidate = first_candidate(payload, PayloadFormat::Json);
    assert_eq!(candidate, format!("{CDN}/a/index.m3u8"));

    let body = "#EXTM3U\n#EXTINF:4,\nhttps://media.example.com/chunk/0001.mp4\n";
    let graph = ManifestGraph::default();
    let media = tokio_test::block_on(resolve_media(&graph, &candidate, body, None, 2));
    assert_eq!(media, Some("https://media.example.com/chunk/0001.mp4".to_string()));
}

#[test]
fn test_depth_bound_stops_descent() {
    let graph = ManifestGraph::default()
        .serve("/d1.m3u8", "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nd2.m3u8\n")
        .serve("/d2.m3u8", "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nd3.m3u8\n")
        .serve("/d3.m3u8", "#EXTM3U\n#EXTINF:4,\nfinal.ts\n");
    let root = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nd1.m3u8\n";

    let root_uri = format!("{CDN}/root.m3u8");
    let media = tokio_test::block_on(resolve_media(&graph, &root_uri, root, None, 2));
    assert_eq!(media, None);
    assert!(!graph.requested().contains(&format!("{CDN}/d3.m3u8")));

    let deeper = tokio_test::block_on(resolve_media(&graph, &root_uri, root, None, 3));
    assert_eq!(deeper, Some(format!("{CDN}/final.ts")));
}

#[test]
fn test_mpegurl_content_type_without_m3u8_uri() {
    let body = "#EXTM3U\n#EXTINF:4,\nsegment_0.bin\n";
    let graph = ManifestGraph::default();

    let by_type = tokio_test::block_on(resolve_media(
        &graph,
        "https://cdn.example.com/play?id=9",
        body,
        Some("audio/x-mpegurl"),
        2,
    ));
    assert_eq!(by_type, Some("https://cdn.example.com/segment_0.bin".to_string()));

    let untyped = tokio_test::block_on(resolve_media(
        &graph,
        "https://cdn.example.com/play?id=9",
        body,
        None,
        2,
    ));
    assert_eq!(untyped, None);
}
