//! Recursive HLS manifest resolution down to a terminal media segment

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::errors::ProbeResult;
use crate::utils::UrlUtils;

const MANIFEST_SIGNATURE: &str = "#EXTM3U";
const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";
const TERMINAL_MARKERS: &[&str] = &[".ts", ".mp4", ".jpeg", ".jpg", "/hls/", "segment"];

/// A fetched manifest body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedManifest {
    /// Final URI after redirects; relative lines resolve against it
    pub uri: String,
    pub body: String,
    pub content_type: Option<String>,
}

/// Fetch capability used for nested manifests
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch_manifest(&self, uri: &str) -> ProbeResult<FetchedManifest>;
}

/// Position of the resolver within a manifest graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResolutionState {
    /// 0 for the manifest the transport fetched, +1 per nested step
    pub depth: u8,
    pub uri: String,
    pub body: String,
}

impl ManifestResolutionState {
    pub fn root<U: Into<String>, B: Into<String>>(uri: U, body: B) -> Self {
        Self {
            depth: 0,
            uri: uri.into(),
            body: body.into(),
        }
    }

    fn nested(&self, fetched: FetchedManifest) -> Self {
        Self {
            depth: self.depth + 1,
            uri: fetched.uri,
            body: fetched.body,
        }
    }
}

/// How a non-comment manifest line is treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLine {
    Nested(String),
    Terminal(String),
    Ignored,
}

fn has_manifest_signature(body: &str) -> bool {
    body.trim_start_matches('\u{feff}').trim_start().starts_with(MANIFEST_SIGNATURE)
}

/// True when a fetched body is an HLS manifest
///
/// Either the URI names an `.m3u8` or the content type says `mpegurl`, and
/// the body starts with `#EXTM3U`.
pub fn is_manifest(uri: &str, content_type: Option<&str>, body: &str) -> bool {
    let by_uri = uri.to_ascii_lowercase().contains(".m3u8");
    let by_type = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("mpegurl"))
        .unwrap_or(false);
    (by_uri || by_type) && has_manifest_signature(body)
}

/// Classify one non-comment line of a manifest
///
/// Markers are matched against the line resolved against `base_uri`, so a
/// bare segment name under an `/hls/` directory is terminal.
pub fn classify_line(base_uri: &str, line: &str, after_stream_inf: bool) -> ManifestLine {
    let Some(resolved) = UrlUtils::resolve_against(base_uri, line) else {
        return ManifestLine::Ignored;
    };
    let lower = resolved.to_ascii_lowercase();

    if after_stream_inf || lower.contains(".m3u8") {
        ManifestLine::Nested(resolved)
    } else if TERMINAL_MARKERS.iter().any(|marker| lower.contains(marker)) {
        ManifestLine::Terminal(resolved)
    } else {
        ManifestLine::Ignored
    }
}

/// Resolve a fetched body to its first terminal media URI
///
/// Returns `None` for non-manifest bodies, for manifests without a usable
/// segment and when nesting exceeds `max_depth`.
pub async fn resolve_media(
    fetcher: &dyn ManifestFetcher,
    uri: &str,
    body: &str,
    content_type: Option<&str>,
    max_depth: u8,
) -> Option<String> {
    if !is_manifest(uri, content_type, body) {
        return None;
    }
    resolve_state(fetcher, ManifestResolutionState::root(uri, body), max_depth).await
}

/// Scan a manifest, following nested manifests depth-first
pub fn resolve_state<'a>(
    fetcher: &'a dyn ManifestFetcher,
    state: ManifestResolutionState,
    max_depth: u8,
) -> BoxFuture<'a, Option<String>> {
    async move {
        if state.depth > max_depth {
            debug!(uri = %state.uri, depth = state.depth, "Manifest nesting too deep");
            return None;
        }

        let mut after_stream_inf = false;
        for raw_line in state.body.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if line.starts_with(STREAM_INF_TAG) {
                    after_stream_inf = true;
                }
                continue;
            }

            let flagged = std::mem::take(&mut after_stream_inf);
            match classify_line(&state.uri, line, flagged) {
                ManifestLine::Terminal(media) => {
                    debug!(
                        depth = state.depth,
                        media = %UrlUtils::obfuscate_credentials(&media),
                        "Resolved terminal segment"
                    );
                    return Some(media);
                }
                ManifestLine::Nested(nested_uri) => {
                    if state.depth >= max_depth {
                        debug!(
                            uri = %nested_uri,
                            depth = state.depth,
                            "Skipping nested manifest beyond depth limit"
                        );
                        continue;
                    }
                    let fetched = match fetcher.fetch_manifest(&nested_uri).await {
                        Ok(fetched) => fetched,
                        Err(e) => {
                            debug!(uri = %nested_uri, "Nested manifest fetch failed: {e}");
                            continue;
                        }
                    };
                    if !has_manifest_signature(&fetched.body) {
                        debug!(uri = %fetched.uri, "Nested resource is not a manifest");
                        continue;
                    }
                    let nested = resolve_state(fetcher, state.nested(fetched), max_depth).await;
                    if nested.is_some() {
                        return nested;
                    }
                }
                ManifestLine::Ignored => {}
            }
        }

        None
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProbeError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory manifest graph recording every fetch
    #[derive(Default)]
    struct StubFetcher {
        manifests: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn with(mut self, uri: &str, body: &str) -> Self {
            self.manifests.insert(uri.to_string(), body.to_string());
            self
        }

        fn fetch_count(&self) -> usize {
            self.fetched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ManifestFetcher for StubFetcher {
        async fn fetch_manifest(&self, uri: &str) -> ProbeResult<FetchedManifest> {
            self.fetched.lock().unwrap().push(uri.to_string());
            self.manifests
                .get(uri)
                .map(|body| FetchedManifest {
                    uri: uri.to_string(),
                    body: body.clone(),
                    content_type: Some("application/vnd.apple.mpegurl".to_string()),
                })
                .ok_or_else(|| ProbeError::Http {
                    status: 404,
                    url: uri.to_string(),
                })
        }
    }

    #[tokio::test]
    async fn test_master_to_media_segment() {
        let fetcher = StubFetcher::default().with(
            "https://cdn.example.com/v/nested.m3u8",
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg1.ts\n",
        );
        let master = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\nnested.m3u8\n";

        let base = "https://cdn.example.com/v/index.m3u8";
        let media = resolve_media(&fetcher, base, master, None, 2).await;
        assert_eq!(media.as_deref(), Some("https://cdn.example.com/v/seg1.ts"));
    }

    #[tokio::test]
    async fn test_depth_two_graph_resolves() {
        let fetcher = StubFetcher::default()
            .with(
                "https://cdn.example.com/a/1.m3u8",
                "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n/b/2.m3u8\n",
            )
            .with(
                "https://cdn.example.com/b/2.m3u8",
                "#EXTM3U\n#EXTINF:4,\n//edge.example.com/media/000.ts\n",
            );
        let top = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\na/1.m3u8\n";

        let base = "https://cdn.example.com/index.m3u8";
        let media = resolve_media(&fetcher, base, top, None, 2).await;
        assert_eq!(media.as_deref(), Some("https://edge.example.com/media/000.ts"));
    }

    #[tokio::test]
    async fn test_depth_three_graph_stops() {
        let fetcher = StubFetcher::default()
            .with("https://cdn.example.com/1.m3u8", "#EXTM3U\n2.m3u8\n")
            .with("https://cdn.example.com/2.m3u8", "#EXTM3U\n3.m3u8\n")
            .with("https://cdn.example.com/3.m3u8", "#EXTM3U\nseg.ts\n");

        let base = "https://cdn.example.com/0.m3u8";
        let media = resolve_media(&fetcher, base, "#EXTM3U\n1.m3u8\n", None, 2).await;
        assert_eq!(media, None);
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_nested_fetch_continues_scan() {
        let fetcher = StubFetcher::default();
        let body = concat!(
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nmissing.m3u8\n",
            "#EXTINF:5,\nsegment-001.aac\n"
        );

        let base = "https://cdn.example.com/v/index.m3u8?sign=1";
        let media = resolve_media(&fetcher, base, body, None, 2).await;
        assert_eq!(media.as_deref(), Some("https://cdn.example.com/v/segment-001.aac"));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_stream_inf_flag_applies_to_next_line_only() {
        let fetcher = StubFetcher::default();
        let body = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nvariant-a\n#EXTINF:5,\nsegment-b\n";

        let base = "https://cdn.example.com/index.m3u8";
        let media = resolve_media(&fetcher, base, body, None, 2).await;
        assert_eq!(media.as_deref(), Some("https://cdn.example.com/segment-b"));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_non_manifest_has_no_terminal_step() {
        let fetcher = StubFetcher::default();
        let mp4 = "https://cdn.example.com/movie.mp4";
        assert_eq!(resolve_media(&fetcher, mp4, "binary", Some("video/mp4"), 2).await, None);
        // Right URI, wrong body
        assert_eq!(
            resolve_media(&fetcher, "https://cdn.example.com/index.m3u8", "<html>", None, 2).await,
            None
        );
    }

    #[test]
    fn test_is_manifest() {
        assert!(is_manifest("https://a.example.com/x.M3U8", None, "\u{feff}  #EXTM3U\n"));
        let play = "https://a.example.com/play?id=1";
        assert!(is_manifest(play, Some("application/x-mpegURL"), "#EXTM3U"));
        assert!(!is_manifest(play, Some("text/plain"), "#EXTM3U"));
        assert!(!is_manifest("https://a.example.com/x.m3u8", None, "404 not found"));
    }

    #[test]
    fn test_classify_line() {
        let base = "https://cdn.example.com:8080/hls/index.m3u8";
        assert_eq!(
            classify_line(base, "/live/seg.ts", false),
            ManifestLine::Terminal("https://cdn.example.com:8080/live/seg.ts".to_string())
        );
        assert_eq!(
            classify_line(base, "sub/index.m3u8", false),
            ManifestLine::Nested("https://cdn.example.com:8080/hls/sub/index.m3u8".to_string())
        );
        assert_eq!(
            classify_line("https://cdn.example.com/vod/index.m3u8", "readme.txt", false),
            ManifestLine::Ignored
        );
    }

    #[test]
    fn test_classify_line_uses_resolved_uri() {
        let base = "https://cdn.example.com/20240101/hls/index.m3u8";
        assert_eq!(
            classify_line(base, "000001", false),
            ManifestLine::Terminal("https://cdn.example.com/20240101/hls/000001".to_string())
        );
        assert_eq!(
            classify_line("https://cdn.example.com/20240101/vod/index.m3u8", "000001", false),
            ManifestLine::Ignored
        );
    }

    #[tokio::test]
    async fn test_extensionless_segment_under_hls_directory() {
        let fetcher = StubFetcher::default();
        let media = resolve_media(
            &fetcher,
            "https://cdn.example.com/20240101/hls/index.m3u8",
            "#EXTM3U\n#EXTINF:6,\n000001\n",
            None,
            2,
        )
        .await;

        assert_eq!(media.as_deref(), Some("https://cdn.example.com/20240101/hls/000001"));
        assert_eq!(fetcher.fetch_count(), 0);
    }
}
