//! Playlist resolution: candidate URIs from detail records and manifest
//! descent to a terminal media segment

pub mod candidates;
pub mod manifest;

pub use candidates::{
    CANDIDATE_STRATEGIES, CandidateSource, CandidateStrategy, extract_candidates, parse_play_list,
};
pub use manifest::{
    FetchedManifest, ManifestFetcher, ManifestLine, ManifestResolutionState, is_manifest,
    resolve_media,
};
