//! Video URL canonicalization.
//!
//! Every accepted YouTube URL shape is reduced to its 11-character video ID
//! and rewritten to a single canonical form. Jobs are stored and matched on
//! that form only, so two spellings of the same video always collide.
//!
//! # Security
//! - URLs are treated as untrusted input
//! - Only YouTube domains are accepted
//! - Video IDs are strictly validated (11 chars, alphanumeric + `-_`)

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Maximum URL length to prevent DoS attacks.
pub const MAX_URL_LENGTH: usize = 2048;

/// Host used in every canonical URL.
pub const CANONICAL_HOST: &str = "www.youtube.com";

const VIDEO_ID_LEN: usize = 11;

/// Path prefixes that carry the video ID as the next segment.
const ID_PATH_PREFIXES: [&str; 4] = ["shorts", "embed", "v", "live"];

/// Errors that can occur while normalizing a video URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL cannot be empty")]
    Empty,

    #[error("URL exceeds maximum length of {} characters", MAX_URL_LENGTH)]
    TooLong,

    #[error("Invalid URL format: {0}")]
    Malformed(String),

    #[error("Invalid protocol '{0}'. Only HTTP and HTTPS are allowed.")]
    UnsupportedScheme(String),

    #[error("URL is not a valid YouTube URL")]
    NotYoutube,

    #[error("Video ID not found in URL")]
    VideoIdNotFound,

    #[error("Video ID has invalid format")]
    InvalidVideoId,
}

/// Result type for URL normalization.
pub type UrlResult<T> = Result<T, UrlError>;

/// A video URL in canonical form: `https://www.youtube.com/watch?v=<id>`.
///
/// Only constructible through [`CanonicalUrl::parse`], so holding one proves
/// the string was normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Normalize any accepted URL shape.
    pub fn parse(input: &str) -> UrlResult<Self> {
        let id = extract_video_id(input)?;
        Ok(Self(format!("https://{}/watch?v={}", CANONICAL_HOST, id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 11-character video ID.
    pub fn video_id(&self) -> &str {
        &self.0[self.0.len() - VIDEO_ID_LEN..]
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a caller-supplied URL to its canonical string.
pub fn normalize_video_url(input: &str) -> UrlResult<String> {
    CanonicalUrl::parse(input).map(CanonicalUrl::into_string)
}

/// Extract the YouTube video ID from any supported URL shape.
///
/// Supports:
/// - https://youtube.com/watch?v=VIDEO_ID (also www., m., music. hosts)
/// - https://youtu.be/VIDEO_ID
/// - https://youtube.com/shorts/VIDEO_ID
/// - https://youtube.com/embed/VIDEO_ID, /v/VIDEO_ID, /live/VIDEO_ID
/// - With or without query parameters, fragments or scheme
pub fn extract_video_id(input: &str) -> UrlResult<String> {
    if input.len() > MAX_URL_LENGTH {
        return Err(UrlError::TooLong);
    }

    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| UrlError::Malformed(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or(UrlError::NotYoutube)?;
    let host = strip_subdomain(&host);

    let candidate = match host {
        "youtu.be" => first_segment(&parsed),
        "youtube.com" | "youtube-nocookie.com" => id_from_youtube_path(&parsed),
        _ => return Err(UrlError::NotYoutube),
    };

    let id = candidate.ok_or(UrlError::VideoIdNotFound)?;
    validate_video_id(&id)?;
    Ok(id)
}

fn strip_subdomain(host: &str) -> &str {
    ["www.", "m.", "music."]
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(host)
}

fn first_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn id_from_youtube_path(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["watch"] => url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned()),
        [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) => Some((*id).to_string()),
        _ => None,
    }
}

fn validate_video_id(id: &str) -> UrlResult<()> {
    if id.len() != VIDEO_ID_LEN {
        return Err(UrlError::InvalidVideoId);
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(UrlError::InvalidVideoId);
    }
    Ok(())
}
