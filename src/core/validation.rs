//! Resource locator validation
//!
//! Whitelist-based check that a caller-supplied URL has the platform's shape
//! before anything touches the network:
//! - Only HTTP/HTTPS schemes
//! - Host must be an allowed domain (or a subdomain of one)
//! - A video id must be extractable (`?v=`, `youtu.be/<id>`, `/embed/<id>`,
//!   `/shorts/<id>`, `/live/<id>`, `/v/<id>`) and match the id pattern
//!
//! Inspired by boul2gom/yt-dlp validation patterns, adapted for doramp3.

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Maximum accepted locator length
pub const MAX_URL_LENGTH: usize = 2048;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Not parseable as an absolute URL (or too long)
    #[error("Malformed URL: {0}")]
    Malformed(String),

    /// Scheme other than http/https
    #[error("Unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    /// Host outside the allowed platform domains
    #[error("Host '{host}' is not an allowed platform domain")]
    HostNotAllowed { host: String },

    /// No video id could be extracted, or it does not match the id pattern
    #[error("No valid video id in {0}")]
    MissingVideoId(String),
}

/// Rules describing what a platform locator looks like.
#[derive(Debug, Clone)]
pub struct LocatorRules {
    hosts: Vec<String>,
    id_pattern: Regex,
}

/// YouTube domains accepted by default (subdomains included).
const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];

impl LocatorRules {
    /// YouTube shape: known hosts, 11-character video ids.
    pub fn youtube() -> Self {
        Self {
            hosts: YOUTUBE_HOSTS.iter().map(|h| h.to_string()).collect(),
            id_pattern: Regex::clone(lazy_regex::regex!(r"^[A-Za-z0-9_-]{11}$")),
        }
    }

    /// Replace the allowed host list.
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = hosts.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Replace the video id pattern.
    pub fn with_id_pattern(mut self, pattern: Regex) -> Self {
        self.id_pattern = pattern;
        self
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    fn host_allowed(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.hosts
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }

    /// Validates `raw` and returns the extracted video id.
    ///
    /// # Examples
    /// ```
    /// use doramp3::core::validation::LocatorRules;
    ///
    /// let rules = LocatorRules::youtube();
    /// assert_eq!(
    ///     rules.validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
    ///     "dQw4w9WgXcQ"
    /// );
    /// assert!(rules.validate("https://evil.com/watch?v=dQw4w9WgXcQ").is_err());
    /// assert!(rules.validate("not a url").is_err());
    /// ```
    pub fn validate(&self, raw: &str) -> Result<String, ValidationError> {
        let raw = raw.trim();
        if raw.len() > MAX_URL_LENGTH {
            return Err(ValidationError::Malformed(format!("URL longer than {} bytes", MAX_URL_LENGTH)));
        }

        let parsed = Url::parse(raw).map_err(|_| ValidationError::Malformed(raw.to_string()))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::UnsupportedScheme {
                url: raw.to_string(),
                scheme: parsed.scheme().to_string(),
            });
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| ValidationError::Malformed(format!("{} (no host)", raw)))?;
        if !self.host_allowed(host) {
            return Err(ValidationError::HostNotAllowed { host: host.to_string() });
        }

        extract_video_id(&parsed)
            .filter(|id| self.id_pattern.is_match(id))
            .ok_or_else(|| ValidationError::MissingVideoId(raw.to_string()))
    }
}

/// Pull the candidate video id out of a platform URL.
fn extract_video_id(url: &Url) -> Option<String> {
    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
        return Some(id.into_owned());
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;
    let is_short_host = url.host_str().is_some_and(|h| h.eq_ignore_ascii_case("youtu.be"));
    if is_short_host {
        return Some(first.to_string());
    }

    match first {
        "embed" | "shorts" | "live" | "v" | "e" => segments.next().map(str::to_string),
        _ => None,
    }
}
