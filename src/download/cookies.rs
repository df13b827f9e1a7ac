//! Platform credential material (cookies) for yt-dlp
//!
//! This module provides functionality to:
//! - Load the cookies file once at startup (JSON browser export or Netscape format)
//! - Convert JSON exports to the Netscape file yt-dlp expects, written into a
//!   private directory and swapped in by rename
//! - Share the loaded state read-only with every request
//! - Reload on SIGHUP when the cookies are rotated

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};
use thiserror::Error;
use tokio::sync::watch;

/// Errors while reading or converting a cookies file
#[derive(Debug, Error)]
pub enum CookieError {
    #[error("cookies file {path} could not be read: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("cookies file is empty")]
    Empty,

    #[error("cookies JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no cookie entries found")]
    NoCookies,

    #[error("failed to write converted cookies file: {0}")]
    Write(std::io::Error),
}

/// One cookie, whatever format it came from.
#[derive(Debug, Clone)]
pub struct CookieEntry {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix seconds; 0 for session cookies
    pub expires: i64,
    pub name: String,
    pub value: SecretString,
}

/// Browser-extension JSON export, the shape `cookies.json` files usually have.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonCookie {
    domain: String,
    name: String,
    value: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    host_only: Option<bool>,
    #[serde(default)]
    expiration_date: Option<f64>,
    #[serde(default)]
    session: Option<bool>,
}

impl From<JsonCookie> for CookieEntry {
    fn from(raw: JsonCookie) -> Self {
        let include_subdomains = match raw.host_only {
            Some(host_only) => !host_only,
            None => raw.domain.starts_with('.'),
        };
        let expires = if raw.session.unwrap_or(false) {
            0
        } else {
            raw.expiration_date.map(|secs| secs as i64).unwrap_or(0)
        };

        Self {
            domain: raw.domain,
            include_subdomains,
            path: raw.path.unwrap_or_else(|| "/".to_string()),
            secure: raw.secure,
            expires,
            name: raw.name,
            value: SecretString::from(raw.value),
        }
    }
}

/// Parses a JSON cookie export (array of cookie objects).
pub fn parse_json_cookies(content: &str) -> Result<Vec<CookieEntry>, CookieError> {
    let raw: Vec<JsonCookie> = serde_json::from_str(content)?;
    Ok(raw.into_iter().map(CookieEntry::from).collect())
}

/// Parses a Netscape HTTP Cookie File.
///
/// Format: domain TAB flag TAB path TAB secure TAB expires TAB name TAB value.
/// `#HttpOnly_` prefixed lines are cookies, other `#` lines are comments.
pub fn parse_netscape_cookies(content: &str) -> Vec<CookieEntry> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim_end_matches(['\r', '\n']);
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 7 {
                return None;
            }

            Some(CookieEntry {
                domain: parts[0].to_string(),
                include_subdomains: parts[1].eq_ignore_ascii_case("TRUE"),
                path: parts[2].to_string(),
                secure: parts[3].eq_ignore_ascii_case("TRUE"),
                expires: parts[4].parse().unwrap_or(0),
                name: parts[5].to_string(),
                value: SecretString::from(parts[6..].join("\t")),
            })
        })
        .collect()
}

/// Renders cookies as a Netscape HTTP Cookie File.
pub fn render_netscape(cookies: &[CookieEntry]) -> String {
    let mut out = String::from("# Netscape HTTP Cookie File\n");
    for cookie in cookies {
        let flag = |b: bool| if b { "TRUE" } else { "FALSE" };
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            cookie.domain,
            flag(cookie.include_subdomains),
            cookie.path,
            flag(cookie.secure),
            cookie.expires,
            cookie.name,
            cookie.value.expose_secret()
        ));
    }
    out
}

/// Credential material ready to hand to yt-dlp.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Netscape-format file passed as `--cookies`
    pub netscape_path: PathBuf,
    pub cookie_count: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Result of the last (re)load.
#[derive(Debug, Clone)]
pub enum CredentialState {
    Loaded(Credentials),
    Unavailable(String),
}

impl CredentialState {
    pub fn credentials(&self) -> Result<&Credentials, String> {
        match self {
            CredentialState::Loaded(creds) => Ok(creds),
            CredentialState::Unavailable(reason) => Err(reason.clone()),
        }
    }
}

/// Read-only view of the current credentials, cheap to clone into each request.
#[derive(Debug, Clone)]
pub struct CredentialHandle {
    rx: watch::Receiver<Arc<CredentialState>>,
}

impl CredentialHandle {
    /// Fixed state, mostly for tests and one-shot CLI runs.
    pub fn fixed(state: CredentialState) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(state));
        Self { rx }
    }

    pub fn current(&self) -> Arc<CredentialState> {
        Arc::clone(&self.rx.borrow())
    }
}

/// Name of the converted file inside the store's private directory
const CONVERTED_FILE_NAME: &str = "cookies.txt";

/// Owns the credential source file and publishes reloads.
pub struct CredentialStore {
    source: PathBuf,
    /// 0700 directory holding converted JSON exports, created on first use
    /// and removed with the store
    converted_dir: Mutex<Option<TempDir>>,
    tx: watch::Sender<Arc<CredentialState>>,
}

impl CredentialStore {
    /// Loads `source` once. Failures are logged and stored, not returned:
    /// the service still starts and requests fail in the resolver instead.
    pub fn load(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let (tx, _rx) = watch::channel(Arc::new(CredentialState::Unavailable("not loaded yet".to_string())));
        let store = Self {
            source,
            converted_dir: Mutex::new(None),
            tx,
        };
        store.reload();
        store
    }

    pub fn handle(&self) -> CredentialHandle {
        CredentialHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Re-reads the source file and publishes the new state.
    pub fn reload(&self) {
        let state = match self.read_source() {
            Ok(creds) => {
                log::info!(
                    "Loaded {} cookies from {} at {} (yt-dlp file: {})",
                    creds.cookie_count,
                    self.source.display(),
                    creds.loaded_at.to_rfc3339(),
                    creds.netscape_path.display()
                );
                CredentialState::Loaded(creds)
            }
            Err(e) => {
                log::warn!("Cookies unavailable ({}): {}", self.source.display(), e);
                log::warn!("Every request will fail in the metadata resolver until cookies are provided");
                CredentialState::Unavailable(e.to_string())
            }
        };
        self.tx.send_replace(Arc::new(state));
    }

    fn read_source(&self) -> Result<Credentials, CookieError> {
        let content = fs_err::read_to_string(&self.source).map_err(|source| CookieError::Read {
            path: self.source.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Err(CookieError::Empty);
        }

        if content.trim_start().starts_with('[') {
            let cookies = parse_json_cookies(&content)?;
            if cookies.is_empty() {
                return Err(CookieError::NoCookies);
            }
            let netscape_path = self.write_converted(&render_netscape(&cookies))?;
            Ok(Credentials {
                netscape_path,
                cookie_count: cookies.len(),
                loaded_at: Utc::now(),
            })
        } else {
            let cookies = parse_netscape_cookies(&content);
            if cookies.is_empty() {
                return Err(CookieError::NoCookies);
            }
            Ok(Credentials {
                netscape_path: self.source.clone(),
                cookie_count: cookies.len(),
                loaded_at: Utc::now(),
            })
        }
    }

    /// Writes `content` to a fresh 0600 file (`O_EXCL`) in the private
    /// directory and renames it over the previous conversion. A yt-dlp
    /// process still reading the old file keeps its copy.
    fn write_converted(&self, content: &str) -> Result<PathBuf, CookieError> {
        let mut guard = self.converted_dir.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let dir = match guard.as_ref() {
            Some(dir) => dir.path().to_path_buf(),
            None => {
                let created = tempfile::Builder::new()
                    .prefix("doramp3-cookies-")
                    .tempdir()
                    .map_err(CookieError::Write)?;
                let path = created.path().to_path_buf();
                *guard = Some(created);
                path
            }
        };

        let mut file = NamedTempFile::new_in(&dir).map_err(CookieError::Write)?;
        file.write_all(content.as_bytes()).map_err(CookieError::Write)?;
        file.as_file().sync_all().map_err(CookieError::Write)?;

        let target = dir.join(CONVERTED_FILE_NAME);
        file.persist(&target).map_err(|e| CookieError::Write(e.error))?;
        Ok(target)
    }
}

/// Reload the credential store every time the process receives SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_on_sighup(store: Arc<CredentialStore>) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            log::info!("SIGHUP received, reloading cookies from {}", store.source().display());
            store.reload();
        }
    }))
}
