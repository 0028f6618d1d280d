use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the cookie the server issues on login
pub const SESSION_COOKIE_NAME: &str = "sessionId";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Session lifetime when the server does not send `Max-Age`.
/// Matches the server's own 24 hour session duration.
const DEFAULT_SESSION_HOURS: i64 = 24;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SessionData {
    /// Start a session now. A `max_age` that would run past the end of the
    /// representable calendar falls back to the default lifetime.
    pub fn new(token: String, username: String, max_age: Option<Duration>) -> Self {
        let created_at = Utc::now();
        let default_expiry = created_at + Duration::hours(DEFAULT_SESSION_HOURS);
        let expires_at = max_age
            .and_then(|age| created_at.checked_add_signed(age))
            .unwrap_or(default_expiry);
        Self {
            token,
            username,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE_NAME, self.token)
    }
}

/// The session cookie as read from a `Set-Cookie` response header.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub value: String,
    pub max_age: Option<Duration>,
}

impl SessionCookie {
    /// Find the session cookie among the `Set-Cookie` headers of a response.
    ///
    /// A cookie with an empty value or a non-positive `Max-Age` is the server
    /// clearing the session, and is ignored.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(Self::parse)
    }

    fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        if name != SESSION_COOKIE_NAME || value.is_empty() {
            return None;
        }

        let mut max_age = None;
        for attribute in parts {
            if let Some((key, val)) = attribute.split_once('=') {
                if key.eq_ignore_ascii_case("max-age") {
                    // Out-of-range values are dropped, leaving the default lifetime
                    max_age = val.trim().parse::<i64>().ok().and_then(Duration::try_seconds);
                }
            }
        }

        if max_age.is_some_and(|age| age <= Duration::zero()) {
            return None;
        }

        Some(Self {
            value: value.to_string(),
            max_age,
        })
    }
}

/// Persists the session to disk so later runs can skip the login.
/// Only the session cookie is stored; never the password.
pub struct SessionStore {
    cache_dir: PathBuf,
}

impl SessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Load session from disk. Expired sessions are treated as absent.
    pub fn load(&self) -> Result<Option<SessionData>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        if data.is_expired() {
            debug!(username = %data.username, "Stored session has expired");
            return Ok(None);
        }
        Ok(Some(data))
    }

    /// Save session to disk
    pub fn save(&self, data: &SessionData) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        write_private(&path, &contents).context("Failed to write session file")?;
        Ok(())
    }

    /// Remove the session file if there is one
    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

/// Write `contents` readable by the owner only; the file holds a live session token.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files left by older versions too
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
