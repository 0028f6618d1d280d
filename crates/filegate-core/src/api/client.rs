//! Client for the file-browser service.
//!
//! `FileClient` logs in with a username and password, keeps the session
//! cookie the server hands back, and uses it to fetch files and listings.

use std::path::Path;
use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, SessionCookie, SessionData};
use crate::config::Config;
use crate::models::{DirectoryListing, FileInfo, HealthStatus, UserInfo};

use super::{ClientError, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_PATH: &str = "api/login";
const LOGOUT_PATH: &str = "logout";
const USER_PATH: &str = "api/user";
const FILES_PATH: &str = "api/files";
const FILE_INFO_PATH: &str = "api/file-info";
const DOWNLOAD_PATH: &str = "api/download";
const HEALTH_PATH: &str = "health";

/// Query parameter every path-taking endpoint reads
const PATH_PARAM: &str = "path";

/// Directory listed when `list` is given an empty path
const ROOT_PATH: &str = "/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    username: Option<String>,
}

/// Status line and headers of a successful fetch.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}

/// Payload and metadata of a fetched file. Owned by the caller.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub data: Vec<u8>,
    pub response: ResponseMeta,
}

impl FetchResult {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Client for the file-browser service.
///
/// Clone is cheap and clones share the transport and the session: a login on
/// one clone is seen by every other.
#[derive(Clone)]
pub struct FileClient {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
    /// Current session snapshot. Readers clone the `Arc` and drop the lock
    /// before doing any I/O; login and logout replace it wholesale.
    session: Arc<RwLock<Option<Arc<SessionData>>>>,
}

impl FileClient {
    /// Create a client for `base_url` using the default `reqwest` transport
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::from_config(&Config {
            base_url: base_url.to_string(),
            ..Config::default()
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::with_transport(&config.base_url, Arc::new(transport))
    }

    /// Create a client that sends its requests through `transport`
    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: Self::parse_base_url(base_url)?,
            transport,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Parse the base URL, making sure it ends in `/` so endpoints join under it.
    fn parse_base_url(base_url: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidInput(format!("Invalid base URL {}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(ClientError::InvalidInput(format!(
                "Invalid base URL {}: not a hierarchical URL",
                base_url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidInput(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn endpoint_for_path(&self, endpoint: &str, remote_path: &str) -> Result<Url, ClientError> {
        let mut url = self.endpoint(endpoint)?;
        url.query_pairs_mut().append_pair(PATH_PARAM, remote_path);
        Ok(url)
    }

    /// Remote paths must be non-empty and free of control characters
    fn validate_path(path: &str) -> Result<&str, ClientError> {
        if path.trim().is_empty() {
            return Err(ClientError::InvalidInput("Path is required".to_string()));
        }
        if path.chars().any(char::is_control) {
            return Err(ClientError::InvalidInput(format!(
                "Path contains control characters: {:?}",
                path
            )));
        }
        Ok(path)
    }

    /// Check if response is successful, returning an error built from the body if not.
    fn check_response(response: HttpResponse) -> Result<HttpResponse, ClientError> {
        if response.status.is_success() {
            Ok(response)
        } else {
            let body = String::from_utf8_lossy(&response.body);
            Err(ClientError::from_status(response.status, &body))
        }
    }

    fn parse_json<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T, ClientError> {
        serde_json::from_slice(&response.body).map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to parse {} response: {}", what, e))
        })
    }

    // ===== Authentication =====

    /// Log in, replacing any current session on success.
    ///
    /// On failure the previous session, if any, is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let credentials = Credentials::new(username, password)?;
        self.authenticate(&credentials).await
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<(), ClientError> {
        let url = self.endpoint(LOGIN_PATH)?;
        debug!(username = %credentials.username(), "Sending login request");

        let request = HttpRequest::post(url)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .json(&LoginRequest {
                username: credentials.username(),
                password: credentials.password(),
            })
            .map_err(|e| ClientError::InvalidInput(format!("Failed to encode login request: {}", e)))?;

        let response = Self::check_response(self.transport.send(request).await?)?;

        let cookie = SessionCookie::from_headers(&response.headers).ok_or_else(|| {
            ClientError::InvalidResponse("Login succeeded but no session cookie was set".to_string())
        })?;

        // The body only echoes the username back; a missing or odd body is not fatal
        let login: LoginResponse = serde_json::from_slice(&response.body).unwrap_or_default();
        let username = login
            .username
            .unwrap_or_else(|| credentials.username().to_string());

        let data = SessionData::new(cookie.value, username, cookie.max_age);
        info!(
            username = %data.username,
            expires_in_minutes = data.minutes_until_expiry(),
            "Login successful"
        );
        *self.session.write().await = Some(Arc::new(data));
        Ok(())
    }

    /// End the session on the server and forget it locally.
    ///
    /// The local session is cleared even when the server call fails; that
    /// failure is still returned. Logging out without a session does nothing.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(session) = self.session.write().await.take() else {
            debug!("Logout without a session");
            return Ok(());
        };

        let url = self.endpoint(LOGOUT_PATH)?;
        match self.send_authenticated(HttpRequest::post(url), &session).await {
            Ok(_) => {
                info!(username = %session.username, "Logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Server logout failed; local session cleared anyway");
                Err(e)
            }
        }
    }

    /// True when there is a session that has not expired
    pub async fn is_authenticated(&self) -> bool {
        self.session().await.is_some()
    }

    /// Snapshot of the live session, or `None` if logged out or expired
    pub async fn session(&self) -> Option<Arc<SessionData>> {
        self.session
            .read()
            .await
            .as_ref()
            .filter(|s| !s.is_expired())
            .cloned()
    }

    /// Install a previously persisted session. Returns false (and installs
    /// nothing) if it has already expired.
    pub async fn restore_session(&self, data: SessionData) -> bool {
        if data.is_expired() {
            debug!(username = %data.username, "Not restoring expired session");
            return false;
        }
        debug!(username = %data.username, "Restored session");
        *self.session.write().await = Some(Arc::new(data));
        true
    }

    /// Drop the local session without telling the server
    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    async fn require_session(&self) -> Result<Arc<SessionData>, ClientError> {
        self.session().await.ok_or(ClientError::NotAuthenticated)
    }

    async fn send_authenticated(
        &self,
        request: HttpRequest,
        session: &SessionData,
    ) -> Result<HttpResponse, ClientError> {
        let cookie = HeaderValue::from_str(&session.cookie_header())
            .map_err(|_| ClientError::InvalidResponse("Session cookie is not a valid header value".to_string()))?;
        let request = request.header(header::COOKIE, cookie);
        let response = self.transport.send(request).await?;
        Self::check_response(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, ClientError> {
        let session = self.require_session().await?;
        let request = HttpRequest::get(url)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"));
        let response = self.send_authenticated(request, &session).await?;
        Self::parse_json(&response, what)
    }

    // ===== File Access =====

    /// Fetch the contents of a remote file.
    ///
    /// Requires a live session; without one this fails with
    /// `ClientError::NotAuthenticated` before anything is sent.
    pub async fn fetch(&self, path: &str) -> Result<FetchResult, ClientError> {
        let path = Self::validate_path(path)?;
        let session = self.require_session().await?;
        let url = self.endpoint_for_path(DOWNLOAD_PATH, path)?;

        debug!(path, "Fetching file");
        let response = self
            .send_authenticated(HttpRequest::get(url), &session)
            .await?;
        debug!(path, bytes = response.body.len(), status = %response.status, "File fetched");

        Ok(FetchResult {
            data: response.body,
            response: ResponseMeta {
                status: response.status,
                headers: response.headers,
            },
        })
    }

    /// Fetch a remote file and write it to `dest`, creating parent
    /// directories. Returns the number of bytes written.
    pub async fn download_to(&self, path: &str, dest: &Path) -> Result<u64, ClientError> {
        let result = self.fetch(path).await?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &result.data).await?;
        debug!(path, dest = %dest.display(), bytes = result.len(), "Download written");
        Ok(result.len() as u64)
    }

    /// List a remote directory. An empty path lists the root.
    pub async fn list(&self, path: &str) -> Result<DirectoryListing, ClientError> {
        let path = if path.trim().is_empty() {
            ROOT_PATH
        } else {
            Self::validate_path(path)?
        };
        let url = self.endpoint_for_path(FILES_PATH, path)?;
        debug!(path, "Listing directory");
        self.get_json(url, "directory listing").await
    }

    pub async fn file_info(&self, path: &str) -> Result<FileInfo, ClientError> {
        let path = Self::validate_path(path)?;
        let url = self.endpoint_for_path(FILE_INFO_PATH, path)?;
        self.get_json(url, "file info").await
    }

    /// Ask the server who the session belongs to
    pub async fn current_user(&self) -> Result<UserInfo, ClientError> {
        let url = self.endpoint(USER_PATH)?;
        self.get_json(url, "user").await
    }

    /// Service health check. Needs no session.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = self.endpoint(HEALTH_PATH)?;
        let response = Self::check_response(self.transport.send(HttpRequest::get(url)).await?)?;
        Self::parse_json(&response, "health")
    }
}
