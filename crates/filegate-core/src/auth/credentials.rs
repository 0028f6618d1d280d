use std::fmt;

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

use crate::api::ClientError;

const SERVICE_NAME: &str = "filegate";

/// Username and password for a single login call.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Both fields must be non-empty; the username may not be blank.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ClientError> {
        let username = username.into();
        let password = password.into();

        if username.trim().is_empty() {
            return Err(ClientError::InvalidInput("Username is required".to_string()));
        }
        if password.is_empty() {
            return Err(ClientError::InvalidInput("Password is required".to_string()));
        }

        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Why a keychain lookup or update did not go through.
#[derive(Error, Debug)]
pub enum KeychainError {
    #[error("No password stored for {0}")]
    NotFound(String),

    /// The backend accepted the password but a fresh lookup cannot see it,
    /// as happens when no OS keychain is available and keyring falls back
    /// to its in-memory store.
    #[error("Keychain did not keep the password for {0}")]
    NotPersisted(String),

    #[error("Keychain unavailable: {0}")]
    Unavailable(String),

    #[error("Stored credentials for {username} are unusable: {reason}")]
    Invalid { username: String, reason: String },
}

impl KeychainError {
    fn from_keyring(username: &str, err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => KeychainError::NotFound(username.to_string()),
            keyring::Error::NoStorageAccess(e) | keyring::Error::PlatformFailure(e) => {
                KeychainError::Unavailable(e.to_string())
            }
            other => KeychainError::Invalid {
                username: username.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Passwords kept in the OS keychain, one entry per username.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::with_service(SERVICE_NAME)
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep entries under a service name other than `filegate`
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, username: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service, username).map_err(|e| KeychainError::from_keyring(username, e))
    }

    /// Save the password, then read it back through a new entry so a
    /// backend that drops it is reported instead of passing silently.
    pub fn store(&self, credentials: &Credentials) -> Result<(), KeychainError> {
        let username = credentials.username();
        self.entry(username)?
            .set_password(credentials.password())
            .map_err(|e| KeychainError::from_keyring(username, e))?;

        match self.get_password(username) {
            Ok(stored) if stored == credentials.password() => {
                debug!(username, "Password saved to keychain");
                Ok(())
            }
            Ok(_) | Err(KeychainError::NotFound(_)) => {
                Err(KeychainError::NotPersisted(username.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn get_password(&self, username: &str) -> Result<String, KeychainError> {
        self.entry(username)?
            .get_password()
            .map_err(|e| KeychainError::from_keyring(username, e))
    }

    /// Stored credentials for `username`, ready for a login call
    pub fn load(&self, username: &str) -> Result<Credentials, KeychainError> {
        let password = self.get_password(username)?;
        Credentials::new(username, password).map_err(|e| KeychainError::Invalid {
            username: username.to_string(),
            reason: e.to_string(),
        })
    }

    /// Remove the stored password. Returns `false` if there was none.
    pub fn delete(&self, username: &str) -> Result<bool, KeychainError> {
        match self.entry(username)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(KeychainError::from_keyring(username, e)),
        }
    }

    pub fn has_credentials(&self, username: &str) -> bool {
        self.get_password(username).is_ok()
    }
}
