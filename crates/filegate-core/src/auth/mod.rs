//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Credentials`: a validated username/password pair for one login call
//! - `SessionData`: the session cookie issued by the server, with expiry
//! - `SessionStore`: persistence of the session between process runs
//! - `CredentialStore`: Secure OS-level credential storage via keyring
//!
//! Sessions expire after 24 hours unless the server says otherwise.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialStore, Credentials, KeychainError};
pub use session::{SessionCookie, SessionData, SessionStore, SESSION_COOKIE_NAME};
