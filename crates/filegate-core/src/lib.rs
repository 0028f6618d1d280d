//! Core library for filegate.
//!
//! This crate provides the `FileClient` for authenticating against the
//! file-browser service and fetching remote files, along with session
//! persistence, OS keychain credential storage and configuration loading.
//!
//! Network transport sits behind the [`HttpTransport`] trait; the default
//! implementation uses `reqwest`.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{
    ClientError, ErrorKind, FetchResult, FileClient, HttpRequest, HttpResponse, HttpTransport,
    ReqwestTransport, ResponseMeta, TransportError,
};
pub use auth::{CredentialStore, Credentials, KeychainError, SessionData, SessionStore};
pub use config::Config;
pub use models::{DirectoryListing, EntryType, FileEntry, FileInfo, HealthStatus, UserInfo};
