//! Data models for the file-browser service.
//!
//! - `FileEntry`, `DirectoryListing`: directory listings
//! - `FileInfo`: metadata for a single path
//! - `UserInfo`, `HealthStatus`: account and service status

pub mod file;
pub mod status;

pub use file::{DirectoryListing, EntryType, FileEntry, FileInfo};
pub use status::{HealthStatus, UserInfo};
