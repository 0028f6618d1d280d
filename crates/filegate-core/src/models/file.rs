use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// One row of a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Size in bytes; the server leaves this null for directories.
    pub size: Option<u64>,
    pub modified: DateTime<Utc>,
    /// Path relative to the served root, usable as input to `fetch`.
    pub path: String,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryListing {
    pub path: String,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl DirectoryListing {
    pub fn directories(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|e| e.is_dir())
    }

    pub fn regular_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|e| !e.is_dir())
    }

    /// Sum of the sizes of the regular files in this listing
    pub fn total_size(&self) -> u64 {
        self.regular_files().filter_map(|e| e.size).sum()
    }
}

/// Metadata for a single path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub created: Option<DateTime<Utc>>,
    pub path: String,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}
