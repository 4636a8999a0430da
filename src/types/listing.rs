//! Object listing types shared between the store seam and the browser.

use serde::{Deserialize, Serialize};

/// One object returned by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    /// RFC 3339 timestamp when the store reports one.
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl ObjectSummary {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
        }
    }

    /// Folders are purely syntactic: a key ending in `/`.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    /// Present when more pages follow.
    pub next_continuation_token: Option<String>,
}

/// Entry rendered in a folder view, keyed relative to the folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

/// Direct children of one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderListing {
    /// Sorted, each ending in `/`.
    pub folders: Vec<ListingEntry>,
    /// In store order.
    pub files: Vec<ListingEntry>,
}
