//! Cached value types
//!
//! The concrete payload each cache category stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::SizeEstimate;

/// Fixed overhead charged per struct on top of its variable-length fields.
const STRUCT_OVERHEAD: usize = 64;

// == File Metadata ==
/// Provider-reported description of a file or folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub is_folder: bool,
    /// Identifier of the storage provider the entry came from
    pub provider: String,
}

impl FileMetadata {
    pub fn file(provider: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id: path.clone(),
            name,
            path,
            size,
            mime_type: None,
            modified_at: Utc::now(),
            is_folder: false,
            provider: provider.into(),
        }
    }

    pub fn folder(provider: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            is_folder: true,
            ..Self::file(provider, path, 0)
        }
    }
}

impl SizeEstimate for FileMetadata {
    fn estimated_size(&self) -> usize {
        STRUCT_OVERHEAD
            + self.id.len()
            + self.name.len()
            + self.path.len()
            + self.provider.len()
            + self.mime_type.estimated_size()
    }
}

// == ThumbnailImage ==
/// Rendered preview image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

impl SizeEstimate for ThumbnailImage {
    fn estimated_size(&self) -> usize {
        self.data.len() + self.mime_type.len()
    }
}

// == Content Blob ==
/// Downloaded file content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlob {
    pub data: Vec<u8>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl SizeEstimate for ContentBlob {
    fn estimated_size(&self) -> usize {
        self.data.len() + self.mime_type.estimated_size()
    }
}

// == Folder Listing ==
/// One page of a folder's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderListing {
    pub path: String,
    pub items: Vec<FileMetadata>,
    /// Provider continuation token for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl SizeEstimate for FolderListing {
    fn estimated_size(&self) -> usize {
        self.path.len()
            + self.next_cursor.estimated_size()
            + self.items.iter().map(SizeEstimate::estimated_size).sum::<usize>()
    }
}

// == Search Results ==
/// Matches returned for a search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub items: Vec<FileMetadata>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl SizeEstimate for SearchResults {
    fn estimated_size(&self) -> usize {
        self.query.len() + self.items.iter().map(SizeEstimate::estimated_size).sum::<usize>()
    }
}
