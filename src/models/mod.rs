//! Models
//!
//! Cached value types per category, plus the DTOs used by the inspection API.

pub mod files;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use files::{ContentBlob, FileMetadata, FolderListing, SearchResults, ThumbnailImage};
pub use requests::{validate_key, InvalidateRequest, SetRequest, MAX_KEY_LENGTH};
pub use responses::{DeleteResponse, GetResponse, HealthResponse, RemovedResponse, SetResponse};
