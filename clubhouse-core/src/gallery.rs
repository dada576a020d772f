//! Photo gallery rows.
//!
//! The image binaries themselves live in object storage; these types only
//! cover the album/photo table rows the app manages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryAlbum {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPhoto {
    pub id: Uuid,
    pub album_id: Uuid,
    /// Public URL served from object storage.
    pub url: String,
    /// Storage key, kept so deleting the row can also delete the object.
    pub storage_path: Option<String>,
    pub caption: Option<String>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when registering an uploaded photo.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoDraft {
    pub url: String,
    pub storage_path: Option<String>,
    pub caption: Option<String>,
    pub uploaded_by: Option<Uuid>,
}
