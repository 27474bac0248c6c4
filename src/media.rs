//! Media library collaborator interface.
//!
//! The rendering core never touches storage directly. Everything it needs
//! from the host CMS goes through [`MediaLibrary`]: attachment lookup, stored
//! size-variant metadata, the upload directory, alt text, and the featured
//! image of a page. Request facts (HTTPS, host, current page) are plain data
//! in [`RequestInfo`].
//!
//! [`JsonLibrary`] is a file-backed implementation used by the `rwd` binary
//! and the test suite:
//!
//! ```json
//! {
//!   "upload": { "base_path": "/srv/uploads", "base_url": "http://example.com/uploads" },
//!   "attachments": [
//!     {
//!       "id": 12,
//!       "mime_type": "image/jpeg",
//!       "file": "/srv/uploads/2024/05/dawn.jpg",
//!       "alt": "Dawn over the lake",
//!       "metadata": {
//!         "width": 2400, "height": 1600, "file": "2024/05/dawn.jpg",
//!         "sizes": { "hero": { "width": 1200, "height": 800, "file": "dawn-1200x800.jpg" } }
//!       }
//!     }
//!   ],
//!   "featured": { "5": 12 }
//! }
//! ```

use crate::types::{Attachment, AttachmentId, AttachmentMeta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where uploads live on disk and where they are served from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadDir {
    pub base_path: PathBuf,
    pub base_url: String,
}

impl UploadDir {
    /// Path of `file` relative to the upload base, with `/` separators.
    ///
    /// Files outside the upload base keep their own path, minus any root.
    pub fn relative_path(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.base_path).unwrap_or(file);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Facts about the request being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// Served over HTTPS.
    pub secure: bool,
    /// `Host` of the current request, optionally with a port.
    pub host: Option<String>,
    /// Page whose featured image backs [`crate::image::AttachmentRef::Featured`].
    pub page_id: Option<u64>,
}

/// Lookups the rendering core needs from the host CMS.
pub trait MediaLibrary {
    /// Load an attachment. `None` when the id does not name an attachment.
    fn load_attachment(&self, id: AttachmentId) -> Option<Attachment>;

    /// Stored size-variant metadata, `None` when the library has none.
    fn attachment_metadata(&self, id: AttachmentId) -> Option<AttachmentMeta>;

    fn upload_dir(&self) -> UploadDir;

    /// Raw alt text. May contain markup; callers clean it.
    fn alt_text(&self, id: AttachmentId) -> String;

    fn featured_attachment_id(&self, page_id: u64) -> Option<AttachmentId>;
}

/// One attachment record in a [`JsonLibrary`] file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoredAttachment {
    pub id: AttachmentId,
    pub mime_type: String,
    pub file: PathBuf,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub metadata: Option<AttachmentMeta>,
}

impl StoredAttachment {
    fn attachment(&self) -> Attachment {
        Attachment {
            id: self.id,
            mime_type: self.mime_type.clone(),
            file: self.file.clone(),
        }
    }
}

/// Media library loaded from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonLibrary {
    pub upload: UploadDir,
    #[serde(default)]
    pub attachments: Vec<StoredAttachment>,
    /// Page id → featured attachment id.
    #[serde(default)]
    pub featured: BTreeMap<u64, AttachmentId>,
}

impl JsonLibrary {
    pub fn new(upload: UploadDir) -> Self {
        Self {
            upload,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_json(json: &str) -> Result<Self, LibraryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_attachment(mut self, attachment: StoredAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_featured(mut self, page_id: u64, attachment_id: AttachmentId) -> Self {
        self.featured.insert(page_id, attachment_id);
        self
    }

    fn find(&self, id: AttachmentId) -> Option<&StoredAttachment> {
        self.attachments.iter().find(|a| a.id == id)
    }
}

impl MediaLibrary for JsonLibrary {
    fn load_attachment(&self, id: AttachmentId) -> Option<Attachment> {
        self.find(id).map(StoredAttachment::attachment)
    }

    fn attachment_metadata(&self, id: AttachmentId) -> Option<AttachmentMeta> {
        self.find(id).and_then(|a| a.metadata.clone())
    }

    fn upload_dir(&self) -> UploadDir {
        self.upload.clone()
    }

    fn alt_text(&self, id: AttachmentId) -> String {
        self.find(id).map(|a| a.alt.clone()).unwrap_or_default()
    }

    fn featured_attachment_id(&self, page_id: u64) -> Option<AttachmentId> {
        self.featured.get(&page_id).copied()
    }
}
