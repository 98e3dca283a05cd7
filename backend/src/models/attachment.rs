//! Attachment model shared by timeline events and weekly reports.

use serde::{Deserialize, Serialize};

/// A stored file referenced from an event or report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// Result of a file upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// URL served by this backend
    pub url: String,
    /// Storage path relative to the upload root
    pub path: String,
    /// Display name derived from project title and caption
    pub name: String,
    pub original_name: String,
    pub size: usize,
    pub content_type: String,
    /// Folder the attachment is filed under
    pub folder: String,
}
