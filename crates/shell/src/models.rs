//! Record shapes exported to UI collaborators
//!
//! These are the typed views of what the store persists; field names in the
//! serialized form follow the export shape consumed by the shell pages
//! (`folderId`, `totalBytes`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Folder id bookmarks land in by default
pub const ROOT_FOLDER: &str = "root";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub favicon: String,
    pub folder_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(url: &str, title: &str, favicon: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            title: title.to_string(),
            favicon: favicon.to_string(),
            folder_id: ROOT_FOLDER.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub favicon: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(url: &str, title: &str, favicon: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            title: title.to_string(),
            favicon: favicon.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Download lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub status: DownloadStatus,
    /// Percentage, 0-100
    pub progress: u8,
    pub total_bytes: u64,
    pub received_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadRecord {
    pub fn new(url: &str, filename: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            filename: filename.to_string(),
            timestamp: Utc::now(),
            status: DownloadStatus::InProgress,
            progress: 0,
            total_bytes: 0,
            received_bytes: 0,
            error: None,
        }
    }

    /// Account for one received chunk. Progress stays at 0 when the total
    /// size is unknown.
    pub fn apply_chunk(&mut self, len: u64) {
        self.received_bytes += len;
        if self.total_bytes > 0 {
            self.progress = ((self.received_bytes * 100) / self.total_bytes).min(100) as u8;
        }
    }

    pub fn mark_completed(&mut self) {
        self.status = DownloadStatus::Completed;
        self.progress = 100;
        self.error = None;
    }

    pub fn mark_failed(&mut self, message: &str) {
        self.status = DownloadStatus::Failed;
        self.error = Some(message.to_string());
    }

    pub fn is_finished(&self) -> bool {
        self.status != DownloadStatus::InProgress
    }
}
