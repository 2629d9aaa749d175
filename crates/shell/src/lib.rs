//! Ember Shell - a tabbed browser shell that works offline
//!
//! Ties the core components together: the persistent record store backs
//! bookmark, history, and download managers; the session state machine
//! tracks tabs; the cache controller intercepts content requests; and the
//! event bus carries state changes to whatever UI is attached.

pub mod bookmarks;
pub mod config;
pub mod downloads;
pub mod history;
pub mod models;
pub mod shell;

// Re-export the composition root and common types
pub use bookmarks::BookmarkManager;
pub use config::ShellConfig;
pub use downloads::{DownloadHandle, DownloadManager, DownloadSource, DownloadStream, HttpDownloadSource};
pub use history::HistoryManager;
pub use models::{Bookmark, DownloadRecord, DownloadStatus, HistoryEntry};
pub use shell::{Shell, ShellError};
