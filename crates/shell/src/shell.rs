//! Composition root: wires the store, session, managers, and cache
//! controller together behind the calls the UI layer makes.

use std::sync::Arc;

use thiserror::Error;

use ember_events::EventBus;
use ember_offline::{ActivationError, CacheController, ClientSurface, Fetch};
use ember_session::{EntryPatch, SessionState};
use ember_storage::{PersistentStore, StorageError};

use crate::bookmarks::BookmarkManager;
use crate::config::ShellConfig;
use crate::downloads::{DownloadManager, DownloadSource};
use crate::history::HistoryManager;
use crate::models::{Bookmark, HistoryEntry};

/// Fatal startup failures. Everything after bootstrap surfaces through
/// record status fields or served documents instead.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("activation error: {0}")]
    Activation(#[from] ActivationError),
}

pub struct Shell {
    config: ShellConfig,
    bus: Arc<EventBus>,
    session: SessionState,
    bookmarks: BookmarkManager,
    history: HistoryManager,
    downloads: DownloadManager,
    controller: Arc<CacheController>,
}

impl Shell {
    /// Open the store, install and activate the cache controller, and start
    /// the session with one fresh tab.
    ///
    /// Storage open failures and static-generation seeding failures are
    /// fatal here and surfaced to the caller.
    pub async fn bootstrap(
        config: ShellConfig,
        fetcher: Arc<dyn Fetch>,
        source: Arc<dyn DownloadSource>,
        surface: Arc<dyn ClientSurface>,
    ) -> Result<Self, ShellError> {
        let store = Arc::new(PersistentStore::open(&config.data_dir).await?);
        let bus = Arc::new(EventBus::new());

        let controller = Arc::new(CacheController::new(config.origin.clone(), fetcher, surface));
        controller.install(&config.static_manifest).await?;
        controller.activate();

        let mut session = SessionState::new(Arc::clone(&bus));
        session.create_entry(Some(&config.new_tab_location));

        let bookmarks = BookmarkManager::new(Arc::clone(&store), Arc::clone(&bus));
        let history = HistoryManager::new(Arc::clone(&store), Arc::clone(&bus));
        let downloads = DownloadManager::new(Arc::clone(&store), Arc::clone(&bus), source);

        log::info!(
            "shell ready: origin {}, store at {}",
            config.origin,
            config.data_dir.display()
        );
        Ok(Self {
            config,
            bus,
            session,
            bookmarks,
            history,
            downloads,
            controller,
        })
    }

    /// Apply a location typed into the URL input to the active tab and
    /// signal a content load
    pub fn navigate(&mut self, location: &str) {
        self.session.navigate(location);
    }

    /// Called by the content surface once a page has loaded: updates the
    /// active tab's display metadata and records the visit.
    pub async fn page_loaded(&mut self, url: &str, title: &str, favicon: &str) -> Result<(), ShellError> {
        self.session.update_active(EntryPatch {
            location: Some(url.to_string()),
            title: Some(title.to_string()),
            icon: Some(favicon.to_string()),
        });
        self.history.record_visit(url, title, favicon).await?;
        Ok(())
    }

    /// Bookmark-button semantics for the active tab. Returns the new
    /// bookmarked state, or `None` when no tab is active.
    pub async fn toggle_bookmark(&self) -> Result<Option<bool>, ShellError> {
        let Some(active) = self.session.active() else {
            return Ok(None);
        };
        let (url, title, icon) = (active.location.clone(), active.title.clone(), active.icon.clone());
        Ok(Some(self.bookmarks.toggle(&url, &title, &icon).await?))
    }

    /// Whether the active tab's location is bookmarked
    pub async fn active_is_bookmarked(&self) -> Result<bool, ShellError> {
        match self.session.active() {
            Some(active) => Ok(self.bookmarks.is_bookmarked(&active.location).await?),
            None => Ok(false),
        }
    }

    /// Bookmarks shown on the bookmarks page
    pub async fn bookmarks_page(&self) -> Result<Vec<Bookmark>, ShellError> {
        Ok(self.bookmarks.all().await?)
    }

    /// Entries shown on the history page, newest first, capped by the
    /// configured limit
    pub async fn history_page(&self) -> Result<Vec<HistoryEntry>, ShellError> {
        Ok(self.history.recent(self.config.history_limit).await?)
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn bookmarks(&self) -> &BookmarkManager {
        &self.bookmarks
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn downloads(&self) -> &DownloadManager {
        &self.downloads
    }

    pub fn controller(&self) -> &Arc<CacheController> {
        &self.controller
    }
}
