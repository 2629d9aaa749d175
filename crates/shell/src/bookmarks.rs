//! Bookmark management over the persistent store
//!
//! Records live in the `bookmarks` collection; every mutation is announced
//! on the event bus for the bookmark bar and pages to pick up.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use ember_events::{Event, EventBus};
use ember_storage::{Collection, PersistentStore, Record, StorageResult};

use crate::models::Bookmark;

pub struct BookmarkManager {
    store: Arc<PersistentStore>,
    bus: Arc<EventBus>,
}

impl BookmarkManager {
    pub fn new(store: Arc<PersistentStore>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Store a new bookmark for `url`
    pub async fn add(&self, url: &str, title: &str, favicon: &str) -> StorageResult<Bookmark> {
        let bookmark = Bookmark::new(url, title, favicon);
        let record = Record::from_serializable(bookmark.id.to_string(), &bookmark)?;
        self.store.put(Collection::Bookmarks, record).await?;

        log::info!("added bookmark {} ({})", bookmark.title, bookmark.url);
        self.bus.publish(Event::BookmarkAdded {
            id: bookmark.id,
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
        });
        Ok(bookmark)
    }

    /// Delete a bookmark by id. Returns whether a record was removed; the
    /// removal event fires only when one existed.
    pub async fn remove(&self, id: Uuid) -> StorageResult<bool> {
        let Some(record) = self.store.get(Collection::Bookmarks, &id.to_string()).await else {
            return Ok(false);
        };
        let bookmark: Bookmark = record.deserialize()?;
        self.store.remove(Collection::Bookmarks, &id.to_string()).await?;

        self.bus.publish(Event::BookmarkRemoved {
            id: bookmark.id,
            url: bookmark.url,
        });
        Ok(true)
    }

    /// Bookmark-button semantics: remove an existing bookmark for `url`,
    /// otherwise add one. Returns whether the page is now bookmarked.
    pub async fn toggle(&self, url: &str, title: &str, favicon: &str) -> StorageResult<bool> {
        match self.find_by_url(url).await? {
            Some(existing) => {
                self.remove(existing.id).await?;
                Ok(false)
            }
            None => {
                self.add(url, title, favicon).await?;
                Ok(true)
            }
        }
    }

    /// The first bookmark stored for `url`, if any
    pub async fn find_by_url(&self, url: &str) -> StorageResult<Option<Bookmark>> {
        let hits = self
            .store
            .find_by(Collection::Bookmarks, "url", &Value::String(url.to_string()))
            .await;
        hits.first().map(Record::deserialize).transpose()
    }

    pub async fn is_bookmarked(&self, url: &str) -> StorageResult<bool> {
        Ok(self.find_by_url(url).await?.is_some())
    }

    pub async fn all(&self) -> StorageResult<Vec<Bookmark>> {
        self.store
            .list(Collection::Bookmarks)
            .await
            .iter()
            .map(Record::deserialize)
            .collect()
    }
}
