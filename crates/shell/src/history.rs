//! Navigation history over the persistent store
//!
//! Visits are recorded as tabs load content; internal shell pages are never
//! recorded. Listing sorts by visit time, newest first.

use std::sync::Arc;

use ember_events::{Event, EventBus};
use ember_offline::pages;
use ember_storage::{Collection, PersistentStore, Record, StorageResult};

use crate::models::HistoryEntry;

/// Entries returned by [`HistoryManager::recent`] when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

pub struct HistoryManager {
    store: Arc<PersistentStore>,
    bus: Arc<EventBus>,
}

impl HistoryManager {
    pub fn new(store: Arc<PersistentStore>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Record a page visit. Internal shell locations are not recorded and
    /// yield `None`.
    pub async fn record_visit(
        &self,
        url: &str,
        title: &str,
        favicon: &str,
    ) -> StorageResult<Option<HistoryEntry>> {
        if pages::is_internal_location(url) {
            return Ok(None);
        }

        let entry = HistoryEntry::new(url, title, favicon);
        let record = Record::from_serializable(entry.id.to_string(), &entry)?;
        self.store.put(Collection::History, record).await?;

        self.bus.publish(Event::HistoryRecorded {
            id: entry.id,
            url: entry.url.clone(),
        });
        Ok(Some(entry))
    }

    /// The most recent entries, newest first
    pub async fn recent(&self, limit: usize) -> StorageResult<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> = self
            .store
            .list(Collection::History)
            .await
            .iter()
            .map(Record::deserialize)
            .collect::<StorageResult<_>>()?;

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Case-insensitive substring search over titles and urls
    pub async fn search(&self, query: &str) -> StorageResult<Vec<HistoryEntry>> {
        let needle = query.to_lowercase();
        let entries: Vec<HistoryEntry> = self
            .store
            .list(Collection::History)
            .await
            .iter()
            .map(Record::deserialize)
            .collect::<StorageResult<_>>()?;

        Ok(entries
            .into_iter()
            .filter(|entry| {
                entry.title.to_lowercase().contains(&needle)
                    || entry.url.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Remove every history entry
    pub async fn clear(&self) -> StorageResult<()> {
        for record in self.store.list(Collection::History).await {
            self.store.remove(Collection::History, &record.id).await?;
        }
        log::info!("cleared history");
        self.bus.publish(Event::HistoryCleared);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn manager(dir: &std::path::Path) -> HistoryManager {
        let store = Arc::new(PersistentStore::open(dir).await.unwrap());
        HistoryManager::new(store, Arc::new(EventBus::new()))
    }

    #[tokio::test]
    async fn test_visits_are_recorded_and_listed_newest_first() {
        let dir = tempdir().unwrap();
        let history = manager(dir.path()).await;

        history.record_visit("https://one.example", "One", "").await.unwrap();
        history.record_visit("https://two.example", "Two", "").await.unwrap();
        history.record_visit("https://three.example", "Three", "").await.unwrap();

        let recent = history.recent(DEFAULT_HISTORY_LIMIT).await.unwrap();
        let urls: Vec<&str> = recent.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://three.example", "https://two.example", "https://one.example"]);
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let dir = tempdir().unwrap();
        let history = manager(dir.path()).await;

        for i in 0..5 {
            history
                .record_visit(&format!("https://example.com/{}", i), "Page", "")
                .await
                .unwrap();
        }
        assert_eq!(history.recent(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_internal_pages_are_not_recorded() {
        let dir = tempdir().unwrap();
        let history = manager(dir.path()).await;

        assert!(history
            .record_visit("ember:newtab", "New Tab", "")
            .await
            .unwrap()
            .is_none());
        assert!(history
            .record_visit("https://shell.example/ember-pages/settings.html", "Settings", "")
            .await
            .unwrap()
            .is_none());
        assert!(history.recent(DEFAULT_HISTORY_LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_title_and_url() {
        let dir = tempdir().unwrap();
        let history = manager(dir.path()).await;

        history.record_visit("https://rust-lang.org", "Rust", "").await.unwrap();
        history.record_visit("https://example.com", "A page about crabs", "").await.unwrap();

        assert_eq!(history.search("RUST").await.unwrap().len(), 1);
        assert_eq!(history.search("crabs").await.unwrap().len(), 1);
        assert!(history.search("python").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let dir = tempdir().unwrap();
        let history = manager(dir.path()).await;

        history.record_visit("https://example.com", "Example", "").await.unwrap();
        history.clear().await.unwrap();
        assert!(history.recent(DEFAULT_HISTORY_LIMIT).await.unwrap().is_empty());
    }
}
