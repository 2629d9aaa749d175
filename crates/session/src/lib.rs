//! Tab session management for the Ember browser shell
//!
//! Maintains an ordered set of session entries (tabs) with exactly one
//! active entry, and publishes the "content should load" signal on the
//! event bus whenever activation changes. Mutations are expected to run on
//! a single control thread; concurrent mutation must be serialized by the
//! caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ember_events::{Event, EventBus};

/// Location loaded into a fresh entry when none is given
pub const NEW_TAB_LOCATION: &str = "ember:newtab";

/// Title shown until the content surface reports a real one
pub const DEFAULT_TITLE: &str = "New Tab";

/// Icon shown until the content surface reports a real one
pub const DEFAULT_ICON: &str = "/assets/icons/ember-48.png";

/// One logical tab: a location, display metadata, and the active flag.
/// Entries are owned exclusively by [`SessionState`]; order in the session
/// is display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: Uuid,
    pub location: String,
    pub title: String,
    pub icon: String,
    pub active: bool,
}

impl SessionEntry {
    fn new(location: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            location: location.to_string(),
            title: DEFAULT_TITLE.to_string(),
            icon: DEFAULT_ICON.to_string(),
            active: false,
        }
    }
}

/// Partial update merged into the active entry
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub location: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
}

/// Ordered, single-active tab session
pub struct SessionState {
    entries: Vec<SessionEntry>,
    bus: Arc<EventBus>,
}

impl SessionState {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { entries: Vec::new(), bus }
    }

    /// Append a new entry and activate it, deactivating the prior active
    /// entry. The default location is the fixed new-tab location.
    pub fn create_entry(&mut self, location: Option<&str>) -> &SessionEntry {
        if let Some(current) = self.entries.iter_mut().find(|e| e.active) {
            current.active = false;
        }

        let mut entry = SessionEntry::new(location.unwrap_or(NEW_TAB_LOCATION));
        entry.active = true;
        log::debug!("created tab {} -> {}", entry.id, entry.location);
        self.bus.publish(Event::TabCreated {
            id: entry.id,
            location: entry.location.clone(),
        });
        self.bus.publish(Event::TabActivated {
            id: entry.id,
            location: entry.location.clone(),
        });
        self.entries.push(entry);

        self.check_active_invariant();
        let last = self.entries.len() - 1;
        &self.entries[last]
    }

    /// Activate the entry with `id` and signal a content load for it.
    /// Unknown ids are a silent no-op.
    pub fn activate(&mut self, id: Uuid) {
        if !self.entries.iter().any(|e| e.id == id) {
            return;
        }

        let mut load = None;
        for entry in &mut self.entries {
            entry.active = entry.id == id;
            if entry.active {
                load = Some((entry.id, entry.location.clone()));
            }
        }
        if let Some((id, location)) = load {
            self.bus.publish(Event::TabActivated { id, location });
        }
        self.check_active_invariant();
    }

    /// Remove the entry with `id`. Closing the active entry activates the
    /// entry before it in display order (or the new first entry); closing
    /// the only entry creates and activates a fresh default entry, so the
    /// session never ends up with zero entries.
    pub fn close(&mut self, id: Uuid) {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return;
        };

        let removed = self.entries.remove(index);
        log::debug!("closed tab {}", removed.id);
        self.bus.publish(Event::TabClosed { id: removed.id });

        if removed.active {
            if self.entries.is_empty() {
                self.create_entry(None);
            } else {
                let next = index.saturating_sub(1);
                self.entries[next].active = true;
                self.bus.publish(Event::TabActivated {
                    id: self.entries[next].id,
                    location: self.entries[next].location.clone(),
                });
            }
        }
        self.check_active_invariant();
    }

    /// Reposition `moved_id` immediately before or after `target_id` in
    /// display order. A no-op if either id is unknown or the two are equal.
    pub fn reorder(&mut self, moved_id: Uuid, target_id: Uuid, before_target: bool) {
        if moved_id == target_id {
            return;
        }
        let Some(from) = self.entries.iter().position(|e| e.id == moved_id) else {
            return;
        };
        if !self.entries.iter().any(|e| e.id == target_id) {
            return;
        }

        let entry = self.entries.remove(from);
        let Some(target) = self.entries.iter().position(|e| e.id == target_id) else {
            // Target vanished between checks; put the entry back untouched.
            self.entries.insert(from, entry);
            return;
        };
        let insert_at = if before_target { target } else { target + 1 };
        self.entries.insert(insert_at, entry);
        self.check_active_invariant();
    }

    /// Merge a partial update into the active entry. A no-op when no entry
    /// is active.
    pub fn update_active(&mut self, patch: EntryPatch) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.active) else {
            return;
        };

        if let Some(location) = patch.location {
            entry.location = location;
        }
        if let Some(title) = patch.title {
            entry.title = title;
        }
        if let Some(icon) = patch.icon {
            entry.icon = icon;
        }
        self.bus.publish(Event::TabUpdated { id: entry.id });
    }

    /// Apply a location typed into the URL input to the active entry and
    /// signal a content load for it.
    pub fn navigate(&mut self, location: &str) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.active) else {
            return;
        };
        entry.location = location.to_string();
        let (id, location) = (entry.id, entry.location.clone());
        self.bus.publish(Event::TabActivated { id, location });
    }

    /// Entries in display order
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    /// The active entry, if any
    pub fn active(&self) -> Option<&SessionEntry> {
        self.entries.iter().find(|e| e.active)
    }

    pub fn get(&self, id: Uuid) -> Option<&SessionEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// At most one entry may be active at any time; zero is legal only
    /// transiently during teardown.
    fn check_active_invariant(&self) {
        let active = self.entries.iter().filter(|e| e.active).count();
        debug_assert!(active <= 1, "{} entries marked active", active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_events::Topic;
    use parking_lot::Mutex;

    fn session() -> SessionState {
        SessionState::new(Arc::new(EventBus::new()))
    }

    fn active_count(session: &SessionState) -> usize {
        session.entries().iter().filter(|e| e.active).count()
    }

    #[test]
    fn test_create_entry_defaults() {
        let mut session = session();
        let entry = session.create_entry(None);

        assert_eq!(entry.location, NEW_TAB_LOCATION);
        assert_eq!(entry.title, DEFAULT_TITLE);
        assert!(entry.active);
    }

    #[test]
    fn test_single_active_across_creates_and_closes() {
        let mut session = session();
        let a = session.create_entry(None).id;
        let b = session.create_entry(Some("https://example.com")).id;
        let c = session.create_entry(None).id;

        assert_eq!(active_count(&session), 1);
        session.activate(a);
        assert_eq!(active_count(&session), 1);
        session.close(b);
        assert_eq!(active_count(&session), 1);
        session.close(a);
        session.close(c);

        // Closing everything leaves one fresh active entry, never zero.
        assert_eq!(session.len(), 1);
        assert_eq!(active_count(&session), 1);
    }

    #[test]
    fn test_close_middle_preserves_first_and_third() {
        let mut session = session();
        let first = session.create_entry(Some("https://one.example")).id;
        let middle = session.create_entry(Some("https://two.example")).id;
        let third = session.create_entry(Some("https://three.example")).id;

        session.close(middle);

        let ids: Vec<Uuid> = session.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first, third]);
        // The closed entry was not active, so the active entry is unchanged.
        assert_eq!(session.active().map(|e| e.id), Some(third));
    }

    #[test]
    fn test_closing_active_activates_previous_in_order() {
        let mut session = session();
        let first = session.create_entry(None).id;
        let second = session.create_entry(None).id;
        let third = session.create_entry(None).id;

        session.activate(second);
        session.close(second);
        assert_eq!(session.active().map(|e| e.id), Some(first));

        session.activate(first);
        session.close(first);
        // The closed entry was first in order; the new first entry wins.
        assert_eq!(session.active().map(|e| e.id), Some(third));
    }

    #[test]
    fn test_closing_only_entry_creates_fresh_default() {
        let mut session = session();
        let only = session.create_entry(Some("https://example.com")).id;

        session.close(only);

        assert_eq!(session.len(), 1);
        let fresh = session.active().unwrap();
        assert_ne!(fresh.id, only);
        assert_eq!(fresh.location, NEW_TAB_LOCATION);
    }

    #[test]
    fn test_activate_unknown_id_is_noop() {
        let mut session = session();
        let entry = session.create_entry(None).id;

        session.activate(Uuid::new_v4());
        assert_eq!(session.active().map(|e| e.id), Some(entry));
    }

    #[test]
    fn test_reorder_before_and_after() {
        let mut session = session();
        let a = session.create_entry(None).id;
        let b = session.create_entry(None).id;
        let c = session.create_entry(None).id;

        session.reorder(c, a, true);
        let ids: Vec<Uuid> = session.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c, a, b]);

        session.reorder(c, b, false);
        let ids: Vec<Uuid> = session.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_reorder_noops() {
        let mut session = session();
        let a = session.create_entry(None).id;
        let b = session.create_entry(None).id;

        session.reorder(a, a, true);
        session.reorder(a, Uuid::new_v4(), true);
        session.reorder(Uuid::new_v4(), b, false);

        let ids: Vec<Uuid> = session.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_update_active_merges_fields() {
        let mut session = session();
        session.create_entry(Some("https://example.com"));

        session.update_active(EntryPatch {
            title: Some("Example Domain".into()),
            ..Default::default()
        });

        let active = session.active().unwrap();
        assert_eq!(active.title, "Example Domain");
        assert_eq!(active.location, "https://example.com");
        assert_eq!(active.icon, DEFAULT_ICON);
    }

    #[test]
    fn test_update_active_without_entries_is_noop() {
        let mut session = session();
        session.update_active(EntryPatch {
            title: Some("ignored".into()),
            ..Default::default()
        });
        assert!(session.is_empty());
    }

    #[test]
    fn test_navigate_updates_active_and_signals_load() {
        let bus = Arc::new(EventBus::new());
        let loads = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&loads);
        bus.subscribe(Topic::Tabs, move |event| {
            if let Event::TabActivated { location, .. } = event {
                sink.lock().push(location.clone());
            }
        });

        let mut session = SessionState::new(bus);
        session.create_entry(None);
        session.navigate("https://example.com/docs");

        assert_eq!(session.active().unwrap().location, "https://example.com/docs");
        assert_eq!(
            *loads.lock(),
            vec![NEW_TAB_LOCATION.to_string(), "https://example.com/docs".to_string()]
        );
    }

    #[test]
    fn test_close_publishes_lifecycle_events() {
        let bus = Arc::new(EventBus::new());
        let closed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&closed);
        bus.subscribe(Topic::Tabs, move |event| {
            if let Event::TabClosed { id } = event {
                sink.lock().push(*id);
            }
        });

        let mut session = SessionState::new(bus);
        let a = session.create_entry(None).id;
        session.create_entry(None);
        session.close(a);

        assert_eq!(*closed.lock(), vec![a]);
    }
}
