//! Process-wide event bus for the Ember browser shell
//!
//! Core components announce state changes here (bookmark added, download
//! progressed, tab activated) and external observers such as the UI layer
//! subscribe per topic. Delivery is synchronous, on the publishing thread,
//! in subscription order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topics events are routed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Session entry lifecycle and activation
    Tabs,
    /// Bookmark collection changes
    Bookmarks,
    /// History collection changes
    History,
    /// Download lifecycle and progress
    Downloads,
}

/// State-change notifications published by the core components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TabCreated { id: Uuid, location: String },
    TabActivated { id: Uuid, location: String },
    TabClosed { id: Uuid },
    TabUpdated { id: Uuid },
    BookmarkAdded { id: Uuid, url: String, title: String },
    BookmarkRemoved { id: Uuid, url: String },
    HistoryRecorded { id: Uuid, url: String },
    HistoryCleared,
    DownloadStarted { id: Uuid, url: String, filename: String },
    DownloadProgress {
        id: Uuid,
        progress: u8,
        received_bytes: u64,
        total_bytes: u64,
    },
    DownloadCompleted { id: Uuid },
    DownloadFailed { id: Uuid, error: String },
    DownloadRemoved { id: Uuid },
}

impl Event {
    /// The topic this event is delivered under
    pub fn topic(&self) -> Topic {
        match self {
            Event::TabCreated { .. }
            | Event::TabActivated { .. }
            | Event::TabClosed { .. }
            | Event::TabUpdated { .. } => Topic::Tabs,
            Event::BookmarkAdded { .. } | Event::BookmarkRemoved { .. } => Topic::Bookmarks,
            Event::HistoryRecorded { .. } | Event::HistoryCleared => Topic::History,
            Event::DownloadStarted { .. }
            | Event::DownloadProgress { .. }
            | Event::DownloadCompleted { .. }
            | Event::DownloadFailed { .. }
            | Event::DownloadRemoved { .. } => Topic::Downloads,
        }
    }
}

/// Token returned by [`EventBus::subscribe`]; removes exactly that handler
/// when passed to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Synchronous publish/subscribe channel
///
/// An `EventBus` is owned by the application and injected into the
/// components that publish on it; it is not a global singleton. Handlers
/// registered while a `publish` is in flight are not delivered that event,
/// and missed events are not replayed.
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<Topic, Vec<(u64, Handler)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler for every event published under `topic`.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        SubscriptionId(id)
    }

    /// Remove the handler registered under `id`. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.write();
        for handlers in subscribers.values_mut() {
            handlers.retain(|(handler_id, _)| *handler_id != id.0);
        }
    }

    /// Invoke all current subscribers for the event's topic, in
    /// subscription order.
    pub fn publish(&self, event: Event) {
        // Snapshot the handler list so callbacks may subscribe or
        // unsubscribe without holding the registry lock.
        let handlers: Vec<Handler> = {
            let subscribers = self.subscribers.read();
            subscribers
                .get(&event.topic())
                .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        log::trace!("publishing {:?} to {} subscriber(s)", event.topic(), handlers.len());
        for handler in handlers {
            handler(&event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collector() -> (Arc<Mutex<Vec<Event>>>, impl Fn(&Event) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |event: &Event| sink.lock().push(event.clone()))
    }

    #[test]
    fn test_publish_reaches_topic_subscribers() {
        let bus = EventBus::new();
        let (seen, handler) = collector();
        bus.subscribe(Topic::Bookmarks, handler);

        let id = Uuid::new_v4();
        bus.publish(Event::BookmarkAdded {
            id,
            url: "https://example.com".into(),
            title: "Example".into(),
        });
        bus.publish(Event::HistoryCleared);

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::BookmarkAdded { url, .. } if url == "https://example.com"));
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(Topic::History, move |_| order.lock().push(tag));
        }

        bus.publish(Event::HistoryCleared);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_removes_exactly_one_handler() {
        let bus = EventBus::new();
        let (seen_a, handler_a) = collector();
        let (seen_b, handler_b) = collector();

        let token = bus.subscribe(Topic::Tabs, handler_a);
        bus.subscribe(Topic::Tabs, handler_b);
        bus.unsubscribe(token);

        bus.publish(Event::TabClosed { id: Uuid::new_v4() });
        assert!(seen_a.lock().is_empty());
        assert_eq!(seen_b.lock().len(), 1);
    }

    #[test]
    fn test_handler_may_subscribe_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let inner_bus = Arc::clone(&bus);
        let (seen, handler) = collector();

        bus.subscribe(Topic::Downloads, move |_| {
            // Must not deadlock; the new handler sees later events only.
            inner_bus.subscribe(Topic::Downloads, |_: &Event| {});
        });
        bus.subscribe(Topic::Downloads, handler);

        bus.publish(Event::DownloadCompleted { id: Uuid::new_v4() });
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_event_topics() {
        let id = Uuid::new_v4();
        assert_eq!(
            Event::TabActivated { id, location: "ember:newtab".into() }.topic(),
            Topic::Tabs
        );
        assert_eq!(
            Event::DownloadFailed { id, error: "network".into() }.topic(),
            Topic::Downloads
        );
        assert_eq!(Event::HistoryRecorded { id, url: String::new() }.topic(), Topic::History);
    }
}
