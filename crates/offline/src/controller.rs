use std::sync::Arc;

use parking_lot::RwLock;
use url::Url;

use crate::error::{ActivationError, NetworkError};
use crate::fetch::Fetch;
use crate::generation::CacheStorage;
use crate::pages;
use crate::request::{Method, Request, RequestMode};
use crate::response::Response;

/// Name of the generation seeded from the static-asset manifest
pub const STATIC_GENERATION: &str = "ember-shell-static-v1";

/// Name of the generation populated lazily from network responses
pub const DYNAMIC_GENERATION: &str = "ember-shell-dynamic-v1";

/// Control messages accepted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Force a waiting controller version to become active immediately,
    /// without waiting for all clients to close
    SkipWaiting,
}

/// Controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Created, generations not yet seeded
    Installing,
    /// Seeded and waiting to take over
    Waiting,
    /// Serving requests
    Active,
}

/// The controller's seam to the hosting shell for push notifications and
/// window focus
pub trait ClientSurface: Send + Sync {
    /// Display a notification with the given title and body
    fn show_notification(&self, title: &str, body: &str);

    /// Open or focus a client window at the root location
    fn focus_root(&self);
}

/// Intercepts outgoing content requests and serves them from a cache
/// generation, the network, or a synthesized internal page
///
/// Strategies, in classification order: internal locations are synthesized
/// from the template table; navigations are network-first with a cache and
/// offline-document fallback; other GETs are cache-first; non-GET requests
/// pass through uncached.
pub struct CacheController {
    origin: Url,
    storage: CacheStorage,
    fetcher: Arc<dyn Fetch>,
    surface: Arc<dyn ClientSurface>,
    phase: RwLock<ControllerPhase>,
}

impl CacheController {
    pub fn new(origin: Url, fetcher: Arc<dyn Fetch>, surface: Arc<dyn ClientSurface>) -> Self {
        Self {
            origin,
            storage: CacheStorage::new(),
            fetcher,
            surface,
            phase: RwLock::new(ControllerPhase::Installing),
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        *self.phase.read()
    }

    /// The generations currently stored, by name
    pub fn generation_names(&self) -> Vec<String> {
        self.storage.names()
    }

    /// Seed the static generation from the asset manifest and the dynamic
    /// generation from the internal-page templates.
    ///
    /// Population completes before the controller serves anything; failing
    /// to fetch any single manifest asset is fatal to activation.
    pub async fn install(&self, manifest: &[String]) -> Result<(), ActivationError> {
        let static_generation = self.storage.open(STATIC_GENERATION);
        for asset in manifest {
            let url = self.origin.join(asset).map_err(|e| ActivationError::InvalidAsset {
                asset: asset.clone(),
                source: e,
            })?;
            let request = Request::new(Method::GET, url.as_str(), RequestMode::Subresource)
                .map_err(|e| ActivationError::StaticSeed {
                    asset: asset.clone(),
                    source: e,
                })?;
            let response = self.fetcher.fetch(&request).await.map_err(|e| {
                ActivationError::StaticSeed {
                    asset: asset.clone(),
                    source: e,
                }
            })?;
            if !response.is_success() {
                return Err(ActivationError::StaticSeed {
                    asset: asset.clone(),
                    source: NetworkError::Fetch(format!("status {}", response.status())),
                });
            }
            static_generation.put_raw(url.as_str(), response);
        }
        log::info!(
            "seeded {} with {} manifest asset(s)",
            STATIC_GENERATION,
            static_generation.len()
        );

        let dynamic_generation = self.storage.open(DYNAMIC_GENERATION);
        for (path, html) in pages::seed_entries() {
            if let Ok(url) = self.origin.join(&path) {
                dynamic_generation.put_raw(url.as_str(), Response::synthesized(html, url.clone()));
            }
        }

        *self.phase.write() = ControllerPhase::Waiting;
        Ok(())
    }

    /// Take over serving: delete every stored generation not named exactly
    /// as one of the two current generation names, so old versions never
    /// survive an activation.
    pub fn activate(&self) {
        for name in self.storage.names() {
            if name != STATIC_GENERATION && name != DYNAMIC_GENERATION {
                self.storage.delete(&name);
            }
        }
        *self.phase.write() = ControllerPhase::Active;
        log::info!("cache controller active");
    }

    /// Handle a control message from the hosting shell
    pub fn handle_message(&self, message: ControlMessage) {
        match message {
            ControlMessage::SkipWaiting => {
                if self.phase() != ControllerPhase::Active {
                    log::info!("skip-waiting received, activating immediately");
                    self.activate();
                }
            }
        }
    }

    /// Classify and serve one request. A network failure on a navigation is
    /// always recovered locally; subresource fetch failures are surfaced to
    /// the caller.
    pub async fn handle(&self, request: &Request) -> Result<Response, NetworkError> {
        if request.is_internal() {
            return Ok(self.internal_page(request));
        }
        if request.method() != Method::GET {
            return self.fetcher.fetch(request).await;
        }
        if request.is_navigation() {
            return Ok(self.network_first(request).await);
        }
        self.cache_first(request).await
    }

    /// Push payloads are displayed verbatim as a notification
    pub fn on_push(&self, payload: &str) {
        log::debug!("push received ({} bytes)", payload.len());
        self.surface.show_notification("Ember Shell", payload);
    }

    /// A notification click brings a client window to the foreground at the
    /// root location
    pub fn on_notification_click(&self) {
        self.surface.focus_root();
    }

    fn internal_page(&self, request: &Request) -> Response {
        let name = pages::page_name(request.url().as_str());
        Response::synthesized(pages::template(name), request.url().clone())
    }

    async fn network_first(&self, request: &Request) -> Response {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if self.should_cache(request) {
                    self.storage
                        .open(DYNAMIC_GENERATION)
                        .put(request, response.clone());
                }
                response
            }
            Err(e) => {
                log::warn!(
                    "navigation fetch for {} failed ({}), falling back to cache",
                    request.url(),
                    e
                );
                self.lookup_dynamic_then_static(request)
                    .unwrap_or_else(|| self.offline_document())
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Response, NetworkError> {
        if let Some(hit) = self.lookup_static_then_dynamic(request) {
            return Ok(hit);
        }

        let response = self.fetcher.fetch(request).await?;
        if self.should_cache(request) {
            self.storage
                .open(DYNAMIC_GENERATION)
                .put(request, response.clone());
        }
        Ok(response)
    }

    /// Whether a successful response for `request` may be stored: same
    /// origin, and either no query string or an internal page
    fn should_cache(&self, request: &Request) -> bool {
        if request.url().origin() != self.origin.origin() {
            return false;
        }
        if request.url().query().is_some() && !request.is_internal() {
            return false;
        }
        true
    }

    fn lookup_static_then_dynamic(&self, request: &Request) -> Option<Response> {
        self.storage
            .get(STATIC_GENERATION)
            .and_then(|generation| generation.lookup(request))
            .or_else(|| {
                self.storage
                    .get(DYNAMIC_GENERATION)
                    .and_then(|generation| generation.lookup(request))
            })
    }

    fn lookup_dynamic_then_static(&self, request: &Request) -> Option<Response> {
        self.storage
            .get(DYNAMIC_GENERATION)
            .and_then(|generation| generation.lookup(request))
            .or_else(|| {
                self.storage
                    .get(STATIC_GENERATION)
                    .and_then(|generation| generation.lookup(request))
            })
    }

    /// The document served when a navigation misses both the network and
    /// the caches: the cached index document if present, else a synthesized
    /// new-tab page
    fn offline_document(&self) -> Response {
        if let Ok(index) = self.origin.join("/index.html") {
            if let Some(cached) = self
                .storage
                .get(STATIC_GENERATION)
                .and_then(|generation| generation.lookup_raw(index.as_str()))
            {
                return cached;
            }
        }
        Response::synthesized(pages::template(pages::DEFAULT_PAGE), self.origin.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scripted fetcher: serves bodies by exact URL, records every call,
    /// and can be switched offline.
    struct MockFetcher {
        routes: Mutex<HashMap<String, String>>,
        offline: AtomicBool,
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                routes: Mutex::new(HashMap::new()),
                offline: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn route(&self, url: &str, body: &str) {
            self.routes.lock().insert(url.to_string(), body.to_string());
        }

        fn go_offline(&self) {
            self.offline.store(true, Ordering::SeqCst);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl Fetch for MockFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
            self.calls.lock().push(request.url().to_string());
            if self.offline.load(Ordering::SeqCst) {
                return Err(NetworkError::Fetch("network unreachable".into()));
            }
            match self.routes.lock().get(request.url().as_str()) {
                Some(body) => Ok(Response::new(
                    200,
                    HashMap::new(),
                    bytes::Bytes::from(body.clone()),
                    request.url().clone(),
                )),
                None => Err(NetworkError::Fetch(format!("no route for {}", request.url()))),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        notifications: Mutex<Vec<(String, String)>>,
        focus_calls: AtomicUsize,
    }

    impl ClientSurface for RecordingSurface {
        fn show_notification(&self, title: &str, body: &str) {
            self.notifications.lock().push((title.to_string(), body.to_string()));
        }

        fn focus_root(&self) {
            self.focus_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    const ORIGIN: &str = "https://shell.example/";

    fn controller() -> (Arc<CacheController>, Arc<MockFetcher>, Arc<RecordingSurface>) {
        let fetcher = Arc::new(MockFetcher::new());
        let surface = Arc::new(RecordingSurface::default());
        let controller = Arc::new(CacheController::new(
            Url::parse(ORIGIN).unwrap(),
            Arc::clone(&fetcher) as Arc<dyn Fetch>,
            Arc::clone(&surface) as Arc<dyn ClientSurface>,
        ));
        (controller, fetcher, surface)
    }

    async fn installed_controller() -> (Arc<CacheController>, Arc<MockFetcher>, Arc<RecordingSurface>) {
        let (controller, fetcher, surface) = controller();
        fetcher.route("https://shell.example/", "<!DOCTYPE html>root");
        fetcher.route("https://shell.example/index.html", "<!DOCTYPE html>index");
        fetcher.route("https://shell.example/css/shell.css", "body {}");
        let manifest = vec!["/".to_string(), "/index.html".to_string(), "/css/shell.css".to_string()];
        controller.install(&manifest).await.unwrap();
        controller.activate();
        (controller, fetcher, surface)
    }

    #[tokio::test]
    async fn test_internal_pages_are_synthesized() {
        let (controller, fetcher, _) = controller();

        let request = Request::navigation("ember:history").unwrap();
        let response = controller.handle(&request).await.unwrap();
        assert!(response.body_text().unwrap().contains("History"));

        // Internal locations never reach the network.
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_internal_page_falls_back_to_newtab() {
        let (controller, _, _) = controller();

        let request = Request::navigation("ember:no-such-page").unwrap();
        let response = controller.handle(&request).await.unwrap();
        assert!(response.body_text().unwrap().contains("New Tab"));
    }

    #[tokio::test]
    async fn test_install_seeds_static_generation() {
        let (controller, _, _) = installed_controller().await;
        let names = controller.generation_names();
        assert!(names.contains(&STATIC_GENERATION.to_string()));
        assert!(names.contains(&DYNAMIC_GENERATION.to_string()));
        assert_eq!(controller.phase(), ControllerPhase::Active);
    }

    #[tokio::test]
    async fn test_install_fails_when_a_manifest_asset_is_unfetchable() {
        let (controller, fetcher, _) = controller();
        fetcher.route("https://shell.example/", "<!DOCTYPE html>root");
        // "/missing.css" has no route.
        let manifest = vec!["/".to_string(), "/missing.css".to_string()];

        let result = controller.install(&manifest).await;
        assert!(matches!(result, Err(ActivationError::StaticSeed { .. })));
        assert_eq!(controller.phase(), ControllerPhase::Installing);
    }

    #[tokio::test]
    async fn test_activation_deletes_stale_generations() {
        let (controller, fetcher, _) = controller();
        fetcher.route("https://shell.example/", "<!DOCTYPE html>root");

        // A generation left behind by a previous controller version.
        controller.storage.open("ember-shell-static-v0");
        controller.install(&["/".to_string()]).await.unwrap();
        controller.activate();

        let mut names = controller.generation_names();
        names.sort();
        assert_eq!(
            names,
            vec![DYNAMIC_GENERATION.to_string(), STATIC_GENERATION.to_string()]
        );
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_immediately() {
        let (controller, fetcher, _) = controller();
        fetcher.route("https://shell.example/", "<!DOCTYPE html>root");
        controller.install(&["/".to_string()]).await.unwrap();
        assert_eq!(controller.phase(), ControllerPhase::Waiting);

        controller.handle_message(ControlMessage::SkipWaiting);
        assert_eq!(controller.phase(), ControllerPhase::Active);
    }

    #[tokio::test]
    async fn test_navigation_success_is_cached_and_returned() {
        let (controller, fetcher, _) = installed_controller().await;
        fetcher.route("https://shell.example/docs", "<!DOCTYPE html>docs");

        let request = Request::navigation("https://shell.example/docs").unwrap();
        let response = controller.handle(&request).await.unwrap();
        assert_eq!(response.body_text().unwrap(), "<!DOCTYPE html>docs");
        assert!(!response.from_cache());

        // The copy went into the dynamic generation.
        fetcher.go_offline();
        let fallback = controller.handle(&request).await.unwrap();
        assert!(fallback.from_cache());
        assert_eq!(fallback.body_text().unwrap(), "<!DOCTYPE html>docs");
    }

    #[tokio::test]
    async fn test_navigation_with_query_is_not_cached() {
        let (controller, fetcher, _) = installed_controller().await;
        fetcher.route("https://shell.example/search?q=rust", "<!DOCTYPE html>results");

        let request = Request::navigation("https://shell.example/search?q=rust").unwrap();
        controller.handle(&request).await.unwrap();

        fetcher.go_offline();
        let fallback = controller.handle(&request).await.unwrap();
        // No cached copy existed, so the offline document is served.
        assert_eq!(fallback.body_text().unwrap(), "<!DOCTYPE html>index");
    }

    #[tokio::test]
    async fn test_cross_origin_navigation_is_not_cached() {
        let (controller, fetcher, _) = installed_controller().await;
        fetcher.route("https://elsewhere.example/", "<!DOCTYPE html>elsewhere");

        let request = Request::navigation("https://elsewhere.example/").unwrap();
        controller.handle(&request).await.unwrap();

        fetcher.go_offline();
        let fallback = controller.handle(&request).await.unwrap();
        assert_eq!(fallback.body_text().unwrap(), "<!DOCTYPE html>index");
    }

    #[tokio::test]
    async fn test_offline_navigation_without_any_cache_serves_offline_document() {
        let (controller, fetcher, _) = controller();
        fetcher.go_offline();

        let request = Request::navigation("https://shell.example/never-seen").unwrap();
        let response = controller.handle(&request).await.unwrap();
        // Nothing installed: the synthesized default document is served.
        assert!(response.body_text().unwrap().contains("New Tab"));
    }

    #[tokio::test]
    async fn test_cache_first_skips_network_for_seeded_assets() {
        let (controller, fetcher, _) = installed_controller().await;
        let before = fetcher.calls().len();

        let request = Request::get("https://shell.example/css/shell.css").unwrap();
        let response = controller.handle(&request).await.unwrap();

        assert!(response.from_cache());
        assert_eq!(response.body_text().unwrap(), "body {}");
        assert_eq!(fetcher.calls().len(), before);
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_once_then_serves_from_cache() {
        let (controller, fetcher, _) = installed_controller().await;
        fetcher.route("https://shell.example/css/main.css", "h1 { color: red }");

        let request = Request::get("https://shell.example/css/main.css").unwrap();
        let first = controller.handle(&request).await.unwrap();
        assert!(!first.from_cache());

        let fetches = |calls: &[String]| {
            calls
                .iter()
                .filter(|u| u.as_str() == "https://shell.example/css/main.css")
                .count()
        };
        assert_eq!(fetches(&fetcher.calls()), 1);

        let second = controller.handle(&request).await.unwrap();
        assert!(second.from_cache());
        assert_eq!(second.body_text().unwrap(), "h1 { color: red }");
        assert_eq!(fetches(&fetcher.calls()), 1);
    }

    #[tokio::test]
    async fn test_subresource_fetch_failure_is_surfaced() {
        let (controller, fetcher, _) = installed_controller().await;
        fetcher.go_offline();

        let request = Request::get("https://shell.example/js/never-cached.js").unwrap();
        assert!(controller.handle(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_non_get_requests_pass_through_uncached() {
        let (controller, fetcher, _) = installed_controller().await;
        fetcher.route("https://shell.example/api/sync", "ok");

        let request =
            Request::new(Method::POST, "https://shell.example/api/sync", RequestMode::Subresource)
                .unwrap();
        let response = controller.handle(&request).await.unwrap();
        assert_eq!(response.body_text().unwrap(), "ok");

        fetcher.go_offline();
        assert!(controller.handle(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_push_payload_is_displayed_verbatim() {
        let (controller, _, surface) = controller();
        controller.on_push("Sync complete: 3 tabs updated");

        let notifications = surface.notifications.lock();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].1, "Sync complete: 3 tabs updated");
    }

    #[tokio::test]
    async fn test_notification_click_focuses_root() {
        let (controller, _, surface) = controller();
        controller.on_notification_click();
        assert_eq!(surface.focus_calls.load(Ordering::SeqCst), 1);
    }
}
