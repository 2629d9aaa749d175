use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::request::Request;
use crate::response::Response;

/// A named, versioned set of cached request/response pairs
///
/// Generations are shared mutable state between all in-flight interception
/// operations; every put/get/delete takes the generation lock for exactly
/// one operation, so interleaved work on different generations cannot
/// corrupt either. No cross-generation atomicity is provided.
pub struct CacheGeneration {
    name: String,
    entries: RwLock<HashMap<String, Response>>,
}

impl CacheGeneration {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a copy of `response` under the request's cache key
    pub fn put(&self, request: &Request, response: Response) {
        log::debug!("cache {} <- {}", self.name, request.cache_key());
        self.entries
            .write()
            .insert(request.cache_key().to_string(), response);
    }

    /// Seed an entry by raw key, used when pre-populating at install time
    pub fn put_raw(&self, key: &str, response: Response) {
        self.entries.write().insert(key.to_string(), response);
    }

    /// A matching stored response, marked as served-from-cache
    pub fn lookup(&self, request: &Request) -> Option<Response> {
        self.entries.read().get(request.cache_key()).map(|stored| {
            let mut response = stored.clone();
            response.set_from_cache(true);
            response
        })
    }

    pub fn lookup_raw(&self, key: &str) -> Option<Response> {
        self.entries.read().get(key).map(|stored| {
            let mut response = stored.clone();
            response.set_from_cache(true);
            response
        })
    }

    pub fn contains(&self, request: &Request) -> bool {
        self.entries.read().contains_key(request.cache_key())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// The set of live cache generations, keyed by versioned name
///
/// Mirrors the controller's view of its storage: generations are opened on
/// demand and deleted wholesale when a new controller version activates.
#[derive(Default)]
pub struct CacheStorage {
    generations: RwLock<HashMap<String, Arc<CacheGeneration>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the named generation, creating it if absent
    pub fn open(&self, name: &str) -> Arc<CacheGeneration> {
        let mut generations = self.generations.write();
        Arc::clone(
            generations
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(CacheGeneration::new(name))),
        )
    }

    /// The named generation, if it exists
    pub fn get(&self, name: &str) -> Option<Arc<CacheGeneration>> {
        self.generations.read().get(name).cloned()
    }

    /// Delete the named generation and everything in it
    pub fn delete(&self, name: &str) -> bool {
        let removed = self.generations.write().remove(name).is_some();
        if removed {
            log::info!("deleted cache generation {}", name);
        }
        removed
    }

    /// Names of all stored generations
    pub fn names(&self) -> Vec<String> {
        self.generations.read().keys().cloned().collect()
    }
}
