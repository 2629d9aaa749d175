//! Offline cache controller for Ember Shell
//!
//! Intercepts every outgoing content request and decides, per request,
//! whether to serve from a cache generation, fetch the network, or
//! synthesize a response for internal shell locations. Runs as an
//! independent unit from the rest of the application; no ordering is
//! guaranteed between concurrently in-flight requests.

pub mod controller;
pub mod error;
pub mod fetch;
pub mod generation;
pub mod pages;
pub mod request;
pub mod response;

pub use controller::{
    CacheController, ClientSurface, ControlMessage, ControllerPhase, DYNAMIC_GENERATION,
    STATIC_GENERATION,
};
pub use error::{ActivationError, NetworkError};
pub use fetch::{Fetch, HttpFetcher};
pub use generation::{CacheGeneration, CacheStorage};
pub use request::{Method, Request, RequestMode};
pub use response::Response;
