use url::Url;

use crate::error::NetworkError;
use crate::pages;

/// HTTP methods recognized by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::HEAD => write!(f, "HEAD"),
            Method::OPTIONS => write!(f, "OPTIONS"),
            Method::PATCH => write!(f, "PATCH"),
        }
    }
}

/// How the request was initiated. Navigations (top-level page loads) get
/// the network-first strategy; everything else is a subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Subresource,
}

/// An outgoing content request as seen by the controller
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    mode: RequestMode,
}

impl Request {
    pub fn new(method: Method, url: &str, mode: RequestMode) -> Result<Self, NetworkError> {
        let url = Url::parse(url)?;
        Ok(Self { method, url, mode })
    }

    /// A top-level page load
    pub fn navigation(url: &str) -> Result<Self, NetworkError> {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    /// A subresource GET
    pub fn get(url: &str) -> Result<Self, NetworkError> {
        Self::new(Method::GET, url, RequestMode::Subresource)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Whether the request targets an internal shell location
    pub fn is_internal(&self) -> bool {
        pages::is_internal_location(self.url.as_str())
    }

    /// The key requests and cached responses are matched by
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }
}
