use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::NetworkError;
use crate::request::{Method, Request};
use crate::response::Response;

/// The controller's seam to the network
///
/// Production uses [`HttpFetcher`]; tests substitute scripted fakes so
/// cache behavior can be observed without a network. Timeouts are the
/// transport's concern, not the controller's.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let method = match request.method() {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
            Method::HEAD => reqwest::Method::HEAD,
            Method::OPTIONS => reqwest::Method::OPTIONS,
            Method::PATCH => reqwest::Method::PATCH,
        };

        let outcome = self
            .client
            .request(method, request.url().clone())
            .send()
            .await
            .map_err(|e| NetworkError::Fetch(e.to_string()))?;

        let status = outcome.status().as_u16();
        let url = outcome.url().clone();
        let headers: HashMap<String, String> = outcome
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = outcome
            .bytes()
            .await
            .map_err(|e| NetworkError::Fetch(e.to_string()))?;

        Ok(Response::new(status, headers, body, url))
    }
}
