use std::collections::HashMap;

use bytes::Bytes;
use url::Url;

use crate::error::NetworkError;

/// A content response, either fetched from the network, served from a
/// cache generation, or synthesized for an internal page
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
    url: Url,
    from_cache: bool,
}

impl Response {
    pub fn new(status: u16, headers: HashMap<String, String>, body: Bytes, url: Url) -> Self {
        Self {
            status,
            headers,
            body,
            url,
            from_cache: false,
        }
    }

    /// A locally synthesized HTML document (internal pages, the offline
    /// fallback)
    pub fn synthesized(html: impl Into<String>, url: Url) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        Self::new(200, headers, Bytes::from(html.into()), url)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&String> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_text(&self) -> Result<String, NetworkError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|_| NetworkError::Fetch("response body is not valid UTF-8".to_string()))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn content_type(&self) -> Option<&String> {
        self.header("content-type")
    }

    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.to_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// Whether this response was served from a cache generation
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub(crate) fn set_from_cache(&mut self, from_cache: bool) {
        self.from_cache = from_cache;
    }
}
