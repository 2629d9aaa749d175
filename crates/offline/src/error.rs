use thiserror::Error;

/// NetworkError represents failures of the fetch layer
///
/// A network failure is always recovered locally by the controller —
/// falling back to a cache generation or the offline document — and never
/// crashes it.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The transport could not complete the request
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// The caller abandoned the request mid-flight
    #[error("request aborted: {0}")]
    Aborted(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetworkError {
    /// Returns true if the error is likely temporary and the request could
    /// be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, NetworkError::Fetch(_) | NetworkError::Io(_))
    }
}

/// Failure to bring a controller version live
#[derive(Error, Debug)]
pub enum ActivationError {
    /// A manifest asset could not be fetched into the static generation.
    /// Fatal: the controller must not begin serving.
    #[error("failed to seed static generation with {asset}: {source}")]
    StaticSeed {
        asset: String,
        #[source]
        source: NetworkError,
    },

    /// A manifest entry did not resolve against the shell origin
    #[error("invalid manifest asset {asset}: {source}")]
    InvalidAsset {
        asset: String,
        #[source]
        source: url::ParseError,
    },
}
