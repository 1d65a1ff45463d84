//! Error types for the proxy crate.

/// Errors from the router lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// `start_update` was called while a refresher is already running.
    #[error("periodical updating is already running")]
    AlreadyStarted,
}

/// Errors from backend discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A discovery HTTP request failed.
    #[error("backend discovery request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// SRV resolution failed (both the ssl and non-ssl lookups).
    #[error("srv lookup failed for {domain}: {source}")]
    Srv {
        domain: String,
        #[source]
        source: hickory_resolver::error::ResolveError,
    },

    /// A discovered member advertised an unparseable URL.
    #[error("invalid backend url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
