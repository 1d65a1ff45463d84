//! Proxy configuration.
//!
//! Loaded from environment variables with defaults suitable for a local
//! etcd. All settings use the `ETCVAULT_*` prefix.

use std::net::SocketAddr;

/// Proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to bind the HTTP listener to.
    pub listen_addr: SocketAddr,
    /// Directory holding `<name>.pem` / `<name>.pub` key files.
    pub keychain_dir: String,
    /// Initial backend candidate URLs for members-API discovery.
    pub backend_urls: Vec<String>,
    /// When set, discover backends from `_etcd-server._tcp.<domain>` /
    /// `_etcd-server-ssl._tcp.<domain>` SRV records instead.
    pub discovery_srv: Option<String>,
    /// Client-facing URL advertised on `/v2/members` and `/v2/machines`.
    pub advertise_url: String,
    /// Reject non-GET requests with 501.
    pub readonly: bool,
    /// Seconds between backend list refreshes.
    pub discovery_interval_secs: u64,
    /// Log level filter (e.g. `info`, `debug`).
    pub log_level: String,
}

impl ProxyConfig {
    /// Load configuration from environment variables.
    ///
    /// - `ETCVAULT_LISTEN` — bind address (default `127.0.0.1:2379`)
    /// - `ETCVAULT_KEYCHAIN` — key directory (default `./keychain`)
    /// - `ETCVAULT_BACKENDS` — comma-separated candidate URLs
    ///   (default `http://127.0.0.1:4001`)
    /// - `ETCVAULT_DISCOVERY_SRV` — SRV domain (switches discovery mode)
    /// - `ETCVAULT_ADVERTISE_URL` — advertised URL
    ///   (default `http://<listen addr>`)
    /// - `ETCVAULT_READONLY` — `true`/`1` to enable readonly mode
    /// - `ETCVAULT_DISCOVERY_INTERVAL` — refresh seconds (default `60`)
    /// - `ETCVAULT_LOG_LEVEL` — log filter (default `info`)
    #[must_use]
    pub fn from_env() -> Self {
        let listen_addr = std::env::var("ETCVAULT_LISTEN")
            .ok()
            .and_then(|addr| addr.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 2379)));

        let keychain_dir =
            std::env::var("ETCVAULT_KEYCHAIN").unwrap_or_else(|_| "./keychain".to_owned());

        let backend_urls = std::env::var("ETCVAULT_BACKENDS")
            .unwrap_or_else(|_| "http://127.0.0.1:4001".to_owned())
            .split(',')
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .collect();

        let discovery_srv = std::env::var("ETCVAULT_DISCOVERY_SRV")
            .ok()
            .filter(|domain| !domain.is_empty());

        let advertise_url = std::env::var("ETCVAULT_ADVERTISE_URL")
            .unwrap_or_else(|_| format!("http://{listen_addr}"));

        let readonly = std::env::var("ETCVAULT_READONLY")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let discovery_interval_secs = std::env::var("ETCVAULT_DISCOVERY_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let log_level = std::env::var("ETCVAULT_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

        ProxyConfig {
            listen_addr,
            keychain_dir,
            backend_urls,
            discovery_srv,
            advertise_url,
            readonly,
            discovery_interval_secs,
            log_level,
        }
    }
}
