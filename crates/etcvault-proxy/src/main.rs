//! etcvault proxy entry point.
//!
//! Bootstraps the keychain and engine, picks a discovery source, runs one
//! immediate backend refresh so the proxy is routable from the first
//! request, then serves with graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use url::Url;

use etcvault_core::{Engine, Keychain, Transformer};
use etcvault_proxy::discovery::{MembersDiscovery, SrvDiscovery};
use etcvault_proxy::{proxy, readonly, BackendSource, Proxy, ProxyConfig, Router};

/// Matches the upstream proxy's read timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProxyConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(listen = %config.listen_addr, keychain = %config.keychain_dir, "etcvault starting");

    let keychain = Arc::new(Keychain::new(&config.keychain_dir));
    let engine: Arc<dyn Transformer> = Arc::new(Engine::new(keychain));

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("failed to build http client")?;

    let source: Arc<dyn BackendSource> = if let Some(domain) = &config.discovery_srv {
        info!(domain = %domain, "discovering backends from SRV records");
        Arc::new(
            SrvDiscovery::new(client.clone(), domain.clone())
                .context("failed to build srv discovery")?,
        )
    } else {
        let urls = config
            .backend_urls
            .iter()
            .map(|url| Url::parse(url).with_context(|| format!("invalid backend url {url}")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        info!(candidates = urls.len(), "discovering backends from the members API");
        Arc::new(MembersDiscovery::new(client.clone(), urls))
    };

    let router = Arc::new(Router::new(
        Duration::from_secs(config.discovery_interval_secs),
        source,
    ));
    router.update().await;
    router
        .start_update()
        .context("failed to start backend discovery")?;

    let dispatcher = Proxy::new(client, Arc::clone(&router), engine, config.advertise_url.clone());
    let mut app = proxy::routes(dispatcher)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    if config.readonly {
        info!("readonly mode enabled");
        app = readonly::apply(app);
    }

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen_addr))?;

    info!(addr = %config.listen_addr, advertise = %config.advertise_url, "etcvault listening");

    // SIGINT or SIGTERM drains in-flight requests; the discovery refresher
    // is stopped once the listener has closed.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let ctrl_c = async {
                tokio::signal::ctrl_c().await.ok();
            };

            #[cfg(unix)]
            let terminate = async {
                if let Ok(mut sig) =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                {
                    sig.recv().await;
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                () = ctrl_c => {},
                () = terminate => {},
            }

            info!("shutdown signal received, draining requests before stopping backend discovery");
        })
        .await
        .context("server error")?;

    router.stop_update();
    info!("etcvault stopped");
    Ok(())
}
