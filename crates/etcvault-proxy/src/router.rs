//! The backend router: a live list of backends, periodically refreshed
//! through an injected discovery source, with filtered and shuffled
//! snapshot views for the dispatcher.
//!
//! Updates never mutate an existing backend's health state — a refresh
//! swaps in a whole new list, and in-flight requests keep their snapshot of
//! the old one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom as _;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{DiscoveryError, RouterError};

/// A source of fresh backend lists (members API, DNS SRV, …).
#[async_trait]
pub trait BackendSource: Send + Sync {
    async fn discover(&self) -> Result<Vec<Arc<Backend>>, DiscoveryError>;
}

/// The live backend list and its refresh lifecycle.
pub struct Router {
    backends: RwLock<Vec<Arc<Backend>>>,
    source: Arc<dyn BackendSource>,
    update_interval: Duration,
    updater: Mutex<Option<Updater>>,
}

struct Updater {
    stop: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

impl Router {
    #[must_use]
    pub fn new(update_interval: Duration, source: Arc<dyn BackendSource>) -> Self {
        Router {
            backends: RwLock::new(Vec::new()),
            source,
            update_interval,
            updater: Mutex::new(None),
        }
    }

    /// Refresh the backend list once. On discovery failure the previous
    /// list is kept and the error is logged.
    pub async fn update(&self) {
        match self.source.discover().await {
            Ok(backends) => {
                *self.write_backends() = backends;
            }
            Err(err) => {
                warn!(error = %err, "failed to update backends");
            }
        }
    }

    /// Start the periodic refresher.
    ///
    /// # Errors
    ///
    /// [`RouterError::AlreadyStarted`] when a refresher is already running.
    pub fn start_update(self: &Arc<Self>) -> Result<(), RouterError> {
        let mut updater = self.lock_updater();
        if updater.is_some() {
            return Err(RouterError::AlreadyStarted);
        }

        let (stop, mut stopped) = watch::channel(false);
        let router = Arc::clone(self);
        let interval = self.update_interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped.changed() => return,
                    () = tokio::time::sleep(interval) => router.update().await,
                }
            }
        });

        *updater = Some(Updater {
            stop,
            _handle: handle,
        });
        info!("started periodical update of backends");
        Ok(())
    }

    /// Stop the periodic refresher. Idempotent; an update already in flight
    /// finishes, but no further refresh begins.
    pub fn stop_update(&self) {
        if let Some(updater) = self.lock_updater().take() {
            let _ = updater.stop.send(true);
            info!("stopped periodical update of backends");
        }
    }

    /// Snapshot of the whole list.
    #[must_use]
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.read_backends().clone()
    }

    /// Snapshot of currently unavailable backends.
    #[must_use]
    pub fn failed_backends(&self) -> Vec<Arc<Backend>> {
        self.filtered(|backend| !backend.is_available())
    }

    /// Snapshot of currently available backends.
    #[must_use]
    pub fn available_backends(&self) -> Vec<Arc<Backend>> {
        self.filtered(Backend::is_available)
    }

    /// A fresh random permutation of the available backends.
    #[must_use]
    pub fn shuffled_available_backends(&self) -> Vec<Arc<Backend>> {
        self.shuffled_available_backends_with(&mut rand::thread_rng())
    }

    /// Shuffle with a caller-provided source of randomness (tests seed it).
    #[must_use]
    pub fn shuffled_available_backends_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Vec<Arc<Backend>> {
        let mut backends = self.available_backends();
        backends.shuffle(rng);
        backends
    }

    fn filtered(&self, keep: impl Fn(&Backend) -> bool) -> Vec<Arc<Backend>> {
        self.read_backends()
            .iter()
            .filter(|backend| keep(backend))
            .cloned()
            .collect()
    }

    fn read_backends(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Backend>>> {
        self.backends.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_backends(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Backend>>> {
        self.backends
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_updater(&self) -> MutexGuard<'_, Option<Updater>> {
        self.updater.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("backends", &self.read_backends().len())
            .field("update_interval", &self.update_interval)
            .finish_non_exhaustive()
    }
}
