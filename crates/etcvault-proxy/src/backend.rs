//! Per-backend availability with exponential cool-down.
//!
//! A transport failure withdraws the backend from the routable set
//! immediately and schedules a one-shot resume after the current blackout
//! interval; each successive failure doubles the next blackout (15s, 30s,
//! 60s, …). Any successful contact rehabilitates the backend instantly and
//! resets the interval.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

const INITIAL_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// One upstream etcd node as observed by the proxy.
#[derive(Debug)]
pub struct Backend {
    url: Url,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    available: bool,
    next_check_interval: Duration,
    resume_timer: Option<JoinHandle<()>>,
}

impl Backend {
    #[must_use]
    pub fn new(url: Url) -> Arc<Self> {
        Arc::new(Backend {
            url,
            state: Mutex::new(State {
                available: true,
                next_check_interval: INITIAL_CHECK_INTERVAL,
                resume_timer: None,
            }),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.lock().available
    }

    /// Record a transport failure.
    ///
    /// No-op when already unavailable. Otherwise withdraws the backend and
    /// schedules a one-shot resume after the current blackout interval,
    /// doubling the interval stored for the next failure.
    ///
    /// Must run inside a tokio runtime (the resume timer is a spawned task).
    pub fn mark_failed(self: &Arc<Self>) {
        let mut state = self.lock();

        if !state.available {
            return;
        }
        state.available = false;

        let delay = state.next_check_interval;
        state.next_check_interval = delay * 2;

        let backend = Arc::clone(self);
        state.resume_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut state = backend.lock();
            // mark_ok may have raced the timer and already rehabilitated it.
            if state.available {
                return;
            }
            state.available = true;
            drop(state);
            info!(url = %backend.url, "backend resumed (automatically)");
        }));
        drop(state);

        warn!(url = %self.url, resume_after = ?delay, "backend marked as failed");
    }

    /// Record a successful contact: rehabilitate, reset the blackout
    /// interval, and cancel any pending resume timer.
    pub fn mark_ok(&self) {
        let mut state = self.lock();

        let was_unavailable = !state.available;
        state.available = true;
        state.next_check_interval = INITIAL_CHECK_INTERVAL;
        if let Some(timer) = state.resume_timer.take() {
            timer.abort();
        }
        drop(state);

        if was_unavailable {
            info!(url = %self.url, "backend resumed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn backend() -> Arc<Backend> {
        Backend::new(Url::parse("http://backend-0:4001").unwrap())
    }

    #[tokio::test]
    async fn starts_available() {
        let backend = backend();
        assert!(backend.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_withdraws_until_the_interval_elapses() {
        let backend = backend();

        backend.mark_failed();
        assert!(!backend.is_available());

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert!(!backend.is_available());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(backend.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn successive_failures_double_the_blackout() {
        let backend = backend();

        // 15s blackout.
        backend.mark_failed();
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(backend.is_available());

        // 30s blackout.
        backend.mark_failed();
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(!backend.is_available());
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(backend.is_available());

        // 60s blackout.
        backend.mark_failed();
        tokio::time::sleep(Duration::from_secs(46)).await;
        assert!(!backend.is_available());
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(backend.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_while_unavailable_is_a_no_op() {
        let backend = backend();

        backend.mark_failed();
        backend.mark_failed();

        // Still the first 15s blackout — the second call neither rescheduled
        // nor double-doubled the interval.
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(backend.is_available());

        backend.mark_failed();
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(!backend.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn ok_resets_interval_and_cancels_timer() {
        let backend = backend();

        backend.mark_failed();
        backend.mark_ok();
        assert!(backend.is_available());

        // The next failure starts from 15s again.
        backend.mark_failed();
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(backend.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn ok_while_available_keeps_state() {
        let backend = backend();

        backend.mark_ok();
        assert!(backend.is_available());

        backend.mark_failed();
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(backend.is_available());
    }
}
