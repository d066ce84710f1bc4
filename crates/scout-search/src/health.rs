//! Availability tracking for the primary lexical backend.
//!
//! Works like a circuit breaker with one failure as the trip point. A failed
//! or timed-out call opens the circuit for `check_interval`. While open, all
//! requests go to the fallback. When the interval elapses, exactly one
//! request is let through as a probe. Its result closes the circuit or
//! re-opens it for another interval. A background timer also pings the
//! backend so recovery is noticed without traffic. Its pings obey the same
//! interval: while the circuit is open they are skipped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use scout_core::{defaults, Error, HealthState, HealthStatus, LexicalBackend};

#[derive(Debug)]
struct State {
    status: HealthState,
    last_checked: DateTime<Utc>,
    consecutive_failures: u32,
    /// Earliest time the primary may be tried again while not available.
    retry_at: Option<Instant>,
}

/// Process-wide health of the primary lexical backend.
pub struct HealthMonitor {
    backend: Arc<dyn LexicalBackend>,
    check_interval: Duration,
    probe_timeout: Duration,
    state: Mutex<State>,
}

impl HealthMonitor {
    pub fn new(
        backend: Arc<dyn LexicalBackend>,
        check_interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            check_interval,
            probe_timeout,
            state: Mutex::new(State {
                status: HealthState::Available,
                last_checked: Utc::now(),
                consecutive_failures: 0,
                retry_at: None,
            }),
        }
    }

    /// Interval from `HEALTH_CHECK_INTERVAL_SECS`, probe timeout from `LEXICAL_TIMEOUT_MS`.
    pub fn from_env(backend: Arc<dyn LexicalBackend>) -> Self {
        let interval = std::env::var("HEALTH_CHECK_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::HEALTH_CHECK_INTERVAL_SECS);
        let timeout = std::env::var("LEXICAL_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::LEXICAL_TIMEOUT_MS);
        Self::new(
            backend,
            Duration::from_secs(interval),
            Duration::from_millis(timeout),
        )
    }

    pub fn backend(&self) -> &Arc<dyn LexicalBackend> {
        &self.backend
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a panic mid-update; the fields are still valid.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn status(&self) -> HealthStatus {
        let state = self.lock();
        HealthStatus {
            status: state.status,
            last_checked: state.last_checked,
            consecutive_failures: state.consecutive_failures,
        }
    }

    /// Whether this request should try the primary.
    ///
    /// Once the retry time passes, the first caller claims the probe by
    /// pushing `retry_at` forward. Concurrent callers keep using the fallback.
    pub fn should_try_primary(&self) -> bool {
        let mut state = self.lock();
        if state.status == HealthState::Available {
            return true;
        }
        let now = Instant::now();
        match state.retry_at {
            Some(at) if now < at => false,
            _ => {
                state.retry_at = Some(now + self.check_interval);
                debug!(
                    subsystem = "search",
                    component = "health",
                    op = "probe",
                    backend = self.backend.name(),
                    "Retrying primary lexical backend"
                );
                true
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        let previous = state.status;
        state.status = HealthState::Available;
        state.last_checked = Utc::now();
        state.consecutive_failures = 0;
        state.retry_at = None;
        if previous != HealthState::Available {
            info!(
                subsystem = "search",
                component = "health",
                op = "transition",
                backend = self.backend.name(),
                from = previous.as_str(),
                to = HealthState::Available.as_str(),
                "Primary lexical backend recovered"
            );
        }
    }

    /// Timeouts mark the backend degraded, other errors unavailable.
    /// Either way the fallback serves until the interval elapses.
    pub fn record_failure(&self, error: &Error) {
        let next = match error {
            Error::LexicalBackendTimeout { .. } => HealthState::Degraded,
            _ => HealthState::Unavailable,
        };
        let mut state = self.lock();
        let previous = state.status;
        state.status = next;
        state.last_checked = Utc::now();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.retry_at = Some(Instant::now() + self.check_interval);
        if previous != next {
            warn!(
                subsystem = "search",
                component = "health",
                op = "transition",
                backend = self.backend.name(),
                from = previous.as_str(),
                to = next.as_str(),
                retry_in_secs = self.check_interval.as_secs(),
                error = %error,
                "Primary lexical backend marked down"
            );
        }
    }

    /// Ping the primary once and record the outcome.
    ///
    /// While the circuit is open and the interval has not elapsed, no ping is
    /// sent and the current status is returned. Otherwise the ping claims the
    /// probe exactly as a request would.
    pub async fn check_now(&self) -> HealthStatus {
        if !self.should_try_primary() {
            return self.status();
        }
        let result = match tokio::time::timeout(self.probe_timeout, self.backend.ping()).await {
            Ok(result) => result,
            Err(_) => Err(Error::LexicalBackendTimeout {
                backend: self.backend.name().to_string(),
                timeout_ms: self.probe_timeout.as_millis() as u64,
            }),
        };
        match result {
            Ok(()) => self.record_success(),
            Err(e) => self.record_failure(&e),
        }
        self.status()
    }

    /// Refresh on a timer until the handle is aborted.
    pub fn spawn_refresh(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let status = self.check_now().await;
                debug!(
                    subsystem = "search",
                    component = "health",
                    op = "refresh",
                    status = status.status.as_str(),
                    "Health refresh"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scout_core::{ExperienceMatch, Result, StructuredQuery};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Pingable {
        up: AtomicBool,
        pings: AtomicUsize,
    }

    #[async_trait]
    impl LexicalBackend for Pingable {
        fn name(&self) -> &'static str {
            "pingable"
        }
        async fn search(&self, _: &StructuredQuery, _: usize) -> Result<Vec<ExperienceMatch>> {
            Ok(vec![])
        }
        async fn suggest(&self, _: &str, _: usize) -> Result<Vec<String>> {
            Ok(vec![])
        }
        async fn ping(&self) -> Result<()> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(Error::LexicalBackendUnavailable("down".into()))
            }
        }
    }

    fn monitor(up: bool) -> (Arc<Pingable>, HealthMonitor) {
        let backend = Arc::new(Pingable {
            up: AtomicBool::new(up),
            pings: AtomicUsize::new(0),
        });
        let m = HealthMonitor::new(
            backend.clone(),
            Duration::from_secs(30),
            Duration::from_millis(100),
        );
        (backend, m)
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_routes_to_fallback_until_interval() {
        let (_, m) = monitor(true);
        assert!(m.should_try_primary());

        m.record_failure(&Error::LexicalBackendUnavailable("boom".into()));
        assert_eq!(m.status().status, HealthState::Unavailable);
        assert!(!m.should_try_primary());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!m.should_try_primary());
        assert_eq!(m.status().status, HealthState::Unavailable);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(m.should_try_primary());
        // Only one probe per interval.
        assert!(!m.should_try_primary());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_degraded() {
        let (_, m) = monitor(true);
        m.record_failure(&Error::LexicalBackendTimeout {
            backend: "pingable".into(),
            timeout_ms: 100,
        });
        let status = m.status();
        assert_eq!(status.status, HealthState::Degraded);
        assert_eq!(status.consecutive_failures, 1);
        assert!(!m.should_try_primary());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_closes_circuit() {
        let (_, m) = monitor(true);
        m.record_failure(&Error::LexicalBackendUnavailable("boom".into()));
        m.record_success();
        assert_eq!(m.status().status, HealthState::Available);
        assert_eq!(m.status().consecutive_failures, 0);
        assert!(m.should_try_primary());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_now_reflects_ping() {
        let (backend, m) = monitor(false);
        assert_eq!(m.check_now().await.status, HealthState::Unavailable);
        backend.up.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(m.check_now().await.status, HealthState::Available);
        assert_eq!(backend.pings.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_inside_interval_keeps_circuit_open() {
        let (backend, m) = monitor(true);
        tokio::time::advance(Duration::from_secs(29)).await;
        m.record_failure(&Error::LexicalBackendUnavailable("boom".into()));

        // A refresh one second later must not close the circuit.
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(m.check_now().await.status, HealthState::Unavailable);
        assert_eq!(backend.pings.load(Ordering::SeqCst), 0);
        assert!(!m.should_try_primary());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(m.check_now().await.status, HealthState::Available);
        assert_eq!(backend.pings.load(Ordering::SeqCst), 1);
        assert!(m.should_try_primary());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_respects_interval() {
        let (backend, m) = monitor(true);
        let m = Arc::new(m);
        let handle = m.clone().spawn_refresh();
        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(backend.pings.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(28)).await;
        m.record_failure(&Error::LexicalBackendUnavailable("boom".into()));
        // The tick at 30s falls inside the interval and is skipped.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(backend.pings.load(Ordering::SeqCst), 1);
        assert_eq!(m.status().status, HealthState::Unavailable);

        // The 60s tick is past the failure's interval; it probes and closes the circuit.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(m.status().status, HealthState::Available);
        assert_eq!(backend.pings.load(Ordering::SeqCst), 2);
        handle.abort();
    }
}
