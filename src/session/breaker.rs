//! Failure counter guarding the credentials service.
//!
//! After `failure_threshold` consecutive failures the breaker opens and the
//! service is skipped until `recovery_timeout` has elapsed. The next call is
//! then let through as a probe: success closes the breaker, failure reopens it.

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::metrics;

const CLOSED: u8 = 0;
const OPEN: u8 = 1;
const PROBING: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    Probing,
}

impl BreakerState {
    fn from_u8(v: u8) -> Self {
        match v {
            OPEN => BreakerState::Open,
            PROBING => BreakerState::Probing,
            _ => BreakerState::Closed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::Probing => "probing",
        }
    }
}

pub struct Breaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    /// Milliseconds since `epoch` when the breaker last opened
    opened_at: AtomicU64,
    epoch: Instant,
}

impl Breaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            state: AtomicU8::new(CLOSED),
            consecutive_failures: AtomicU32::new(0),
            opened_at: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn state(&self) -> BreakerState {
        BreakerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether a call may go through right now.
    pub fn allow(&self) -> bool {
        match self.state.load(Ordering::Acquire) {
            OPEN => {
                let elapsed = self
                    .now_millis()
                    .saturating_sub(self.opened_at.load(Ordering::Relaxed));
                if elapsed < self.recovery_timeout.as_millis() as u64 {
                    return false;
                }
                // only the caller winning the CAS probes
                let won = self
                    .state
                    .compare_exchange(OPEN, PROBING, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if won {
                    log::info!("Credentials breaker probing after {}ms", elapsed);
                    metrics::record_breaker_state(BreakerState::Probing.as_str());
                }
                won
            }
            PROBING => false,
            _ => true,
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let previous = self.state.swap(CLOSED, Ordering::AcqRel);
        if previous != CLOSED {
            log::info!("Credentials breaker closed");
            metrics::record_breaker_state(BreakerState::Closed.as_str());
        }
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let current = self.state.load(Ordering::Acquire);
        let should_open = current == PROBING || (current == CLOSED && failures >= self.failure_threshold);
        if should_open
            && self
                .state
                .compare_exchange(current, OPEN, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            log::warn!(
                "Credentials breaker opened after {} consecutive failures",
                failures
            );
            self.opened_at.store(self.now_millis(), Ordering::Relaxed);
            metrics::record_breaker_state(BreakerState::Open.as_str());
        }
    }
}
