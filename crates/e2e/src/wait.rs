//! Wait strategy resolution
//!
//! Waits never fail a scenario. A bound that elapses is reported back as an
//! outcome and the sequencer carries on.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::Page;
use crate::config::{DelayTable, Timeouts};
use crate::spec::{SelectorSpec, WaitStrategy};

/// What a wait ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The awaited condition was observed
    Satisfied,
    /// A fixed delay ran to completion; nothing was actually observed
    Slept { phase: String, duration: Duration },
    /// The bound elapsed or the engine gave up
    TimedOut(String),
    /// The awaited element never became visible
    NotFound(SelectorSpec),
}

impl WaitOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut(_) | WaitOutcome::NotFound(_))
    }
}

/// Resolves a [`WaitStrategy`] against a page
#[derive(Debug, Clone)]
pub struct WaitResolver {
    delays: DelayTable,
    timeouts: Timeouts,
}

impl WaitResolver {
    pub fn new(delays: DelayTable, timeouts: Timeouts) -> Self {
        Self { delays, timeouts }
    }

    pub async fn resolve(&self, page: &dyn Page, strategy: &WaitStrategy) -> WaitOutcome {
        match strategy {
            WaitStrategy::NetworkIdle => self.network_idle(page).await,
            WaitStrategy::FixedDelay { phase, duration_ms } => {
                self.fixed_delay(phase, *duration_ms).await
            }
            WaitStrategy::ElementAppears { selector, timeout_ms } => {
                let timeout = timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.timeouts.element());
                self.element_appears(page, selector, timeout).await
            }
        }
    }

    /// Duration used for a delay phase: explicit override, then the table.
    /// Phases missing from both are rejected by scenario validation; an
    /// unvalidated one sleeps for zero.
    pub fn delay_for(&self, phase: &str, override_ms: Option<u64>) -> Duration {
        override_ms
            .map(Duration::from_millis)
            .or_else(|| self.delays.get(phase))
            .unwrap_or_else(|| {
                warn!("No duration for delay phase '{}'", phase);
                Duration::ZERO
            })
    }

    async fn network_idle(&self, page: &dyn Page) -> WaitOutcome {
        let bound = self.timeouts.network_idle();
        // Hard stop in case the engine ignores its own timeout
        match tokio::time::timeout(bound + bound / 2, page.wait_for_network_idle(bound)).await {
            Ok(Ok(())) => WaitOutcome::Satisfied,
            Ok(Err(e)) => {
                warn!("Network idle not reached within {:?}: {}", bound, e);
                WaitOutcome::TimedOut(e.to_string())
            }
            Err(_) => {
                warn!("Network idle wait exceeded hard bound of {:?}", bound + bound / 2);
                WaitOutcome::TimedOut(format!("network idle not reached within {:?}", bound))
            }
        }
    }

    async fn fixed_delay(&self, phase: &str, override_ms: Option<u64>) -> WaitOutcome {
        let duration = self.delay_for(phase, override_ms);
        info!(
            "Sleeping {} ms for '{}' as a proxy for animation completion",
            duration.as_millis(),
            phase
        );
        tokio::time::sleep(duration).await;
        WaitOutcome::Slept {
            phase: phase.to_string(),
            duration,
        }
    }

    async fn element_appears(
        &self,
        page: &dyn Page,
        selector: &SelectorSpec,
        timeout: Duration,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let poll = self.timeouts.poll_interval();

        loop {
            match page.is_visible(selector).await {
                Ok(true) => return WaitOutcome::Satisfied,
                Ok(false) => {}
                Err(e) => debug!("Visibility poll for {} failed: {}", selector, e),
            }

            let now = Instant::now();
            if now >= deadline {
                debug!("{} did not appear within {:?}", selector, timeout);
                return WaitOutcome::NotFound(selector.clone());
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }
}
