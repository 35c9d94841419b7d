//! Fixed-interval wake source for the tick driver.
//!
//! [`PeriodicTimer`] fires for the first time one full interval after it
//! is armed and every interval after that. A fire is only ever observed
//! inside [`PeriodicTimer::wait_next`]; nothing else is interrupted when
//! the interval elapses, so a tick body always runs to completion.
//!
//! Missed fires coalesce. If the consumer is slower than the interval,
//! the elapsed periods collapse into a single immediate wake and the next
//! wake lands on the following interval boundary. Catch-up wakes are
//! never queued.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Errors that can occur while configuring the wake source.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// The requested interval cannot drive a repeating timer.
    #[error("invalid timer interval {interval:?}: must be greater than zero and fit the clock")]
    InvalidInterval {
        /// The rejected interval.
        interval: Duration,
    },
}

/// Validated timer configuration. Created once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    interval: Duration,
}

impl TimerSpec {
    /// Build a spec for the given interval.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidInterval`] if `interval` is zero or too
    /// large to add to the current instant.
    pub fn new(interval: Duration) -> Result<Self, TimerError> {
        if interval.is_zero() || std::time::Instant::now().checked_add(interval).is_none() {
            return Err(TimerError::InvalidInterval { interval });
        }
        Ok(Self { interval })
    }

    /// Build a spec from a millisecond count.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidInterval`] if `ms` is zero or too large.
    pub fn from_millis(ms: u64) -> Result<Self, TimerError> {
        Self::new(Duration::from_millis(ms))
    }

    /// The interval between fires.
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

/// A repeating wake source with coalescing semantics.
#[derive(Debug)]
pub struct PeriodicTimer {
    spec: TimerSpec,
    interval: Interval,
    wakes: u64,
}

impl PeriodicTimer {
    /// Validate `interval` and arm a timer with it.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidInterval`] if `interval` is zero or too
    /// large.
    pub fn arm(interval: Duration) -> Result<Self, TimerError> {
        TimerSpec::new(interval).and_then(Self::from_spec)
    }

    /// Arm a timer from a validated spec.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidInterval`] if the first fire cannot be
    /// scheduled one interval from now.
    pub fn from_spec(spec: TimerSpec) -> Result<Self, TimerError> {
        let period = spec.interval();
        let first = Instant::now()
            .checked_add(period)
            .ok_or(TimerError::InvalidInterval { interval: period })?;
        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Ok(Self {
            spec,
            interval,
            wakes: 0,
        })
    }

    /// Suspend until the next fire, consuming exactly one wake.
    ///
    /// Returns the instant the consumed fire was scheduled for.
    pub async fn wait_next(&mut self) -> Instant {
        let scheduled = self.interval.tick().await;
        self.wakes = self.wakes.saturating_add(1);
        scheduled
    }

    /// Number of wakes consumed so far.
    pub const fn wakes(&self) -> u64 {
        self.wakes
    }

    /// The spec this timer was armed with.
    pub const fn spec(&self) -> TimerSpec {
        self.spec
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        let result = TimerSpec::new(Duration::ZERO);
        assert!(matches!(
            result,
            Err(TimerError::InvalidInterval { interval }) if interval.is_zero()
        ));
    }

    #[test]
    fn unrepresentable_interval_is_rejected() {
        assert!(matches!(
            TimerSpec::new(Duration::MAX),
            Err(TimerError::InvalidInterval { interval }) if interval == Duration::MAX
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn arm_rejects_unrepresentable_interval() {
        assert!(PeriodicTimer::arm(Duration::MAX).is_err());
    }

    #[test]
    fn spec_keeps_interval() {
        let spec = TimerSpec::from_millis(250).unwrap();
        assert_eq!(spec.interval(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn arm_rejects_zero_interval() {
        assert!(PeriodicTimer::arm(Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn wakes_are_evenly_spaced() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::arm(Duration::from_millis(100)).unwrap();

        for n in 1..=5_u64 {
            let _ = timer.wait_next().await;
            assert_eq!(start.elapsed(), Duration::from_millis(100 * n));
        }
        assert_eq!(timer.wakes(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fire_waits_a_full_interval() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::arm(Duration::from_millis(40)).unwrap();
        let scheduled = timer.wait_next().await;
        assert_eq!(scheduled, start + Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn missed_fires_coalesce_into_one_wake() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::arm(Duration::from_millis(100)).unwrap();

        // Three and a half periods pass with nobody waiting.
        tokio::time::advance(Duration::from_millis(350)).await;

        // One immediate wake absorbs the backlog...
        let _ = timer.wait_next().await;
        assert_eq!(start.elapsed(), Duration::from_millis(350));

        // ...and the next one lands on the following boundary.
        let _ = timer.wait_next().await;
        assert_eq!(start.elapsed(), Duration::from_millis(400));
        assert_eq!(timer.wakes(), 2);
    }
}
