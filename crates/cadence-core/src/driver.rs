//! Tick driver: the periodic worker that advances the simulation.
//!
//! Each iteration of [`TickDriver::run`] performs one [`TickDriver::step`]
//! and then waits on the [`PeriodicTimer`] for the next wake. A step:
//!
//! 1. advances the simulation by one tick,
//! 2. increments the [`TickCounter`],
//! 3. emits a progress event when the count is a multiple of
//!    `progress_every` (2048 by default),
//! 4. reinitializes the simulation with a fresh random seed and the fixed
//!    map area when the population is exactly zero.
//!
//! The whole step runs under one lock on the [`SharedSimulation`], so a
//! console command never observes a half-finished tick.
//!
//! There is no stop signal and no retry logic. The loop runs until its
//! task is dropped or the process exits. A population that cannot survive
//! reseeding is reinitialized on every tick; no backoff is applied.

use std::convert::Infallible;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::TickerConfig;
use crate::simulation::{ReinitKind, SharedSimulation, Simulation};
use crate::timer::PeriodicTimer;

/// Monotonic count of completed ticks. Starts at zero and never resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TickCounter(u64);

impl TickCounter {
    /// A counter at zero.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Count one tick and return the new value.
    pub const fn increment(&mut self) -> u64 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    /// Current value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether the current value is a non-zero multiple of `every`.
    ///
    /// Always `false` when `every` is zero.
    pub const fn is_multiple_of(self, every: u64) -> bool {
        match self.0.checked_rem(every) {
            Some(rem) => rem == 0 && self.0 != 0,
            None => false,
        }
    }
}

/// Fixed parameters of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    /// Progress event cadence in ticks.
    pub progress_every: u64,
    /// Map area passed to every reinitialization.
    pub map_area: u64,
}

impl From<&TickerConfig> for DriverSettings {
    fn from(config: &TickerConfig) -> Self {
        Self {
            progress_every: config.progress_every,
            map_area: config.map_area,
        }
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from(&TickerConfig::default())
    }
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Tick count after this step.
    pub tick: u64,
    /// Population observed after advancing.
    pub population: u64,
    /// Whether a progress event was emitted.
    pub progress: bool,
    /// Seed used if the simulation was reinitialized during this step.
    pub reseeded: Option<u64>,
}

/// Periodic worker advancing a shared simulation.
#[derive(Debug)]
pub struct TickDriver<S> {
    simulation: SharedSimulation<S>,
    counter: TickCounter,
    settings: DriverSettings,
    rng: StdRng,
}

impl<S: Simulation> TickDriver<S> {
    /// Create a driver seeded from the operating system.
    pub fn new(simulation: SharedSimulation<S>, settings: DriverSettings) -> Self {
        Self::with_rng(simulation, settings, StdRng::from_os_rng())
    }

    /// Create a driver drawing reinitialization seeds from `rng`.
    pub const fn with_rng(
        simulation: SharedSimulation<S>,
        settings: DriverSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            simulation,
            counter: TickCounter::new(),
            settings,
            rng,
        }
    }

    /// Ticks completed so far.
    pub const fn counter(&self) -> TickCounter {
        self.counter
    }

    /// Run one iteration of the tick loop without waiting.
    pub fn step(&mut self) -> TickReport {
        let mut simulation = self.simulation.lock();

        simulation.advance_tick();
        let tick = self.counter.increment();

        let progress = self.counter.is_multiple_of(self.settings.progress_every);
        if progress {
            info!(tick, "tick progress");
        }

        let population = simulation.population_count();
        let reseeded = if population == 0 {
            let seed: u64 = self.rng.random();
            info!(
                tick,
                seed,
                area = self.settings.map_area,
                kind = %ReinitKind::StartUp,
                "population collapsed, reinitializing"
            );
            simulation.reinitialize(ReinitKind::StartUp, seed, self.settings.map_area, 0);
            Some(seed)
        } else {
            None
        };

        TickReport {
            tick,
            population,
            progress,
            reseeded,
        }
    }

    /// Step forever, waiting on `timer` between steps.
    ///
    /// The first step runs immediately; later steps follow each wake.
    pub async fn run(mut self, mut timer: PeriodicTimer) -> Infallible {
        info!(
            interval_ms = timer.spec().interval().as_millis(),
            progress_every = self.settings.progress_every,
            map_area = self.settings.map_area,
            "tick driver starting"
        );
        loop {
            let report = self.step();
            debug!(tick = report.tick, population = report.population, "tick");
            let _ = timer.wait_next().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;

    /// Engine that replays a scripted population sequence and records
    /// every reinitialization.
    #[derive(Debug, Default)]
    struct ScriptedEngine {
        ticks: u64,
        populations: VecDeque<u64>,
        fallback: u64,
        current: u64,
        reinits: Vec<(ReinitKind, u64, u64, u32)>,
    }

    impl ScriptedEngine {
        fn steady(population: u64) -> Self {
            Self {
                fallback: population,
                ..Self::default()
            }
        }

        fn scripted(populations: &[u64], fallback: u64) -> Self {
            Self {
                populations: populations.iter().copied().collect(),
                fallback,
                ..Self::default()
            }
        }
    }

    impl Simulation for ScriptedEngine {
        fn advance_tick(&mut self) {
            self.ticks = self.ticks.saturating_add(1);
            self.current = self.populations.pop_front().unwrap_or(self.fallback);
        }

        fn reinitialize(&mut self, kind: ReinitKind, seed: u64, area: u64, flags: u32) {
            self.reinits.push((kind, seed, area, flags));
        }

        fn population_count(&self) -> u64 {
            self.current
        }

        fn close(&mut self) {}
    }

    fn driver(engine: ScriptedEngine) -> (TickDriver<ScriptedEngine>, SharedSimulation<ScriptedEngine>) {
        let shared = SharedSimulation::new(engine);
        let driver = TickDriver::with_rng(
            shared.clone(),
            DriverSettings::default(),
            StdRng::seed_from_u64(7),
        );
        (driver, shared)
    }

    #[test]
    fn counter_starts_at_zero_and_increments() {
        let mut counter = TickCounter::new();
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn zero_is_never_a_progress_tick() {
        assert!(!TickCounter::new().is_multiple_of(2048));
        let mut counter = TickCounter::new();
        counter.increment();
        assert!(!counter.is_multiple_of(0));
        assert!(counter.is_multiple_of(1));
    }

    #[test]
    fn counter_matches_steps_taken() {
        let (mut driver, shared) = driver(ScriptedEngine::steady(5));
        for _ in 0..37 {
            let _ = driver.step();
        }
        assert_eq!(driver.counter().get(), 37);
        assert_eq!(shared.lock().ticks, 37);
    }

    #[test]
    fn progress_is_reported_every_2048_ticks() {
        let (mut driver, _shared) = driver(ScriptedEngine::steady(5));
        let progress_ticks: Vec<u64> = (0..4096)
            .map(|_| driver.step())
            .filter(|report| report.progress)
            .map(|report| report.tick)
            .collect();
        assert_eq!(progress_ticks, vec![2048, 4096]);
    }

    #[test]
    fn living_population_is_left_alone() {
        let (mut driver, shared) = driver(ScriptedEngine::steady(3));
        for _ in 0..10 {
            let report = driver.step();
            assert_eq!(report.reseeded, None);
        }
        assert!(shared.lock().reinits.is_empty());
    }

    #[test]
    fn collapse_triggers_start_up_reinitialize() {
        let (mut driver, shared) = driver(ScriptedEngine::scripted(&[4, 2, 0], 6));

        assert_eq!(driver.step().reseeded, None);
        assert_eq!(driver.step().reseeded, None);
        let report = driver.step();
        assert_eq!(report.population, 0);
        let seed = report.reseeded.unwrap();
        assert_eq!(driver.step().reseeded, None);

        let engine = shared.lock();
        assert_eq!(
            engine.reinits,
            vec![(ReinitKind::StartUp, seed, DriverSettings::default().map_area, 0)]
        );
    }

    #[test]
    fn consecutive_reinitializations_use_fresh_seeds() {
        let (mut driver, _shared) = driver(ScriptedEngine::steady(0));
        let first = driver.step().reseeded.unwrap();
        let second = driver.step().reseeded.unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn seeds_are_reproducible_from_a_seeded_rng() {
        let (mut a, _) = driver(ScriptedEngine::steady(0));
        let (mut b, _) = driver(ScriptedEngine::steady(0));
        for _ in 0..4 {
            assert_eq!(a.step().reseeded, b.step().reseeded);
        }
    }

    /// An engine that cannot sustain a population is reinitialized on
    /// every single tick. No backoff is applied.
    #[test]
    fn unsustainable_population_reinitializes_every_tick() {
        let (mut driver, shared) = driver(ScriptedEngine::steady(0));
        for _ in 0..100 {
            let _ = driver.step();
        }
        assert_eq!(shared.lock().reinits.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn run_steps_once_per_wake() {
        let shared = SharedSimulation::new(ScriptedEngine::steady(1));
        let driver = TickDriver::with_rng(
            shared.clone(),
            DriverSettings::default(),
            StdRng::seed_from_u64(1),
        );
        let timer = PeriodicTimer::arm(Duration::from_millis(100)).unwrap();
        let handle = tokio::spawn(driver.run(timer));

        // Steps at 0, 100, 200, 300, 400, 500.
        tokio::time::sleep(Duration::from_millis(550)).await;
        handle.abort();
        let _ = handle.await;

        assert_eq!(shared.lock().ticks, 6);
    }
}
