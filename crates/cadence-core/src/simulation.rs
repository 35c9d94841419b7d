//! Simulation interface consumed by the tick driver and console commands.
//!
//! The engine behind [`Simulation`] is an external collaborator. The core
//! only advances it, watches its population, and reinitializes it when
//! that population collapses.
//!
//! Both the tick worker and dispatched console commands touch the same
//! engine, so every access goes through [`SharedSimulation`], which holds
//! the engine behind a single mutex. A tick step or a command body runs
//! under one lock acquisition and can never interleave with the other.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Why a simulation is being (re)initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReinitKind {
    /// Fresh start: process start-up, or recovery after the population
    /// reached zero.
    StartUp,
    /// Operator-requested reset from the console.
    Reset,
}

impl fmt::Display for ReinitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartUp => f.write_str("start-up"),
            Self::Reset => f.write_str("reset"),
        }
    }
}

/// The operations the core needs from a simulation engine.
///
/// Implementations are trusted not to fail. A panic inside any of these
/// methods is fatal for the thread that called it.
pub trait Simulation: Send {
    /// Advance the simulation by one tick.
    fn advance_tick(&mut self);

    /// Rebuild the simulation state from scratch.
    ///
    /// `area` is the map area in cells; `flags` is passed through to the
    /// engine uninterpreted.
    fn reinitialize(&mut self, kind: ReinitKind, seed: u64, area: u64, flags: u32);

    /// Current number of living entities.
    fn population_count(&self) -> u64;

    /// Release engine resources. No other method is called afterwards.
    fn close(&mut self);
}

/// Cloneable handle serializing access to one simulation engine.
pub struct SharedSimulation<S> {
    inner: Arc<Mutex<S>>,
}

impl<S: Simulation> SharedSimulation<S> {
    /// Wrap an engine for shared use.
    pub fn new(simulation: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(simulation)),
        }
    }

    /// Lock the engine for exclusive use.
    ///
    /// A panic while the lock was held does not make the engine
    /// unreachable: the guard is recovered from the poisoned mutex.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Read the population under the lock.
    pub fn population_count(&self) -> u64 {
        self.lock().population_count()
    }
}

impl<S> Clone for SharedSimulation<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for SharedSimulation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSimulation")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: u64,
        population: u64,
    }

    impl Simulation for Counter {
        fn advance_tick(&mut self) {
            self.ticks = self.ticks.saturating_add(1);
        }

        fn reinitialize(&mut self, _kind: ReinitKind, _seed: u64, area: u64, _flags: u32) {
            self.population = area;
        }

        fn population_count(&self) -> u64 {
            self.population
        }

        fn close(&mut self) {
            self.population = 0;
        }
    }

    #[test]
    fn clones_share_one_engine() {
        let a = SharedSimulation::new(Counter::default());
        let b = a.clone();

        a.with(Simulation::advance_tick);
        b.with(Simulation::advance_tick);
        b.with(|sim| sim.reinitialize(ReinitKind::StartUp, 1, 7, 0));

        assert_eq!(a.lock().ticks, 2);
        assert_eq!(a.population_count(), 7);
    }

    #[test]
    #[allow(clippy::panic)]
    fn poisoned_lock_is_recovered() {
        let shared = SharedSimulation::new(Counter::default());
        let poisoner = shared.clone();
        let result = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("engine fault while locked");
        })
        .join();
        assert!(result.is_err());

        shared.with(Simulation::advance_tick);
        assert_eq!(shared.lock().ticks, 1);
    }

    #[test]
    fn reinit_kind_display() {
        assert_eq!(ReinitKind::StartUp.to_string(), "start-up");
        assert_eq!(ReinitKind::Reset.to_string(), "reset");
    }
}
