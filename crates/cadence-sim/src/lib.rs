//! Stochastic population engine for the Cadence console.
//!
//! A colony of beings lives on a square map. Every tick each being may
//! die, and may give birth with a chance that shrinks as the colony nears
//! the map's carrying capacity. Small colonies regularly die out, which
//! exercises the tick driver's reinitialize-on-collapse policy.
//!
//! All randomness comes from a [`StdRng`] seeded by
//! [`Simulation::reinitialize`], so a run is reproducible from its seed.

use cadence_core::config::PopulationConfig;
use cadence_core::simulation::{ReinitKind, Simulation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Map cells needed to sustain one being.
pub const CELLS_PER_BEING: u64 = 1024;

/// Validated engine parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationParams {
    initial_population: u64,
    birth_rate: f64,
    death_rate: f64,
}

impl PopulationParams {
    /// Build parameters, clamping both rates into `[0, 1]`.
    ///
    /// A `NaN` rate is treated as zero.
    pub fn new(initial_population: u64, birth_rate: f64, death_rate: f64) -> Self {
        Self {
            initial_population,
            birth_rate: clamp_probability(birth_rate),
            death_rate: clamp_probability(death_rate),
        }
    }

    /// Beings created by each reinitialization (before the capacity cap).
    pub const fn initial_population(&self) -> u64 {
        self.initial_population
    }

    /// Per-being birth chance on an empty map.
    pub const fn birth_rate(&self) -> f64 {
        self.birth_rate
    }

    /// Per-being death chance.
    pub const fn death_rate(&self) -> f64 {
        self.death_rate
    }
}

impl From<&PopulationConfig> for PopulationParams {
    fn from(config: &PopulationConfig) -> Self {
        Self::new(
            config.initial_population,
            config.birth_rate,
            config.death_rate,
        )
    }
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self::from(&PopulationConfig::default())
    }
}

/// Point-in-time view of the colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColonySnapshot {
    /// Living beings.
    pub population: u64,
    /// Maximum population the map sustains.
    pub capacity: u64,
    /// Ticks since the last reinitialization.
    pub ticks_in_run: u64,
    /// Number of reinitializations so far.
    pub runs: u64,
    /// Seed of the current run.
    pub seed: u64,
    /// Why the current run started.
    pub kind: Option<ReinitKind>,
}

/// The population engine.
#[derive(Debug)]
pub struct PopulationEngine {
    params: PopulationParams,
    rng: StdRng,
    population: u64,
    capacity: u64,
    ticks_in_run: u64,
    runs: u64,
    seed: u64,
    kind: Option<ReinitKind>,
    closed: bool,
}

impl PopulationEngine {
    /// Create an empty engine. Call [`Simulation::reinitialize`] to
    /// populate it.
    pub fn new(params: PopulationParams) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(0),
            population: 0,
            capacity: 0,
            ticks_in_run: 0,
            runs: 0,
            seed: 0,
            kind: None,
            closed: false,
        }
    }

    /// Current state of the colony.
    pub const fn snapshot(&self) -> ColonySnapshot {
        ColonySnapshot {
            population: self.population,
            capacity: self.capacity,
            ticks_in_run: self.ticks_in_run,
            runs: self.runs,
            seed: self.seed,
            kind: self.kind,
        }
    }

    /// Whether [`Simulation::close`] has been called.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn birth_chance(&self) -> f64 {
        if self.population >= self.capacity {
            return 0.0;
        }
        let crowding = ratio(self.population, self.capacity);
        self.params.birth_rate * (1.0 - crowding)
    }
}

impl Simulation for PopulationEngine {
    fn advance_tick(&mut self) {
        if self.closed {
            return;
        }
        self.ticks_in_run = self.ticks_in_run.saturating_add(1);

        let birth_chance = self.birth_chance();
        let death_chance = self.params.death_rate;
        let mut births: u64 = 0;
        let mut deaths: u64 = 0;
        for _ in 0..self.population {
            if self.rng.random_bool(death_chance) {
                deaths = deaths.saturating_add(1);
            } else if self.rng.random_bool(birth_chance) {
                births = births.saturating_add(1);
            }
        }

        self.population = self
            .population
            .saturating_sub(deaths)
            .saturating_add(births)
            .min(self.capacity);
    }

    fn reinitialize(&mut self, kind: ReinitKind, seed: u64, area: u64, flags: u32) {
        self.rng = StdRng::seed_from_u64(seed);
        self.capacity = area.checked_div(CELLS_PER_BEING).unwrap_or(0).max(1);
        self.population = self.params.initial_population.min(self.capacity);
        self.ticks_in_run = 0;
        self.runs = self.runs.saturating_add(1);
        self.seed = seed;
        self.kind = Some(kind);
        self.closed = false;
        info!(
            %kind,
            seed,
            area,
            flags,
            population = self.population,
            capacity = self.capacity,
            "colony initialized"
        );
    }

    fn population_count(&self) -> u64 {
        self.population
    }

    fn close(&mut self) {
        debug!(runs = self.runs, "colony closed");
        self.population = 0;
        self.closed = true;
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

/// `numerator / denominator` as a float in `[0, 1]`.
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 1.0;
    }
    let n = u32::try_from(numerator).map_or(f64::from(u32::MAX), f64::from);
    let d = u32::try_from(denominator).map_or(f64::from(u32::MAX), f64::from);
    (n / d).clamp(0.0, 1.0)
}
